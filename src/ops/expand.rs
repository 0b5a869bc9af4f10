//! Recursive expansion.
//!
//! Every value is emitted and then fed to the mapper; the observable it
//! returns is subscribed in turn and its values expanded the same way. The
//! stream completes once the source and every expansion have completed.
//! Pending expansions are drained in a loop by whichever call found the
//! queue idle, so deep expansions do not grow the stack.

use crate::{
  error::RxError,
  observable::{subscribe_detached, BoxObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, Disposable, SingleAssignmentDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

pub type ExpandFn<T> = Arc<dyn Fn(&T) -> BoxObservable<T> + Send + Sync>;

pub struct ExpandOp<S: Observable> {
  pub(crate) source: Arc<S>,
  pub(crate) mapper: ExpandFn<S::Item>,
}

impl<S: Observable> Clone for ExpandOp<S> {
  fn clone(&self) -> Self { ExpandOp { source: self.source.clone(), mapper: self.mapper.clone() } }
}

struct Queue<T> {
  pending: VecDeque<BoxObservable<T>>,
  draining: bool,
  active: usize,
}

struct Expansion<T> {
  queue: Mutex<Queue<T>>,
  mapper: ExpandFn<T>,
  observer: SharedObserver<T>,
  group: CompositeDisposable,
  scheduler: Option<SchedulerRef>,
}

impl<T: Value> Expansion<T> {
  fn push(self: &Arc<Self>, work: BoxObservable<T>) {
    {
      let mut queue = self.queue.lock();
      queue.pending.push_back(work);
      queue.active += 1;
      if std::mem::replace(&mut queue.draining, true) {
        return;
      }
    }
    loop {
      let work = {
        let mut queue = self.queue.lock();
        match queue.pending.pop_front() {
          Some(work) => work,
          None => {
            queue.draining = false;
            return;
          }
        }
      };
      if self.group.is_disposed() {
        return;
      }
      let slot = SingleAssignmentDisposable::new();
      let handle = Subscription::new(slot.clone());
      self.group.add(handle.clone());
      let level = LevelObserver { expansion: self.clone(), handle };
      let _ = slot.set(subscribe_detached(&work, Box::new(level), self.scheduler.clone()));
    }
  }

  fn level_completed(&self, handle: &Subscription) {
    self.group.remove(handle);
    let idle = {
      let mut queue = self.queue.lock();
      queue.active -= 1;
      queue.active == 0
    };
    if idle {
      self.observer.clone().complete();
    }
  }
}

impl<S: Observable> Observable for ExpandOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let group = CompositeDisposable::new();
    let expansion = Arc::new(Expansion {
      queue: Mutex::new(Queue { pending: VecDeque::new(), draining: false, active: 0 }),
      mapper: self.mapper.clone(),
      observer: SharedObserver::from_box(observer),
      group: group.clone(),
      scheduler,
    });
    expansion.push(BoxObservable::new(self.source.clone()));
    Subscription::new(group)
  }
}

struct LevelObserver<T> {
  expansion: Arc<Expansion<T>>,
  handle: Subscription,
}

impl<T: Value> Observer<T> for LevelObserver<T> {
  fn next(&mut self, value: T) {
    let mapped = guarded(|| (self.expansion.mapper)(&value));
    self.expansion.observer.clone().next(value);
    match mapped {
      Ok(next) => self.expansion.push(next),
      Err(e) => self.expansion.observer.clone().error(e),
    }
  }

  fn error(&mut self, err: RxError) { self.expansion.observer.clone().error(err) }

  fn complete(&mut self) { self.expansion.level_completed(&self.handle) }

  fn is_finished(&self) -> bool { self.expansion.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn expands_until_the_mapper_runs_dry() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| {
      of(vec![1]).expand(|v: &i32| if *v < 8 { of(vec![v * 2]).box_it() } else { empty().box_it() })
    });
    assert_eq!(
      results.messages(),
      vec![on_next(201, 1), on_next(202, 2), on_next(203, 4), on_next(204, 8), on_completed(205)]
    );
  }

  #[rxrt_macro::test]
  fn every_level_is_expanded() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_cold_observable(vec![on_next(10, 1), on_next(20, 10), on_completed(30)]);
    let results = scheduler.start_with_create(move || {
      xs.expand(|v: &i32| {
        let v = *v;
        if v % 10 == 1 {
          timer(Duration::from_millis(5)).map(move |_| v + 1).box_it()
        } else {
          empty().box_it()
        }
      })
    });
    assert_eq!(
      results.messages(),
      vec![on_next(210, 1), on_next(215, 2), on_next(220, 10), on_completed(230)]
    );
  }

  #[rxrt_macro::test]
  fn mapper_panic_errors() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(220, 2), on_completed(300)]);
    let results = scheduler.start_with_create(move || {
      xs.expand(|v: &i32| {
        if *v == 2 {
          panic!("two");
        }
        empty().box_it()
      })
    });
    assert_eq!(
      results.messages(),
      vec![on_next(210, 1), on_next(220, 2), on_error(220, RxError::Panic("two".into()))]
    );
  }

  #[rxrt_macro::test]
  fn source_error_propagates() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_error(250, "boom")]);
    let results = scheduler.start_with_create(move || xs.expand(|_: &i32| never().box_it()));
    assert_eq!(results.messages(), vec![on_next(210, 1), on_error(250, "boom")]);
  }
}
