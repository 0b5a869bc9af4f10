//! Flattening an observable of observables.

use crate::{
  error::RxError,
  observable::{from_iter, subscribe_detached, BoxObservable, FromIterObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, SingleAssignmentDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

/// Merge `sources` into one stream, interleaving values as they arrive.
pub fn merge<T: Value>(sources: Vec<BoxObservable<T>>) -> MergeOp<FromIterObservable<Vec<BoxObservable<T>>>> {
  MergeOp { source: from_iter(sources), max_concurrent: None }
}

/// Subscribes to every inner observable the source emits and forwards their
/// values. With `max_concurrent` set, extra inners wait in a queue until a
/// running one completes. Completes once the source and every inner have.
#[derive(Clone)]
pub struct MergeOp<S> {
  pub(crate) source: S,
  pub(crate) max_concurrent: Option<usize>,
}

struct State<N> {
  active: usize,
  stopped: bool,
  queue: VecDeque<N>,
}

struct Merge<N: Observable> {
  state: Mutex<State<N>>,
  group: CompositeDisposable,
  observer: SharedObserver<N::Item>,
  max_concurrent: Option<usize>,
  scheduler: Option<SchedulerRef>,
}

impl<N: Observable> Merge<N> {
  fn subscribe_inner(self: &Arc<Self>, inner: N) {
    let slot = SingleAssignmentDisposable::new();
    let handle = Subscription::new(slot.clone());
    self.group.add(handle.clone());
    let observer = InnerObserver { merge: self.clone(), handle };
    let _ = slot.set(subscribe_detached(&inner, Box::new(observer), self.scheduler.clone()));
  }

  fn inner_completed(self: &Arc<Self>, handle: &Subscription) {
    self.group.remove(handle);
    let (next, done) = {
      let mut st = self.state.lock();
      match st.queue.pop_front() {
        Some(n) => (Some(n), false),
        None => {
          st.active -= 1;
          (None, st.stopped && st.active == 0)
        }
      }
    };
    if let Some(n) = next {
      self.subscribe_inner(n);
    } else if done {
      self.observer.clone().complete();
    }
  }
}

impl<S> Observable for MergeOp<S>
where
  S: Observable,
  S::Item: Observable,
{
  type Item = <S::Item as Observable>::Item;

  fn actual_subscribe(&self, observer: BoxObserver<Self::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let merge = Arc::new(Merge {
      state: Mutex::new(State { active: 0, stopped: false, queue: VecDeque::new() }),
      group: CompositeDisposable::new(),
      observer: SharedObserver::from_box(observer),
      max_concurrent: self.max_concurrent,
      scheduler: scheduler.clone(),
    });
    let outer = SingleAssignmentDisposable::new();
    merge.group.add(Subscription::new(outer.clone()));
    let _ = outer.set(self.source.actual_subscribe(Box::new(OuterObserver(merge.clone())), scheduler));
    Subscription::new(merge.group.clone())
  }
}

struct OuterObserver<N: Observable>(Arc<Merge<N>>);

impl<N: Observable> Observer<N> for OuterObserver<N> {
  fn next(&mut self, inner: N) {
    let start = {
      let mut st = self.0.state.lock();
      if self.0.max_concurrent.map_or(true, |max| st.active < max) {
        st.active += 1;
        Some(inner)
      } else {
        st.queue.push_back(inner);
        None
      }
    };
    if let Some(inner) = start {
      self.0.subscribe_inner(inner);
    }
  }

  fn error(&mut self, err: RxError) { self.0.observer.clone().error(err) }

  fn complete(&mut self) {
    let done = {
      let mut st = self.0.state.lock();
      st.stopped = true;
      st.active == 0
    };
    if done {
      self.0.observer.clone().complete();
    }
  }

  fn is_finished(&self) -> bool { self.0.observer.is_finished() }
}

struct InnerObserver<N: Observable> {
  merge: Arc<Merge<N>>,
  handle: Subscription,
}

impl<N: Observable> Observer<N::Item> for InnerObserver<N> {
  fn next(&mut self, value: N::Item) { self.merge.observer.clone().next(value) }

  fn error(&mut self, err: RxError) { self.merge.observer.clone().error(err) }

  fn complete(&mut self) { self.merge.inner_completed(&self.handle) }

  fn is_finished(&self) -> bool { self.merge.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};
  use parking_lot::Mutex;
  use std::sync::Arc;

  #[rxrt_macro::test]
  fn merges_hot_sources() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(240, 3), on_completed(300)]);
    let ys = scheduler.create_hot_observable(vec![on_next(220, 2), on_next(250, 4), on_completed(260)]);
    let results = scheduler.start_with_create(move || xs.merge_with(ys));
    assert_eq!(
      results.messages(),
      vec![on_next(210, 1), on_next(220, 2), on_next(240, 3), on_next(250, 4), on_completed(300)]
    );
  }

  #[rxrt_macro::test]
  fn inner_error_stops_everything() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(240, 3), on_completed(300)]);
    let ys = scheduler.create_hot_observable(vec![on_next(220, 2), on_error(230, "boom")]);
    let source = xs.clone();
    let results = scheduler.start_with_create(move || source.merge_with(ys));
    assert_eq!(results.messages(), vec![on_next(210, 1), on_next(220, 2), on_error(230, "boom")]);
    assert_eq!(xs.subscriptions().len(), 1);
    assert_eq!(xs.subscriptions()[0].unsubscribe, 230);
  }

  #[rxrt_macro::test]
  fn bounded_concurrency_queues_inners() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_cold_observable(vec![on_next(10, 'a'), on_completed(30)]);
    let b = scheduler.create_cold_observable(vec![on_next(10, 'b'), on_completed(20)]);
    let c = scheduler.create_cold_observable(vec![on_next(10, 'c'), on_completed(20)]);
    let outer = scheduler.create_hot_observable(vec![
      on_next(210, a.clone().box_it()),
      on_next(215, b.clone().box_it()),
      on_next(220, c.clone().box_it()),
      on_completed(225),
    ]);
    let results = scheduler.start_with_create(move || outer.merge_max(2));
    assert_eq!(
      results.messages(),
      vec![on_next(220, 'a'), on_next(225, 'b'), on_next(245, 'c'), on_completed(255)]
    );
    assert_eq!(a.subscriptions(), vec![subscribe(210, 240)]);
    assert_eq!(b.subscriptions(), vec![subscribe(215, 235)]);
    assert_eq!(c.subscriptions(), vec![subscribe(235, 255)]);
  }

  #[rxrt_macro::test]
  fn concat_all_preserves_order() {
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    of([of([1, 2]), of([3]), of([4, 5])]).concat_all().subscribe(move |v| s.lock().push(v));
    assert_eq!(*seen.lock(), vec![1, 2, 3, 4, 5]);
  }

  #[rxrt_macro::test]
  fn flat_map_synchronous_inners() {
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    range(1, 4).flat_map(|n| range(0, n)).count().subscribe(move |v| s.lock().push(v));
    assert_eq!(*seen.lock(), vec![6]);
  }

  #[rxrt_macro::test]
  fn bench() { do_bench(); }

  bencher::benchmark_group!(do_bench, bench_flat_map);

  fn bench_flat_map(b: &mut bencher::Bencher) { b.iter(flat_map_synchronous_inners); }
}
