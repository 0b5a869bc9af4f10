//! Per-value delays driven by observables.

use crate::{
  error::RxError,
  observable::{subscribe_detached, BoxObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  ops::{guarded, watch_duration, watch_in, DurationFn},
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, SerialDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Hold every value until the observable `mapper` returns for it emits or
/// completes. With a `subscription_delay` the source is subscribed only
/// once that observable emits or completes. The stream completes when the
/// source has completed and no value is still held.
pub struct DelayWithMapperOp<S: Observable> {
  pub(crate) source: Arc<S>,
  pub(crate) subscription_delay: Option<BoxObservable<()>>,
  pub(crate) mapper: DurationFn<S::Item>,
}

impl<S: Observable> Clone for DelayWithMapperOp<S> {
  fn clone(&self) -> Self {
    DelayWithMapperOp {
      source: self.source.clone(),
      subscription_delay: self.subscription_delay.clone(),
      mapper: self.mapper.clone(),
    }
  }
}

struct Held {
  pending: usize,
  at_end: bool,
}

struct Delays<T> {
  held: Mutex<Held>,
  mapper: DurationFn<T>,
  observer: SharedObserver<T>,
  delays: CompositeDisposable,
  scheduler: Option<SchedulerRef>,
}

impl<T: Value> Delays<T> {
  fn release(&self, value: T) {
    self.observer.clone().next(value);
    let finished = {
      let mut held = self.held.lock();
      held.pending -= 1;
      held.at_end && held.pending == 0
    };
    if finished {
      self.observer.clone().complete();
    }
  }

  fn source_completed(&self) {
    let finished = {
      let mut held = self.held.lock();
      held.at_end = true;
      held.pending == 0
    };
    if finished {
      self.observer.clone().complete();
    }
  }
}

fn start<S: Observable>(
  source: &Arc<S>, delays: &Arc<Delays<S::Item>>, upstream: &SerialDisposable, scheduler: Option<SchedulerRef>,
) {
  let hold = HoldObserver { delays: delays.clone() };
  upstream.set(subscribe_detached(source, Box::new(hold), scheduler));
}

impl<S: Observable> Observable for DelayWithMapperOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let delays = Arc::new(Delays {
      held: Mutex::new(Held { pending: 0, at_end: false }),
      mapper: self.mapper.clone(),
      observer: SharedObserver::from_box(observer),
      delays: CompositeDisposable::new(),
      scheduler: scheduler.clone(),
    });
    let upstream = SerialDisposable::new();
    let group = CompositeDisposable::from_iter([
      Subscription::new(upstream.clone()),
      Subscription::new(delays.delays.clone()),
    ]);
    match &self.subscription_delay {
      None => start(&self.source, &delays, &upstream, scheduler),
      Some(wait) => {
        let (source, this) = (self.source.clone(), delays.clone());
        group.add(watch_duration(wait, scheduler.clone(), move |err| match err {
          None => start(&source, &this, &upstream, scheduler),
          Some(e) => this.observer.clone().error(e),
        }));
      }
    }
    Subscription::new(group)
  }
}

struct HoldObserver<T> {
  delays: Arc<Delays<T>>,
}

impl<T: Value> Observer<T> for HoldObserver<T> {
  fn next(&mut self, value: T) {
    let delays = &self.delays;
    let ends = match guarded(|| (delays.mapper)(&value)) {
      Ok(ends) => ends,
      Err(e) => return delays.observer.clone().error(e),
    };
    delays.held.lock().pending += 1;
    let this = delays.clone();
    watch_in(&delays.delays, &ends, delays.scheduler.clone(), move |err| match err {
      None => this.release(value),
      Some(e) => this.observer.clone().error(e),
    });
  }

  fn error(&mut self, err: RxError) { self.delays.observer.clone().error(err) }

  fn complete(&mut self) { self.delays.source_completed() }

  fn is_finished(&self) -> bool { self.delays.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn each_value_waits_for_its_duration() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(150, 1),
      on_next(250, 2),
      on_next(350, 3),
      on_next(450, 4),
      on_completed(550),
    ]);
    let results = scheduler.start_with_create(move || {
      xs.delay_with_mapper(|v: &i32| timer(Duration::from_millis(*v as u64 * 10)))
    });
    assert_eq!(
      results.messages(),
      vec![on_next(270, 2), on_next(380, 3), on_next(490, 4), on_completed(550)]
    );
  }

  #[rxrt_macro::test]
  fn completion_waits_for_held_values() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(250, 2), on_completed(260)]);
    let results =
      scheduler.start_with_create(move || xs.delay_with_mapper(|_: &i32| timer(Duration::from_millis(50))));
    assert_eq!(results.messages(), vec![on_next(300, 2), on_completed(300)]);
  }

  #[rxrt_macro::test]
  fn silent_completion_releases_the_value() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(250, 2), on_completed(400)]);
    let ys = scheduler.create_cold_observable::<i32>(vec![on_completed(30)]);
    let results = scheduler.start_with_create(move || xs.delay_with_mapper(move |_: &i32| ys.clone()));
    assert_eq!(results.messages(), vec![on_next(280, 2), on_completed(400)]);
  }

  #[rxrt_macro::test]
  fn duration_error_propagates() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(250, 2), on_completed(400)]);
    let ys = scheduler.create_cold_observable::<i32>(vec![on_error(20, "boom")]);
    let results = scheduler.start_with_create(move || xs.delay_with_mapper(move |_: &i32| ys.clone()));
    assert_eq!(results.messages(), vec![on_error(270, "boom")]);
  }

  #[rxrt_macro::test]
  fn subscription_waits_for_the_delay() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(210, 1),
      on_next(260, 2),
      on_next(310, 3),
      on_completed(400),
    ]);
    let source = xs.clone();
    let results = scheduler.start_with_create(move || {
      source.delay_subscription_with_mapper(timer(Duration::from_millis(50)), |_: &i32| {
        timer(Duration::from_millis(5))
      })
    });
    assert_eq!(results.messages(), vec![on_next(265, 2), on_next(315, 3), on_completed(400)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(250, 400)]);
  }
}
