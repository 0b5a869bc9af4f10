use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer, SharedObserver},
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, Subscription},
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Emits the most recent source value whenever the sampler notifies,
/// skipping ticks with nothing new. The source completing is only reported
/// at the next tick.
#[derive(Clone)]
pub struct SampleOp<S, N> {
  pub(crate) source: S,
  pub(crate) sampler: N,
}

struct Latest<T> {
  value: Option<T>,
  at_end: bool,
}

impl<S: Observable, N: Observable> Observable for SampleOp<S, N> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let latest = Arc::new(Mutex::new(Latest { value: None, at_end: false }));
    let observer = SharedObserver::from_box(observer);
    let upstream = self.source.actual_subscribe(
      Box::new(SourceObserver { latest: latest.clone(), observer: observer.clone() }),
      scheduler.clone(),
    );
    let ticks = self.sampler.actual_subscribe(Box::new(TickObserver { latest, observer }), scheduler);
    Subscription::new(CompositeDisposable::from_iter([upstream, ticks]))
  }
}

struct SourceObserver<T> {
  latest: Arc<Mutex<Latest<T>>>,
  observer: SharedObserver<T>,
}

impl<T: Send + 'static> Observer<T> for SourceObserver<T> {
  fn next(&mut self, value: T) { self.latest.lock().value = Some(value) }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) { self.latest.lock().at_end = true }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

struct TickObserver<T> {
  latest: Arc<Mutex<Latest<T>>>,
  observer: SharedObserver<T>,
}

impl<T: Send + 'static> TickObserver<T> {
  fn tick(&mut self) {
    let (value, at_end) = {
      let mut latest = self.latest.lock();
      (latest.value.take(), latest.at_end)
    };
    if let Some(v) = value {
      self.observer.next(v);
    }
    if at_end {
      self.observer.complete();
    }
  }
}

impl<T: Send + 'static, U> Observer<U> for TickObserver<T> {
  fn next(&mut self, _: U) { self.tick() }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) { self.tick() }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn regular_sampling() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(150, 1),
      on_next(220, 2),
      on_next(240, 3),
      on_next(290, 4),
      on_next(300, 5),
      on_next(310, 6),
      on_completed(390),
    ]);
    let results = scheduler.start_with_create(move || xs.sample(Duration::from_millis(50)));
    assert_eq!(
      results.messages(),
      vec![on_next(250, 3), on_next(300, 5), on_next(350, 6), on_completed(400)]
    );
  }

  #[rxrt_macro::test]
  fn errors_pass_through() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(220, 2), on_next(240, 3), on_error(320, "boom")]);
    let results = scheduler.start_with_create(move || xs.sample(Duration::from_millis(50)));
    assert_eq!(results.messages(), vec![on_next(250, 3), on_error(320, "boom")]);
  }

  #[rxrt_macro::test]
  fn sampler_completion_is_a_final_tick() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(230, 2), on_completed(240)]);
    let ticks = scheduler.create_hot_observable::<()>(vec![on_completed(300)]);
    let results = scheduler.start_with_create(move || xs.sample_with(ticks));
    assert_eq!(results.messages(), vec![on_next(300, 2), on_completed(300)]);
  }
}
