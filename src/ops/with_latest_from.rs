use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer, SharedObserver},
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Combines each source value with the most recent value of `other`. Source
/// values arriving before `other` has emitted are dropped; completion of
/// `other` is ignored.
pub struct WithLatestFromOp<S, O, F> {
  pub(crate) source: S,
  pub(crate) other: O,
  pub(crate) func: Arc<F>,
}

impl<S: Clone, O: Clone, F> Clone for WithLatestFromOp<S, O, F> {
  fn clone(&self) -> Self {
    WithLatestFromOp { source: self.source.clone(), other: self.other.clone(), func: self.func.clone() }
  }
}

impl<S, O, U, F> Observable for WithLatestFromOp<S, O, F>
where
  S: Observable,
  O: Observable,
  U: Value,
  F: Fn(S::Item, O::Item) -> U + Send + Sync + 'static,
{
  type Item = U;

  fn actual_subscribe(&self, observer: BoxObserver<U>, scheduler: Option<SchedulerRef>) -> Subscription {
    let latest = Arc::new(Mutex::new(None));
    let observer = SharedObserver::from_box(observer);
    let other = self.other.actual_subscribe(
      Box::new(OtherObserver { latest: latest.clone(), observer: observer.clone() }),
      scheduler.clone(),
    );
    let primary = PrimaryObserver { latest, observer, func: self.func.clone() };
    let upstream = self.source.actual_subscribe(Box::new(primary), scheduler);
    Subscription::new(CompositeDisposable::from_iter([upstream, other]))
  }
}

struct OtherObserver<V, U> {
  latest: Arc<Mutex<Option<V>>>,
  observer: SharedObserver<U>,
}

impl<V: Send + 'static, U: Send + 'static> Observer<V> for OtherObserver<V, U> {
  fn next(&mut self, value: V) { *self.latest.lock() = Some(value) }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) {}

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

struct PrimaryObserver<V, U, F> {
  latest: Arc<Mutex<Option<V>>>,
  observer: SharedObserver<U>,
  func: Arc<F>,
}

impl<T, V, U, F> Observer<T> for PrimaryObserver<V, U, F>
where
  V: Clone + Send + 'static,
  U: Send + 'static,
  F: Fn(T, V) -> U + Send + Sync,
{
  fn next(&mut self, value: T) {
    let Some(other) = self.latest.lock().clone() else { return };
    match guarded(|| (self.func)(value, other)) {
      Ok(v) => self.observer.next(v),
      Err(e) => self.observer.error(e),
    }
  }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn pairs_with_the_latest_other_value() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(240, 2), on_next(260, 3), on_completed(300)]);
    let ys = scheduler.create_hot_observable(vec![on_next(230, 10), on_next(250, 20), on_completed(255)]);
    let results = scheduler.start_with_create(move || xs.with_latest_from(ys, |a, b| a + b));
    assert_eq!(results.messages(), vec![on_next(240, 12), on_next(260, 23), on_completed(300)]);
  }

  #[rxrt_macro::test]
  fn other_error_stops_the_stream() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(240, 2), on_completed(300)]);
    let ys = scheduler.create_hot_observable(vec![on_next(230, 10), on_error(250, "boom")]);
    let results = scheduler.start_with_create(move || xs.with_latest_from(ys, |a, b| a * b));
    assert_eq!(results.messages(), vec![on_next(240, 20), on_error(250, "boom")]);
  }
}
