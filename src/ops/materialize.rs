use crate::{
  error::RxError,
  notification::Notification,
  observable::Observable,
  observer::{BoxObserver, Observer},
  scheduler::SchedulerRef,
  subscription::Subscription,
  Value,
};

/// Turns every notification into a value; the stream then completes.
#[derive(Clone)]
pub struct MaterializeOp<S> {
  pub(crate) source: S,
}

impl<S: Observable> Observable for MaterializeOp<S> {
  type Item = Notification<S::Item>;

  fn actual_subscribe(
    &self, observer: BoxObserver<Notification<S::Item>>, scheduler: Option<SchedulerRef>,
  ) -> Subscription {
    self.source.actual_subscribe(Box::new(MaterializeObserver { observer }), scheduler)
  }
}

struct MaterializeObserver<O> {
  observer: O,
}

impl<T, O: Observer<Notification<T>>> Observer<T> for MaterializeObserver<O> {
  fn next(&mut self, value: T) { self.observer.next(Notification::Next(value)) }

  fn error(&mut self, err: RxError) {
    self.observer.next(Notification::Error(err));
    self.observer.complete();
  }

  fn complete(&mut self) {
    self.observer.next(Notification::Completed);
    self.observer.complete();
  }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

/// Replays materialized notifications as live ones.
#[derive(Clone)]
pub struct DematerializeOp<S> {
  pub(crate) source: S,
}

impl<S, T> Observable for DematerializeOp<S>
where
  S: Observable<Item = Notification<T>>,
  T: Value,
{
  type Item = T;

  fn actual_subscribe(&self, observer: BoxObserver<T>, scheduler: Option<SchedulerRef>) -> Subscription {
    self.source.actual_subscribe(Box::new(DematerializeObserver { observer }), scheduler)
  }
}

struct DematerializeObserver<O> {
  observer: O,
}

impl<T, O: Observer<T>> Observer<Notification<T>> for DematerializeObserver<O> {
  fn next(&mut self, value: Notification<T>) { value.accept(&mut self.observer) }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn materialize_error() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 2), on_error(250, "boom")]);
    let results = scheduler.start_with_create(move || xs.materialize());
    assert_eq!(
      results.messages(),
      vec![
        on_next(210, Notification::Next(2)),
        on_next(250, Notification::Error(RxError::msg("boom"))),
        on_completed(250),
      ]
    );
  }

  #[rxrt_macro::test]
  fn dematerialize_restores_the_stream() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 2), on_next(220, 3), on_completed(250)]);
    let results = scheduler.start_with_create(move || xs.materialize().dematerialize());
    assert_eq!(results.messages(), vec![on_next(210, 2), on_next(220, 3), on_completed(250)]);
  }
}
