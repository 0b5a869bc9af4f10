use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::Subscription,
  Value,
};
use std::sync::Arc;

/// Folds the whole stream into one value, emitted when the source
/// completes. An empty source emits the seed.
pub struct ReduceOp<S, Acc, F> {
  pub(crate) source: S,
  pub(crate) seed: Acc,
  pub(crate) func: Arc<F>,
}

impl<S: Clone, Acc: Clone, F> Clone for ReduceOp<S, Acc, F> {
  fn clone(&self) -> Self {
    ReduceOp { source: self.source.clone(), seed: self.seed.clone(), func: self.func.clone() }
  }
}

impl<S, Acc, F> Observable for ReduceOp<S, Acc, F>
where
  S: Observable,
  Acc: Value,
  F: Fn(Acc, S::Item) -> Acc + Send + Sync + 'static,
{
  type Item = Acc;

  fn actual_subscribe(&self, observer: BoxObserver<Acc>, scheduler: Option<SchedulerRef>) -> Subscription {
    let reduce = ReduceObserver { observer, func: self.func.clone(), acc: Some(self.seed.clone()) };
    self.source.actual_subscribe(Box::new(reduce), scheduler)
  }
}

struct ReduceObserver<O, Acc, F> {
  observer: O,
  func: Arc<F>,
  acc: Option<Acc>,
}

impl<T, O, Acc, F> Observer<T> for ReduceObserver<O, Acc, F>
where
  O: Observer<Acc>,
  Acc: Send,
  F: Fn(Acc, T) -> Acc + Send + Sync,
{
  fn next(&mut self, value: T) {
    let Some(acc) = self.acc.take() else { return };
    match guarded(|| (self.func)(acc, value)) {
      Ok(acc) => self.acc = Some(acc),
      Err(e) => self.observer.error(e),
    }
  }

  fn error(&mut self, err: RxError) {
    if self.acc.take().is_some() {
      self.observer.error(err)
    }
  }

  fn complete(&mut self) {
    if let Some(acc) = self.acc.take() {
      self.observer.next(acc);
      self.observer.complete();
    }
  }

  fn is_finished(&self) -> bool { self.acc.is_none() || self.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn sums_on_completion() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(210, 2),
      on_next(220, 3),
      on_next(230, 4),
      on_completed(250),
    ]);
    let results = scheduler.start_with_create(move || xs.reduce(1, |acc, v| acc + v));
    assert_eq!(results.messages(), vec![on_next(250, 10), on_completed(250)]);
  }

  #[rxrt_macro::test]
  fn empty_emits_the_seed() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| empty::<i32>().reduce(7, |acc, v| acc + v));
    assert_eq!(results.messages(), vec![on_next(201, 7), on_completed(201)]);
  }

  #[rxrt_macro::test]
  fn count_values() {
    let (tx, rx) = std::sync::mpsc::channel();
    range(0, 42).count().subscribe(move |n| tx.send(n).unwrap());
    assert_eq!(rx.try_recv(), Ok(42));
  }
}
