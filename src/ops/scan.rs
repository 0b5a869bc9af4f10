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

/// The Scan operator applies a function to the first item emitted by the
/// source observable and then emits the result of that function as its own
/// first emission. It also feeds the result of the function back into the
/// function along with the second item emitted by the source observable in
/// order to generate its second emission. It continues to feed back its own
/// subsequent emissions along with the subsequent emissions from the source
/// Observable in order to create the rest of its sequence.
pub struct ScanOp<S, Acc, F> {
  pub(crate) source: S,
  pub(crate) seed: Acc,
  pub(crate) func: Arc<F>,
}

impl<S: Clone, Acc: Clone, F> Clone for ScanOp<S, Acc, F> {
  fn clone(&self) -> Self { ScanOp { source: self.source.clone(), seed: self.seed.clone(), func: self.func.clone() } }
}

impl<S, Acc, F> Observable for ScanOp<S, Acc, F>
where
  S: Observable,
  Acc: Value,
  F: Fn(Acc, S::Item) -> Acc + Send + Sync + 'static,
{
  type Item = Acc;

  fn actual_subscribe(&self, observer: BoxObserver<Acc>, scheduler: Option<SchedulerRef>) -> Subscription {
    let scan = ScanObserver { observer, func: self.func.clone(), acc: Some(self.seed.clone()) };
    self.source.actual_subscribe(Box::new(scan), scheduler)
  }
}

struct ScanObserver<O, Acc, F> {
  observer: O,
  func: Arc<F>,
  /// `None` once the stream ended.
  acc: Option<Acc>,
}

impl<T, O, Acc, F> Observer<T> for ScanObserver<O, Acc, F>
where
  O: Observer<Acc>,
  Acc: Clone + Send,
  F: Fn(Acc, T) -> Acc + Send + Sync,
{
  fn next(&mut self, value: T) {
    let Some(acc) = self.acc.take() else { return };
    match guarded(|| (self.func)(acc, value)) {
      Ok(acc) => {
        self.acc = Some(acc.clone());
        self.observer.next(acc);
      }
      Err(e) => self.observer.error(e),
    }
  }

  fn error(&mut self, err: RxError) {
    if self.acc.take().is_some() {
      self.observer.error(err)
    }
  }

  fn complete(&mut self) {
    if self.acc.take().is_some() {
      self.observer.complete()
    }
  }

  fn is_finished(&self) -> bool { self.acc.is_none() || self.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn running_sum() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(150, 1),
      on_next(210, 2),
      on_next(220, 3),
      on_next(230, 4),
      on_completed(250),
    ]);
    let results = scheduler.start_with_create(move || xs.scan(0, |acc, v| acc + v));
    assert_eq!(
      results.messages(),
      vec![on_next(210, 2), on_next(220, 5), on_next(230, 9), on_completed(250)]
    );
  }

  #[rxrt_macro::test]
  fn accumulator_of_another_type() {
    let (tx, rx) = std::sync::mpsc::channel();
    of(['a', 'b', 'c'])
      .scan(String::new(), |mut acc, c| {
        acc.push(c);
        acc
      })
      .subscribe(move |s| tx.send(s).unwrap());
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["a", "ab", "abc"]);
  }
}
