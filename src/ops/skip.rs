use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  scheduler::SchedulerRef,
  subscription::Subscription,
};

/// Ignore the first `count` values emitted by the source.
#[derive(Clone)]
pub struct SkipOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<S: Observable> Observable for SkipOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    self.source.actual_subscribe(Box::new(SkipObserver { observer, remaining: self.count }), scheduler)
  }
}

struct SkipObserver<O> {
  observer: O,
  remaining: usize,
}

impl<T, O: Observer<T>> Observer<T> for SkipObserver<O> {
  fn next(&mut self, value: T) {
    if self.remaining == 0 {
      self.observer.next(value);
    } else {
      self.remaining -= 1;
    }
  }

  #[inline]
  fn error(&mut self, err: RxError) { self.observer.error(err) }

  #[inline]
  fn complete(&mut self) { self.observer.complete() }

  #[inline]
  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn base_function() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(210, 9),
      on_next(230, 13),
      on_next(270, 7),
      on_next(280, 1),
      on_completed(300),
    ]);
    let results = scheduler.start_with_create(move || xs.skip(3));
    assert_eq!(results.messages(), vec![on_next(280, 1), on_completed(300)]);
  }

  #[rxrt_macro::test]
  fn skip_more_than_emitted() {
    let (tx, rx) = std::sync::mpsc::channel();
    of([1, 2]).skip(5).subscribe_all(|_| {}, |_| {}, move || tx.send("done").unwrap());
    assert_eq!(rx.try_recv(), Ok("done"));
  }
}
