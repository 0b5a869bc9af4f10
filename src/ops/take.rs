use crate::{
  error::RxError,
  observable::{empty, Observable},
  observer::{BoxObserver, Observer},
  scheduler::SchedulerRef,
  subscription::Subscription,
};

/// Emits only the first `count` values emitted by the source, then
/// completes.
#[derive(Clone)]
pub struct TakeOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<S: Observable> Observable for TakeOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    if self.count == 0 {
      return empty().actual_subscribe(observer, scheduler);
    }
    let take = TakeObserver { observer, remaining: self.count, done: false };
    self.source.actual_subscribe(Box::new(take), scheduler)
  }
}

struct TakeObserver<O> {
  observer: O,
  remaining: usize,
  done: bool,
}

impl<T, O: Observer<T>> Observer<T> for TakeObserver<O> {
  fn next(&mut self, value: T) {
    if self.done {
      return;
    }
    self.remaining -= 1;
    self.observer.next(value);
    if self.remaining == 0 {
      self.complete();
    }
  }

  fn error(&mut self, err: RxError) {
    if !std::mem::replace(&mut self.done, true) {
      self.observer.error(err)
    }
  }

  fn complete(&mut self) {
    if !std::mem::replace(&mut self.done, true) {
      self.observer.complete()
    }
  }

  fn is_finished(&self) -> bool { self.done || self.observer.is_finished() }
}
