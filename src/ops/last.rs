use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  scheduler::SchedulerRef,
  subscription::Subscription,
};

/// Emit only the last value, once the source completes.
#[derive(Clone)]
pub struct LastOp<S> {
  pub(crate) source: S,
}

impl<S: Observable> Observable for LastOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    self.source.actual_subscribe(Box::new(LastObserver { observer, last: None, done: false }), scheduler)
  }
}

struct LastObserver<O, T> {
  observer: O,
  last: Option<T>,
  done: bool,
}

impl<T: Send, O: Observer<T>> Observer<T> for LastObserver<O, T> {
  fn next(&mut self, value: T) {
    if !self.done {
      self.last = Some(value);
    }
  }

  fn error(&mut self, err: RxError) {
    if !std::mem::replace(&mut self.done, true) {
      self.observer.error(err)
    }
  }

  fn complete(&mut self) {
    if std::mem::replace(&mut self.done, true) {
      return;
    }
    match self.last.take() {
      Some(v) => {
        self.observer.next(v);
        self.observer.complete();
      }
      None => self.observer.error(RxError::SequenceContainsNoElements),
    }
  }

  fn is_finished(&self) -> bool { self.done || self.observer.is_finished() }
}
