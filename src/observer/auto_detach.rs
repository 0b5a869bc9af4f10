use super::{BoxObserver, Observer};
use crate::{
  error::RxError,
  subscription::{Disposable, SingleAssignmentDisposable},
};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// The outermost observer of every subscription.
///
/// It drops notifications once the subscription is disposed, turns a panic
/// in the user's `next` into an `error`, and disposes the subscription after
/// a terminal notification. A panic in the user's `error` or `complete` is
/// logged, since nobody is left to receive it.
pub struct AutoDetachObserver<Item> {
  observer: BoxObserver<Item>,
  detach: SingleAssignmentDisposable,
  stopped: bool,
}

impl<Item> AutoDetachObserver<Item> {
  pub fn new(observer: BoxObserver<Item>, detach: SingleAssignmentDisposable) -> Self {
    AutoDetachObserver { observer, detach, stopped: false }
  }

  fn terminate(&mut self, f: impl FnOnce(&mut BoxObserver<Item>)) {
    if self.stopped || self.detach.is_disposed() {
      return;
    }
    self.stopped = true;
    let observer = &mut self.observer;
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| f(observer))) {
      let err = RxError::from_panic(payload.as_ref());
      tracing::error!(error = %err, "terminal callback panicked");
    }
    self.detach.dispose();
  }
}

impl<Item> Observer<Item> for AutoDetachObserver<Item> {
  fn next(&mut self, value: Item) {
    if self.stopped || self.detach.is_disposed() {
      return;
    }
    let observer = &mut self.observer;
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| observer.next(value))) {
      self.error(RxError::from_panic(payload.as_ref()));
    }
  }

  fn error(&mut self, err: RxError) { self.terminate(|o| o.error(err)) }

  fn complete(&mut self) { self.terminate(|o| o.complete()) }

  fn is_finished(&self) -> bool {
    self.stopped || self.detach.is_disposed() || self.observer.is_finished()
  }
}
