use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::Subscription,
};
use std::sync::Arc;

/// Invokes a function on each value before passing it on unchanged.
pub struct TapOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: Arc<F>,
}

impl<S: Clone, F> Clone for TapOp<S, F> {
  fn clone(&self) -> Self { TapOp { source: self.source.clone(), func: self.func.clone() } }
}

impl<S, F> Observable for TapOp<S, F>
where
  S: Observable,
  F: Fn(&S::Item) + Send + Sync + 'static,
{
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let tap = TapObserver { observer, func: self.func.clone(), done: false };
    self.source.actual_subscribe(Box::new(tap), scheduler)
  }
}

struct TapObserver<O, F> {
  observer: O,
  func: Arc<F>,
  done: bool,
}

impl<T, O, F> Observer<T> for TapObserver<O, F>
where
  O: Observer<T>,
  F: Fn(&T) + Send + Sync,
{
  fn next(&mut self, value: T) {
    if self.done {
      return;
    }
    match guarded(|| (self.func)(&value)) {
      Ok(()) => self.observer.next(value),
      Err(e) => self.error(e),
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

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use std::sync::{Arc, Mutex};

  #[rxrt_macro::test]
  fn sees_every_value() {
    let side = Arc::new(Mutex::new(vec![]));
    let out = Arc::new(Mutex::new(vec![]));
    let (s, o) = (side.clone(), out.clone());
    of([1, 2, 3])
      .tap(move |v| s.lock().unwrap().push(*v))
      .subscribe(move |v| o.lock().unwrap().push(v));
    assert_eq!(*side.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(*out.lock().unwrap(), vec![1, 2, 3]);
  }
}
