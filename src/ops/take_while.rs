//! Emit values while a predicate holds.
//!
//! The first value failing the predicate completes the stream; with
//! `inclusive` set that value is emitted before the completion.

use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::Subscription,
};
use std::sync::Arc;

/// # Example
///
/// ```
/// use rxrt::prelude::*;
/// use std::sync::{Arc, Mutex};
///
/// let taken = Arc::new(Mutex::new(vec![]));
/// let c_taken = taken.clone();
/// from_iter(1..6).take_while(|v| *v < 4, false).subscribe(move |v| c_taken.lock().unwrap().push(v));
/// assert_eq!(*taken.lock().unwrap(), vec![1, 2, 3]);
/// ```
pub struct TakeWhileOp<S, F> {
  pub(crate) source: S,
  pub(crate) predicate: Arc<F>,
  pub(crate) inclusive: bool,
}

impl<S: Clone, F> Clone for TakeWhileOp<S, F> {
  fn clone(&self) -> Self {
    TakeWhileOp { source: self.source.clone(), predicate: self.predicate.clone(), inclusive: self.inclusive }
  }
}

impl<S, F> Observable for TakeWhileOp<S, F>
where
  S: Observable,
  F: Fn(&S::Item) -> bool + Send + Sync + 'static,
{
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let take_while =
      TakeWhileObserver { observer, predicate: self.predicate.clone(), inclusive: self.inclusive, done: false };
    self.source.actual_subscribe(Box::new(take_while), scheduler)
  }
}

struct TakeWhileObserver<O, F> {
  observer: O,
  predicate: Arc<F>,
  inclusive: bool,
  done: bool,
}

impl<T, O, F> Observer<T> for TakeWhileObserver<O, F>
where
  O: Observer<T>,
  F: Fn(&T) -> bool + Send + Sync,
{
  fn next(&mut self, value: T) {
    if self.done {
      return;
    }
    match guarded(|| (self.predicate)(&value)) {
      Ok(true) => self.observer.next(value),
      Ok(false) => {
        if self.inclusive {
          self.observer.next(value);
        }
        self.complete();
      }
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
