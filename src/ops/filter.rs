use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::Subscription,
};
use std::sync::Arc;

/// Emit only those items from an Observable that pass a predicate test.
///
/// # Example
///
/// ```
/// use rxrt::prelude::*;
/// use std::sync::{Arc, Mutex};
///
/// let coll = Arc::new(Mutex::new(vec![]));
/// let coll_clone = coll.clone();
///
/// from_iter(0..10)
///   .filter(|v| *v % 2 == 0)
///   .subscribe(move |v| coll_clone.lock().unwrap().push(v));
///
/// // only even numbers received.
/// assert_eq!(*coll.lock().unwrap(), vec![0, 2, 4, 6, 8]);
/// ```
pub struct FilterOp<S, F> {
  pub(crate) source: S,
  pub(crate) predicate: Arc<F>,
}

impl<S: Clone, F> Clone for FilterOp<S, F> {
  fn clone(&self) -> Self { FilterOp { source: self.source.clone(), predicate: self.predicate.clone() } }
}

impl<S, F> Observable for FilterOp<S, F>
where
  S: Observable,
  F: Fn(&S::Item) -> bool + Send + Sync + 'static,
{
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let filter = FilterObserver { observer, predicate: self.predicate.clone(), done: false };
    self.source.actual_subscribe(Box::new(filter), scheduler)
  }
}

struct FilterObserver<O, F> {
  observer: O,
  predicate: Arc<F>,
  done: bool,
}

impl<T, O, F> Observer<T> for FilterObserver<O, F>
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
      Ok(false) => {}
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
