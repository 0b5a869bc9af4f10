use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::Subscription,
};
use std::{collections::HashSet, hash::Hash, sync::Arc};

/// Key function that keys a value by itself.
pub type SelfKey<T> = fn(&T) -> T;

/// Emit only values whose key was not seen before.
///
/// # Example
///
/// ```
/// use rxrt::prelude::*;
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(vec![]));
/// let c_seen = seen.clone();
/// of(vec![1, 2, 1, 3, 2]).distinct().subscribe(move |v| c_seen.lock().unwrap().push(v));
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
/// ```
pub struct DistinctOp<S, F> {
  pub(crate) source: S,
  pub(crate) key: Arc<F>,
}

impl<S: Clone, F> Clone for DistinctOp<S, F> {
  fn clone(&self) -> Self { DistinctOp { source: self.source.clone(), key: self.key.clone() } }
}

impl<S, F, K> Observable for DistinctOp<S, F>
where
  S: Observable,
  F: Fn(&S::Item) -> K + Send + Sync + 'static,
  K: Eq + Hash + Send + 'static,
{
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let distinct = DistinctObserver { observer, key: self.key.clone(), seen: HashSet::new(), done: false };
    self.source.actual_subscribe(Box::new(distinct), scheduler)
  }
}

struct DistinctObserver<O, F, K> {
  observer: O,
  key: Arc<F>,
  seen: HashSet<K>,
  done: bool,
}

impl<T, O, F, K> Observer<T> for DistinctObserver<O, F, K>
where
  O: Observer<T>,
  F: Fn(&T) -> K + Send + Sync,
  K: Eq + Hash + Send,
{
  fn next(&mut self, value: T) {
    if self.done {
      return;
    }
    match guarded(|| (self.key)(&value)) {
      Ok(key) => {
        if self.seen.insert(key) {
          self.observer.next(value);
        }
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

/// Drop values whose key equals the key of the value emitted just before.
pub struct DistinctUntilChangedOp<S, F> {
  pub(crate) source: S,
  pub(crate) key: Arc<F>,
}

impl<S: Clone, F> Clone for DistinctUntilChangedOp<S, F> {
  fn clone(&self) -> Self { DistinctUntilChangedOp { source: self.source.clone(), key: self.key.clone() } }
}

impl<S, F, K> Observable for DistinctUntilChangedOp<S, F>
where
  S: Observable,
  F: Fn(&S::Item) -> K + Send + Sync + 'static,
  K: PartialEq + Send + 'static,
{
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let changes = ChangedObserver { observer, key: self.key.clone(), last: None, done: false };
    self.source.actual_subscribe(Box::new(changes), scheduler)
  }
}

struct ChangedObserver<O, F, K> {
  observer: O,
  key: Arc<F>,
  last: Option<K>,
  done: bool,
}

impl<T, O, F, K> Observer<T> for ChangedObserver<O, F, K>
where
  O: Observer<T>,
  F: Fn(&T) -> K + Send + Sync,
  K: PartialEq + Send,
{
  fn next(&mut self, value: T) {
    if self.done {
      return;
    }
    match guarded(|| (self.key)(&value)) {
      Ok(key) => {
        if self.last.as_ref() != Some(&key) {
          self.last = Some(key);
          self.observer.next(value);
        }
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
