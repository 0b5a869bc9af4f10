use super::{BoxObservable, Observable};
use crate::{observer::BoxObserver, scheduler::SchedulerRef, subscription::Subscription, Value};

/// The values of one group emitted by `group_by`, tagged with their key.
pub struct GroupedObservable<K, T> {
  key: K,
  source: BoxObservable<T>,
}

impl<K: Clone, T> Clone for GroupedObservable<K, T> {
  fn clone(&self) -> Self { GroupedObservable { key: self.key.clone(), source: self.source.clone() } }
}

impl<K, T> GroupedObservable<K, T> {
  pub(crate) fn new(key: K, source: BoxObservable<T>) -> Self { GroupedObservable { key, source } }

  pub fn key(&self) -> &K { &self.key }
}

impl<K: Value, T: Value> Observable for GroupedObservable<K, T> {
  type Item = T;

  fn actual_subscribe(&self, observer: BoxObserver<T>, scheduler: Option<SchedulerRef>) -> Subscription {
    self.source.actual_subscribe(observer, scheduler)
  }
}
