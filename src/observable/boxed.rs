//! Type-erased observables.

use super::Observable;
use crate::{observer::BoxObserver, scheduler::SchedulerRef, subscription::Subscription, Value};
use std::{fmt, sync::Arc};

/// A clonable, type-erased observable.
///
/// Use it to store heterogeneous pipelines in one collection, or to name the
/// type of a chain built from closures.
pub struct BoxObservable<T>(Arc<dyn Observable<Item = T>>);

impl<T: Value> BoxObservable<T> {
  pub fn new<O: Observable<Item = T>>(source: O) -> Self { BoxObservable(Arc::new(source)) }
}

impl<T> Clone for BoxObservable<T> {
  fn clone(&self) -> Self { BoxObservable(self.0.clone()) }
}

impl<T> fmt::Debug for BoxObservable<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("BoxObservable") }
}

impl<T: Value> Observable for BoxObservable<T> {
  type Item = T;

  #[inline]
  fn actual_subscribe(&self, observer: BoxObserver<T>, scheduler: Option<SchedulerRef>) -> Subscription {
    self.0.actual_subscribe(observer, scheduler)
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;
  use parking_lot::Mutex;
  use std::sync::Arc;

  #[rxrt_macro::test]
  fn heterogeneous_collection() {
    let sources: Vec<BoxObservable<i32>> =
      vec![of([1, 2]).box_it(), from_iter(3..5).map(|v| v * 10).box_it(), empty().box_it()];
    let result = Arc::new(Mutex::new(vec![]));
    for s in sources {
      let r = result.clone();
      s.subscribe(move |v| r.lock().push(v));
    }
    assert_eq!(*result.lock(), vec![1, 2, 30, 40]);
  }

  #[rxrt_macro::test]
  fn clones_subscribe_independently() {
    let boxed = of([42]).box_it();
    let result = Arc::new(Mutex::new(vec![]));
    for source in [boxed.clone(), boxed] {
      let r = result.clone();
      source.subscribe(move |v| r.lock().push(v));
    }
    assert_eq!(*result.lock(), vec![42, 42]);
  }
}
