use crate::{
  error::{RxError, RxResult},
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::Subscription,
  Value,
};
use std::sync::Arc;

/// Creates a new stream which calls a closure on each element and uses its
/// return as the value.
pub struct MapOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: Arc<F>,
}

impl<S: Clone, F> Clone for MapOp<S, F> {
  fn clone(&self) -> Self { MapOp { source: self.source.clone(), func: self.func.clone() } }
}

impl<S, F, U> Observable for MapOp<S, F>
where
  S: Observable,
  F: Fn(S::Item) -> U + Send + Sync + 'static,
  U: Value,
{
  type Item = U;

  fn actual_subscribe(&self, observer: BoxObserver<U>, scheduler: Option<SchedulerRef>) -> Subscription {
    let map = MapObserver { observer, func: self.func.clone(), done: false };
    self.source.actual_subscribe(Box::new(map), scheduler)
  }
}

struct MapObserver<O, F> {
  observer: O,
  func: Arc<F>,
  done: bool,
}

impl<T, U, O, F> Observer<T> for MapObserver<O, F>
where
  O: Observer<U>,
  F: Fn(T) -> U + Send + Sync,
{
  fn next(&mut self, value: T) {
    if self.done {
      return;
    }
    match guarded(|| (self.func)(value)) {
      Ok(v) => self.observer.next(v),
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

/// Like [`MapOp`], but the closure may fail; an `Err` ends the stream.
pub struct TryMapOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: Arc<F>,
}

impl<S: Clone, F> Clone for TryMapOp<S, F> {
  fn clone(&self) -> Self { TryMapOp { source: self.source.clone(), func: self.func.clone() } }
}

impl<S, F, U> Observable for TryMapOp<S, F>
where
  S: Observable,
  F: Fn(S::Item) -> RxResult<U> + Send + Sync + 'static,
  U: Value,
{
  type Item = U;

  fn actual_subscribe(&self, observer: BoxObserver<U>, scheduler: Option<SchedulerRef>) -> Subscription {
    let func = self.func.clone();
    let flat = move |v: S::Item| guarded(|| func(v)).and_then(|r| r);
    let map = TryMapObserver { observer, func: flat, done: false };
    self.source.actual_subscribe(Box::new(map), scheduler)
  }
}

struct TryMapObserver<O, F> {
  observer: O,
  func: F,
  done: bool,
}

impl<T, U, O, F> Observer<T> for TryMapObserver<O, F>
where
  O: Observer<U>,
  F: Fn(T) -> RxResult<U> + Send,
{
  fn next(&mut self, value: T) {
    if self.done {
      return;
    }
    match (self.func)(value) {
      Ok(v) => self.observer.next(v),
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
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn primitive_type() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| of([1, 2, 3]).map(|v| v * 10));
    assert_eq!(
      results.messages(),
      vec![on_next(201, 10), on_next(202, 20), on_next(203, 30), on_completed(204)]
    );
  }

  #[rxrt_macro::test]
  fn panic_in_selector_becomes_error() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(220, 2), on_next(230, 3)]);
    let source = xs.clone();
    let results = scheduler.start_with_create(move || {
      source.map(|v| {
        if v == 2 {
          panic!("bad value");
        }
        v
      })
    });
    assert_eq!(results.messages(), vec![on_next(210, 1), on_error(220, RxError::Panic("bad value".into()))]);
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 220)]);
  }

  #[rxrt_macro::test]
  fn try_map_stops_on_err() {
    let mut got = vec![];
    let mut err = None;
    let (tx, rx) = std::sync::mpsc::channel();
    let etx = tx.clone();
    of([1, 2, 3])
      .try_map(|v| if v < 3 { Ok(v) } else { Err(RxError::msg("three")) })
      .subscribe_err(move |v| tx.send(Ok(v)).unwrap(), move |e| etx.send(Err(e)).unwrap());
    for r in rx.try_iter() {
      match r {
        Ok(v) => got.push(v),
        Err(e) => err = Some(e),
      }
    }
    assert_eq!(got, vec![1, 2]);
    assert_eq!(err, Some(RxError::msg("three")));
  }

  #[rxrt_macro::test]
  fn select_alias() {
    let mut sum = 0;
    let (tx, rx) = std::sync::mpsc::channel();
    range(1, 4).select(|v| v * 2).subscribe(move |v| tx.send(v).unwrap());
    for v in rx.try_iter() {
      sum += v;
    }
    assert_eq!(sum, 12);
  }

  fn map_chain() {
    let mut sum = 0;
    let (tx, rx) = std::sync::mpsc::channel();
    from_iter(0..1000).map(|v| v * 2).map(|v| v + 1).subscribe(move |v| tx.send(v).unwrap());
    for v in rx.try_iter() {
      sum += v;
    }
    assert_eq!(sum, 1_000_000);
  }

  #[rxrt_macro::test]
  fn bench() { do_bench(); }

  bencher::benchmark_group!(do_bench, bench_map);

  fn bench_map(b: &mut bencher::Bencher) { b.iter(map_chain); }
}
