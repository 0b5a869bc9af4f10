//! Synchronous sources: iterables, ranges and the trivial observables.

use super::Observable;
use crate::{
  error::RxError,
  observer::{BoxObserver, Observer},
  ops::{current_or, guarded, impl_with_scheduler},
  scheduler::{SchedulerExt, SchedulerRef},
  subscription::Subscription,
  Value,
};
use std::marker::PhantomData;

/// Emits every item of an iterable, one scheduled step per item.
#[derive(Clone)]
pub struct FromIterObservable<I> {
  iter: I,
  scheduler: Option<SchedulerRef>,
}

/// Observable over the items of `iter`. Each subscription iterates a fresh
/// clone of it.
pub fn from_iter<I>(iter: I) -> FromIterObservable<I>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Value,
  I::IntoIter: Send + 'static,
{
  FromIterObservable { iter, scheduler: None }
}

/// Alias of [`from_iter`].
pub fn from_iterable<I>(iter: I) -> FromIterObservable<I>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Value,
  I::IntoIter: Send + 'static,
{
  from_iter(iter)
}

/// Observable over the given values.
pub fn of<T: Value>(values: impl Into<Vec<T>>) -> FromIterObservable<Vec<T>> { from_iter(values.into()) }

/// Integers from `start` up to, not including, `stop`.
pub fn range(start: i64, stop: i64) -> FromIterObservable<std::ops::Range<i64>> { from_iter(start..stop) }

impl<I> Observable for FromIterObservable<I>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Value,
  I::IntoIter: Send + 'static,
{
  type Item = I::Item;

  fn actual_subscribe(&self, mut observer: BoxObserver<I::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let scheduler = current_or(&self.scheduler, &scheduler);
    let mut iter = self.iter.clone().into_iter();
    scheduler.schedule_recursive(move |_, recurse| {
      if observer.is_finished() {
        return;
      }
      match guarded(|| iter.next()) {
        Ok(Some(v)) => {
          observer.next(v);
          recurse.again();
        }
        Ok(None) => observer.complete(),
        Err(e) => observer.error(e),
      }
    })
  }
}

// ==================== empty / never / throw ====================

/// Completes without emitting.
pub struct EmptyObservable<T> {
  scheduler: Option<SchedulerRef>,
  _p: PhantomData<fn() -> T>,
}

impl<T> Clone for EmptyObservable<T> {
  fn clone(&self) -> Self { EmptyObservable { scheduler: self.scheduler.clone(), _p: PhantomData } }
}

pub fn empty<T: Value>() -> EmptyObservable<T> { EmptyObservable { scheduler: None, _p: PhantomData } }

impl<T: Value> Observable for EmptyObservable<T> {
  type Item = T;

  fn actual_subscribe(&self, mut observer: BoxObserver<T>, scheduler: Option<SchedulerRef>) -> Subscription {
    current_or(&self.scheduler, &scheduler).schedule_fn(move |_| observer.complete())
  }
}

/// Never emits and never terminates.
pub struct NeverObservable<T>(PhantomData<fn() -> T>);

impl<T> Clone for NeverObservable<T> {
  fn clone(&self) -> Self { NeverObservable(PhantomData) }
}

pub fn never<T: Value>() -> NeverObservable<T> { NeverObservable(PhantomData) }

impl<T: Value> Observable for NeverObservable<T> {
  type Item = T;

  fn actual_subscribe(&self, observer: BoxObserver<T>, _: Option<SchedulerRef>) -> Subscription {
    // The observer lives as long as the subscription.
    Subscription::from_fn(move || drop(observer))
  }
}

/// Terminates with an error right away.
pub struct ThrowObservable<T> {
  err: RxError,
  scheduler: Option<SchedulerRef>,
  _p: PhantomData<fn() -> T>,
}

impl<T> Clone for ThrowObservable<T> {
  fn clone(&self) -> Self { ThrowObservable { err: self.err.clone(), scheduler: self.scheduler.clone(), _p: PhantomData } }
}

pub fn throw<T: Value>(err: impl Into<RxError>) -> ThrowObservable<T> {
  ThrowObservable { err: err.into(), scheduler: None, _p: PhantomData }
}

/// Alias of [`throw`].
pub fn throw_exception<T: Value>(err: impl Into<RxError>) -> ThrowObservable<T> { throw(err) }

impl<T: Value> Observable for ThrowObservable<T> {
  type Item = T;

  fn actual_subscribe(&self, mut observer: BoxObserver<T>, scheduler: Option<SchedulerRef>) -> Subscription {
    let err = self.err.clone();
    current_or(&self.scheduler, &scheduler).schedule_fn(move |_| observer.error(err))
  }
}

impl_with_scheduler!(FromIterObservable<I>, EmptyObservable<T>, ThrowObservable<T>);
