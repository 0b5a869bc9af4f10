//! `create`, `defer` and `using`.

use super::Observable;
use crate::{
  observer::{BoxObserver, Observer, SharedObserver},
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, Disposable, Subscription},
  Value,
};
use std::{marker::PhantomData, sync::Arc};

/// Handle given to a [`create`] producer.
pub type Emitter<T> = SharedObserver<T>;

/// Observable backed by a user subscribe function.
pub struct CreateObservable<T, F> {
  subscribe: Arc<F>,
  _p: PhantomData<fn() -> T>,
}

impl<T, F> Clone for CreateObservable<T, F> {
  fn clone(&self) -> Self { CreateObservable { subscribe: self.subscribe.clone(), _p: PhantomData } }
}

/// Build an observable from a subscribe function. The function receives an
/// [`Emitter`] and the subscription's scheduler, and returns whatever must be
/// released when the subscription is disposed. A panic inside it is
/// delivered as an error.
///
/// ```rust
/// use rxrt::prelude::*;
///
/// let source = create(|mut emitter: Emitter<i32>, _| {
///   emitter.next(1);
///   emitter.next(2);
///   emitter.complete();
///   Subscription::empty()
/// });
/// source.subscribe(|v| println!("{v}"));
/// ```
pub fn create<T, F>(subscribe: F) -> CreateObservable<T, F>
where
  T: Value,
  F: Fn(Emitter<T>, Option<SchedulerRef>) -> Subscription + Send + Sync + 'static,
{
  CreateObservable { subscribe: Arc::new(subscribe), _p: PhantomData }
}

impl<T, F> Observable for CreateObservable<T, F>
where
  T: Value,
  F: Fn(Emitter<T>, Option<SchedulerRef>) -> Subscription + Send + Sync + 'static,
{
  type Item = T;

  fn actual_subscribe(&self, observer: BoxObserver<T>, scheduler: Option<SchedulerRef>) -> Subscription {
    let emitter = SharedObserver::from_box(observer);
    let handle = emitter.clone();
    match guarded(|| (self.subscribe)(handle, scheduler)) {
      Ok(sub) => sub,
      Err(e) => {
        emitter.clone().error(e);
        Subscription::empty()
      }
    }
  }
}

// ==================== defer ====================

pub struct DeferObservable<F> {
  factory: Arc<F>,
}

impl<F> Clone for DeferObservable<F> {
  fn clone(&self) -> Self { DeferObservable { factory: self.factory.clone() } }
}

/// Call `factory` on every subscription and subscribe to what it returns.
pub fn defer<O, F>(factory: F) -> DeferObservable<F>
where
  O: Observable,
  F: Fn() -> O + Send + Sync + 'static,
{
  DeferObservable { factory: Arc::new(factory) }
}

impl<O, F> Observable for DeferObservable<F>
where
  O: Observable,
  F: Fn() -> O + Send + Sync + 'static,
{
  type Item = O::Item;

  fn actual_subscribe(&self, mut observer: BoxObserver<O::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    match guarded(|| (self.factory)()) {
      Ok(source) => source.actual_subscribe(observer, scheduler),
      Err(e) => {
        observer.error(e);
        Subscription::empty()
      }
    }
  }
}

// ==================== using ====================

pub struct UsingObservable<RF, OF> {
  resource: Arc<RF>,
  factory: Arc<OF>,
}

impl<RF, OF> Clone for UsingObservable<RF, OF> {
  fn clone(&self) -> Self { UsingObservable { resource: self.resource.clone(), factory: self.factory.clone() } }
}

/// Acquire a resource per subscription, build the source from it, and
/// dispose the resource together with the subscription.
pub fn using<R, O, RF, OF>(resource: RF, factory: OF) -> UsingObservable<RF, OF>
where
  R: Disposable + 'static,
  O: Observable,
  RF: Fn() -> R + Send + Sync + 'static,
  OF: Fn(&R) -> O + Send + Sync + 'static,
{
  UsingObservable { resource: Arc::new(resource), factory: Arc::new(factory) }
}

impl<R, O, RF, OF> Observable for UsingObservable<RF, OF>
where
  R: Disposable + 'static,
  O: Observable,
  RF: Fn() -> R + Send + Sync + 'static,
  OF: Fn(&R) -> O + Send + Sync + 'static,
{
  type Item = O::Item;

  fn actual_subscribe(&self, mut observer: BoxObserver<O::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let resource = match guarded(|| (self.resource)()) {
      Ok(r) => r,
      Err(e) => {
        observer.error(e);
        return Subscription::empty();
      }
    };
    match guarded(|| (self.factory)(&resource)) {
      Ok(source) => {
        let resource = Subscription::new(resource);
        let group = CompositeDisposable::from_iter([resource.clone()]);
        group.add(source.actual_subscribe(observer, scheduler));
        Subscription::new(group)
      }
      Err(e) => {
        resource.dispose();
        observer.error(e);
        Subscription::empty()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    error::RxError,
    observable::{of, throw, ObservableExt},
    scheduler::TestScheduler,
    testing::*,
  };
  use parking_lot::Mutex;

  #[rxrt_macro::test]
  fn create_emits_through_the_emitter() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| {
      create(|mut e: Emitter<i32>, _| {
        e.next(1);
        e.complete();
        e.next(2);
        Subscription::empty()
      })
    });
    assert_eq!(results.messages(), vec![on_next(200, 1), on_completed(200)]);
  }

  #[rxrt_macro::test]
  fn create_panic_becomes_error() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| {
      create(|_: Emitter<i32>, _| -> Subscription { panic!("boom") })
    });
    assert_eq!(results.messages(), vec![on_error(200, RxError::Panic("boom".into()))]);
  }

  #[rxrt_macro::test]
  fn create_disposes_the_returned_subscription() {
    let scheduler = TestScheduler::new();
    let flag = Subscription::empty();
    let f = flag.clone();
    scheduler.start_with_create(move || create(move |_: Emitter<i32>, _| f.clone()));
    assert!(flag.is_disposed());
  }

  #[rxrt_macro::test]
  fn defer_calls_the_factory_per_subscription() {
    let calls = Arc::new(Mutex::new(0));
    let c = calls.clone();
    let source = defer(move || {
      *c.lock() += 1;
      of([1])
    });
    let shared = Arc::new(source);
    shared.clone().subscribe(|_| {});
    shared.subscribe(|_| {});
    assert_eq!(*calls.lock(), 2);
  }

  #[rxrt_macro::test]
  fn defer_propagates_inner_errors() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| defer(|| throw::<i32>("boom")));
    assert_eq!(results.messages(), vec![on_error(201, "boom")]);
  }

  #[rxrt_macro::test]
  fn using_disposes_the_resource() {
    let scheduler = TestScheduler::new();
    let resource = Subscription::empty();
    let r = resource.clone();
    let xs = scheduler.create_cold_observable(vec![on_next(100, 1), on_completed(200)]);
    let source = xs.clone();
    let results = scheduler.start_with_create(move || using(move || r.clone(), move |_| source.clone()));
    assert_eq!(results.messages(), vec![on_next(300, 1), on_completed(400)]);
    assert!(resource.is_disposed());
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 400)]);
  }
}
