//! Windows cut by other observables.
//!
//! [`WindowOp`] closes the current window and opens the next whenever the
//! boundary observable emits. [`WindowWhenOp`] asks a factory for a closing
//! observable per window; its first value or its completion rolls the
//! window over. Either way exactly one window is open from subscription
//! until the stream terminates.

use crate::{
  error::RxError,
  observable::{subscribe_detached, BoxObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  ops::{guarded, watch_duration, Leased},
  scheduler::SchedulerRef,
  subject::Subject,
  subscription::{CompositeDisposable, RefCountDisposable, SerialDisposable, SingleAssignmentDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Factory for the observable that closes a window.
pub type ClosingFn = Arc<dyn Fn() -> BoxObservable<()> + Send + Sync>;

struct Rolling<T> {
  current: Mutex<Subject<T>>,
  observer: SharedObserver<BoxObservable<T>>,
  leases: RefCountDisposable,
}

impl<T: Value> Rolling<T> {
  fn new(observer: BoxObserver<BoxObservable<T>>, group: &CompositeDisposable) -> Self {
    let first = Subject::new();
    let rolling = Rolling {
      current: Mutex::new(first.clone()),
      observer: SharedObserver::from_box(observer),
      leases: RefCountDisposable::new(Subscription::new(group.clone())),
    };
    rolling.observer.clone().next(Leased::boxed(first, rolling.leases.clone()));
    rolling
  }

  fn roll(&self) {
    let fresh = Subject::new();
    let closed = std::mem::replace(&mut *self.current.lock(), fresh.clone());
    closed.complete();
    self.observer.clone().next(Leased::boxed(fresh, self.leases.clone()));
  }

  fn value(&self, value: T) {
    let window = self.current.lock().clone();
    window.next(value);
  }

  fn error(&self, err: RxError) {
    let window = self.current.lock().clone();
    window.error(err.clone());
    self.observer.clone().error(err);
  }

  fn complete(&self) {
    let window = self.current.lock().clone();
    window.complete();
    self.observer.clone().complete();
  }
}

struct SourceObserver<T>(Arc<Rolling<T>>);

impl<T: Value> Observer<T> for SourceObserver<T> {
  fn next(&mut self, value: T) { self.0.value(value) }

  fn error(&mut self, err: RxError) { self.0.error(err) }

  fn complete(&mut self) { self.0.complete() }

  fn is_finished(&self) -> bool { self.0.observer.is_finished() }
}

/// Windows separated by the values of `boundaries`.
#[derive(Clone)]
pub struct WindowOp<S, B> {
  pub(crate) source: S,
  pub(crate) boundaries: B,
}

impl<S: Observable, B: Observable> Observable for WindowOp<S, B> {
  type Item = BoxObservable<S::Item>;

  fn actual_subscribe(
    &self, observer: BoxObserver<BoxObservable<S::Item>>, scheduler: Option<SchedulerRef>,
  ) -> Subscription {
    let group = CompositeDisposable::new();
    let rolling = Arc::new(Rolling::new(observer, &group));
    group.add(subscribe_detached(&self.source, Box::new(SourceObserver(rolling.clone())), scheduler.clone()));
    group.add(subscribe_detached(&self.boundaries, Box::new(BoundaryObserver(rolling.clone())), scheduler));
    Subscription::new(rolling.leases.clone())
  }
}

struct BoundaryObserver<T>(Arc<Rolling<T>>);

impl<T: Value, U> Observer<U> for BoundaryObserver<T> {
  fn next(&mut self, _: U) { self.0.roll() }

  fn error(&mut self, err: RxError) { self.0.error(err) }

  fn complete(&mut self) { self.0.complete() }

  fn is_finished(&self) -> bool { self.0.observer.is_finished() }
}

/// Windows each closed by a fresh observable from `closing`.
pub struct WindowWhenOp<S> {
  pub(crate) source: S,
  pub(crate) closing: ClosingFn,
}

impl<S: Clone> Clone for WindowWhenOp<S> {
  fn clone(&self) -> Self { WindowWhenOp { source: self.source.clone(), closing: self.closing.clone() } }
}

struct Closings<T> {
  rolling: Arc<Rolling<T>>,
  closing: ClosingFn,
  watch: SerialDisposable,
  scheduler: Option<SchedulerRef>,
}

impl<T: Value> Closings<T> {
  fn watch_next(self: &Arc<Self>) {
    let closing = match guarded(|| (self.closing)()) {
      Ok(closing) => closing,
      Err(e) => return self.rolling.error(e),
    };
    let slot = SingleAssignmentDisposable::new();
    self.watch.set(Subscription::new(slot.clone()));
    let this = self.clone();
    let _ = slot.set(watch_duration(&closing, self.scheduler.clone(), move |err| match err {
      None => {
        this.rolling.roll();
        this.watch_next();
      }
      Some(e) => this.rolling.error(e),
    }));
  }
}

impl<S: Observable> Observable for WindowWhenOp<S> {
  type Item = BoxObservable<S::Item>;

  fn actual_subscribe(
    &self, observer: BoxObserver<BoxObservable<S::Item>>, scheduler: Option<SchedulerRef>,
  ) -> Subscription {
    let watch = SerialDisposable::new();
    let group = CompositeDisposable::from_iter([Subscription::new(watch.clone())]);
    let rolling = Arc::new(Rolling::new(observer, &group));
    let closings = Arc::new(Closings {
      rolling: rolling.clone(),
      closing: self.closing.clone(),
      watch,
      scheduler: scheduler.clone(),
    });
    group.add(subscribe_detached(&self.source, Box::new(SourceObserver(rolling.clone())), scheduler));
    closings.watch_next();
    Subscription::new(rolling.leases.clone())
  }
}
