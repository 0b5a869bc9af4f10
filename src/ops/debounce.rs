//! `debounce` and its observable-driven sibling `throttle_with_mapper`.

use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer, SharedObserver},
  ops::{guarded, timed_or, watch_duration},
  scheduler::{Duration, SchedulerExt, SchedulerRef},
  subscription::{CompositeDisposable, SerialDisposable, Subscription},
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Pending value and the id of the timer allowed to release it.
struct Pending<T> {
  value: Option<T>,
  id: u64,
}

impl<T> Default for Pending<T> {
  fn default() -> Self { Pending { value: None, id: 0 } }
}

impl<T> Pending<T> {
  /// Store `value` and return the id of its timer.
  fn replace(&mut self, value: T) -> u64 {
    self.value = Some(value);
    self.id += 1;
    self.id
  }

  /// The value, if timer `id` is still the current one.
  fn release(&mut self, id: u64) -> Option<T> {
    if self.id == id { self.value.take() } else { None }
  }

  /// Stop every timer; returns the value still pending.
  fn close(&mut self) -> Option<T> {
    self.id += 1;
    self.value.take()
  }
}

/// Emits a value only after `due` has passed without the source emitting
/// another one. On completion the pending value is flushed first.
pub struct DebounceOp<S> {
  pub(crate) source: S,
  pub(crate) due: Duration,
  pub(crate) scheduler: Option<SchedulerRef>,
}

impl<S: Clone> Clone for DebounceOp<S> {
  fn clone(&self) -> Self {
    DebounceOp { source: self.source.clone(), due: self.due, scheduler: self.scheduler.clone() }
  }
}

impl<S: Observable> Observable for DebounceOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let timer = SerialDisposable::new();
    let debounce = DebounceObserver {
      observer: SharedObserver::from_box(observer),
      pending: Arc::new(Mutex::new(Pending::default())),
      timer: timer.clone(),
      scheduler: timed_or(&self.scheduler, &scheduler),
      due: self.due,
    };
    let upstream = self.source.actual_subscribe(Box::new(debounce), scheduler);
    Subscription::new(CompositeDisposable::from_iter([upstream, Subscription::new(timer)]))
  }
}

struct DebounceObserver<T> {
  observer: SharedObserver<T>,
  pending: Arc<Mutex<Pending<T>>>,
  timer: SerialDisposable,
  scheduler: SchedulerRef,
  due: Duration,
}

impl<T: Send + 'static> Observer<T> for DebounceObserver<T> {
  fn next(&mut self, value: T) {
    let id = self.pending.lock().replace(value);
    let (pending, mut observer) = (self.pending.clone(), self.observer.clone());
    self.timer.set(self.scheduler.schedule_relative_fn(self.due, move |_| {
      let value = pending.lock().release(id);
      if let Some(v) = value {
        observer.next(v);
      }
    }));
  }

  fn error(&mut self, err: RxError) {
    self.timer.set(Subscription::empty());
    self.pending.lock().close();
    self.observer.error(err);
  }

  fn complete(&mut self) {
    self.timer.set(Subscription::empty());
    let last = self.pending.lock().close();
    if let Some(v) = last {
      self.observer.next(v);
    }
    self.observer.complete();
  }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

/// Debounce where the quiet period after each value lasts until the
/// observable `mapper` returns for it emits or completes.
pub struct ThrottleWithMapperOp<S, F> {
  pub(crate) source: S,
  pub(crate) mapper: Arc<F>,
}

impl<S: Clone, F> Clone for ThrottleWithMapperOp<S, F> {
  fn clone(&self) -> Self { ThrottleWithMapperOp { source: self.source.clone(), mapper: self.mapper.clone() } }
}

impl<S, F, N> Observable for ThrottleWithMapperOp<S, F>
where
  S: Observable,
  F: Fn(&S::Item) -> N + Send + Sync + 'static,
  N: Observable,
{
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let throttle = SerialDisposable::new();
    let mapped = MapperObserver {
      observer: SharedObserver::from_box(observer),
      pending: Arc::new(Mutex::new(Pending::default())),
      throttle: throttle.clone(),
      mapper: self.mapper.clone(),
      scheduler: scheduler.clone(),
    };
    let upstream = self.source.actual_subscribe(Box::new(mapped), scheduler);
    Subscription::new(CompositeDisposable::from_iter([upstream, Subscription::new(throttle)]))
  }
}

struct MapperObserver<T, F> {
  observer: SharedObserver<T>,
  pending: Arc<Mutex<Pending<T>>>,
  throttle: SerialDisposable,
  mapper: Arc<F>,
  scheduler: Option<SchedulerRef>,
}

impl<T, F, N> Observer<T> for MapperObserver<T, F>
where
  T: Send + 'static,
  F: Fn(&T) -> N + Send + Sync,
  N: Observable,
{
  fn next(&mut self, value: T) {
    let quiet = match guarded(|| (self.mapper)(&value)) {
      Ok(quiet) => quiet,
      Err(e) => return self.error(e),
    };
    let id = self.pending.lock().replace(value);
    let (pending, mut observer) = (self.pending.clone(), self.observer.clone());
    let watch = watch_duration(&quiet, self.scheduler.clone(), move |err| match err {
      Some(e) => observer.error(e),
      None => {
        let value = pending.lock().release(id);
        if let Some(v) = value {
          observer.next(v);
        }
      }
    });
    self.throttle.set(watch);
  }

  fn error(&mut self, err: RxError) {
    self.throttle.set(Subscription::empty());
    self.pending.lock().close();
    self.observer.error(err);
  }

  fn complete(&mut self) {
    self.throttle.set(Subscription::empty());
    let last = self.pending.lock().close();
    if let Some(v) = last {
      self.observer.next(v);
    }
    self.observer.complete();
  }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}
