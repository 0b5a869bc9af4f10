//! Test scheduler for deterministic testing of time-based operators.
//!
//! Virtual time only advances while the scheduler drains its queue, so
//! `debounce`, `delay`, `timeout` and friends can be asserted tick by tick.
//!
//! ```rust
//! use rxrt::prelude::*;
//! use rxrt::testing::*;
//!
//! let scheduler = TestScheduler::new();
//! let xs = scheduler.create_hot_observable(vec![
//!   on_next(150, 1),
//!   on_next(210, 2),
//!   on_completed(250),
//! ]);
//! let results = scheduler.start_with_create(move || xs.map(|v| v * 10));
//! assert_eq!(results.messages(), vec![on_next(210, 20), on_completed(250)]);
//! ```
//!
//! Scheduling at or before the current tick is re-stamped to the next tick,
//! so every recorded event moves virtual time forward.

use super::{Action, Duration, Instant, Scheduler, SchedulerExt, VirtualTimeScheduler};
use crate::{
  error::RxError,
  observable::{Observable, ObservableExt},
  subscription::Subscription,
  testing::{ColdObservable, HotObservable, MockObserver, Recorded},
  Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Tick at which `start_with_create` builds the observable.
pub const CREATED: u64 = 100;
/// Tick at which `start_with_create` subscribes.
pub const SUBSCRIBED: u64 = 200;
/// Tick at which `start_with_create` disposes the subscription.
pub const DISPOSED: u64 = 1000;

const TICK: Duration = Duration::from_millis(1);

#[derive(Clone, Default)]
pub struct TestScheduler {
  vt: VirtualTimeScheduler,
}

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// Current virtual time in ticks.
  pub fn clock(&self) -> u64 { self.vt.now().as_millis() }

  pub fn start(&self) { self.vt.run_on(self) }

  pub fn stop(&self) { self.vt.stop() }

  pub fn advance_to(&self, ticks: u64) -> Result<(), RxError> {
    self.vt.advance_to_on(self, Instant::from_millis(ticks))
  }

  pub fn advance_by(&self, ticks: u64) -> Result<(), RxError> {
    self.vt.advance_by_on(self, Duration::from_millis(ticks))
  }

  pub fn sleep(&self, ticks: u64) { self.vt.sleep(Duration::from_millis(ticks)) }

  /// Run `f` at virtual tick `ticks`.
  pub fn schedule_at<F>(&self, ticks: u64, f: F) -> Subscription
  where
    F: FnOnce(&dyn Scheduler) + Send + 'static,
  {
    self.schedule_absolute_fn(Instant::from_millis(ticks), f)
  }

  /// Create at [`CREATED`], subscribe at [`SUBSCRIBED`], dispose at
  /// [`DISPOSED`]; return everything the observer recorded.
  pub fn start_with_create<O, F>(&self, create: F) -> MockObserver<O::Item>
  where
    O: Observable,
    F: FnOnce() -> O + Send + 'static,
  {
    self.start_with_timing(create, CREATED, SUBSCRIBED, DISPOSED)
  }

  pub fn start_with_timing<O, F>(
    &self, create: F, created: u64, subscribed: u64, disposed: u64,
  ) -> MockObserver<O::Item>
  where
    O: Observable,
    F: FnOnce() -> O + Send + 'static,
  {
    let observer = self.create_observer();
    let source: Arc<Mutex<Option<O>>> = Arc::new(Mutex::new(None));
    let subscription: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    let slot = source.clone();
    self.schedule_at(created, move |_| {
      let built = create();
      *slot.lock() = Some(built);
    });

    let (slot, sub_slot, mock, this) = (source, subscription.clone(), observer.clone(), self.clone());
    self.schedule_at(subscribed, move |_| {
      let built = slot.lock().take();
      if let Some(built) = built {
        let sub = built.subscribe_with(mock, Some(Arc::new(this)));
        *sub_slot.lock() = Some(sub);
      }
    });

    self.schedule_at(disposed, move |_| {
      let sub = subscription.lock().take();
      if let Some(sub) = sub {
        sub.dispose();
      }
    });

    self.start();
    observer
  }

  pub fn create_hot_observable<T: Value>(&self, messages: Vec<Recorded<T>>) -> HotObservable<T> {
    HotObservable::new(self.clone(), messages)
  }

  pub fn create_cold_observable<T: Value>(&self, messages: Vec<Recorded<T>>) -> ColdObservable<T> {
    ColdObservable::new(self.clone(), messages)
  }

  /// Hot observable from a marble diagram, its first frame at tick 0 or, when
  /// the diagram carries `^`, with `^` at [`SUBSCRIBED`].
  pub fn create_hot_marbles(&self, diagram: &str) -> Result<HotObservable<char>, RxError> {
    let messages = crate::testing::marbles::parse_hot(diagram, SUBSCRIBED)?;
    Ok(self.create_hot_observable(messages))
  }

  pub fn create_cold_marbles(&self, diagram: &str) -> Result<ColdObservable<char>, RxError> {
    let messages = crate::testing::marbles::parse(diagram)?;
    Ok(self.create_cold_observable(messages))
  }

  pub fn create_observer<T: Value>(&self) -> MockObserver<T> { MockObserver::new(self.clone()) }
}

impl Scheduler for TestScheduler {
  fn now(&self) -> Instant { self.vt.now() }

  fn schedule(&self, action: Action) -> Subscription {
    let now = self.now();
    self.schedule_absolute(now, action)
  }

  fn schedule_relative(&self, due: Duration, action: Action) -> Subscription {
    let at = self.now() + due;
    self.schedule_absolute(at, action)
  }

  fn schedule_absolute(&self, due: Instant, action: Action) -> Subscription {
    let now = self.now();
    let due = if due <= now { now + TICK } else { due };
    self.vt.schedule_absolute(due, action)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::*;

  #[rxrt_macro::test]
  fn bump_rule() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let l = log.clone();
    scheduler.schedule_at(50, move |s| {
      let l1 = l.clone();
      s.schedule_fn(move |s| l1.lock().push(s.now().as_millis()));
      let l2 = l.clone();
      s.schedule_absolute_fn(Instant::from_millis(10), move |s| l2.lock().push(s.now().as_millis()));
    });
    scheduler.start();
    assert_eq!(*log.lock(), vec![51, 51]);
  }

  #[rxrt_macro::test]
  fn start_with_create_lifecycle() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(150, 1),
      on_next(210, 2),
      on_next(1010, 3),
    ]);
    let source = xs.clone();
    let results = scheduler.start_with_create(move || source);
    assert_eq!(results.messages(), vec![on_next(210, 2)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 1000)]);
  }

  #[rxrt_macro::test]
  fn custom_timing() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(150, 1), on_next(310, 2), on_next(420, 3)]);
    let source = xs.clone();
    let results = scheduler.start_with_timing(move || source, 100, 300, 400);
    assert_eq!(results.messages(), vec![on_next(310, 2)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(300, 400)]);
  }
}
