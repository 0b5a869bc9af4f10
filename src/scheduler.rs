//! Schedulers: the execution contexts every time-dependent operator runs on.
//!
//! A [`Scheduler`] owns a clock and a queue of actions. Each action receives
//! the scheduler it is running on so it can schedule follow-up work there,
//! and returns a [`Subscription`] that is disposed together with the
//! scheduled item.
//!
//! | Scheduler | Discipline |
//! |-----------|------------|
//! | [`ImmediateScheduler`] | Runs inline, blocking for relative delays |
//! | [`CurrentThreadScheduler`] | Per-thread FIFO trampoline |
//! | [`NewThreadScheduler`] | One dedicated thread per action |
//! | [`EventLoopScheduler`] | One dedicated thread for all its actions |
//! | [`ThreadPoolScheduler`] | Fixed pool plus the shared timer |
//! | [`TimeoutScheduler`] | Single timer thread, the default for time operators |
//! | [`CatchScheduler`] | Decorator deciding what happens to panicking actions |
//! | [`VirtualTimeScheduler`] / [`TestScheduler`] | Deterministic virtual clock |

use crate::subscription::{Disposable, SerialDisposable, SingleAssignmentDisposable, Subscription};
use once_cell::sync::Lazy;
use std::{
  cmp::Ordering,
  ops::{Add, AddAssign, Sub},
  sync::Arc,
};

mod catch;
mod event_loop;
mod immediate;
mod new_thread;
mod test_scheduler;
#[cfg(feature = "futures-scheduler")]
mod thread_pool;
mod timeout;
mod timer_queue;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
pub mod trampoline;
mod virtual_time;

pub use catch::CatchScheduler;
pub use event_loop::EventLoopScheduler;
pub use immediate::ImmediateScheduler;
pub use new_thread::NewThreadScheduler;
pub use test_scheduler::{TestScheduler, CREATED, DISPOSED, SUBSCRIBED};
#[cfg(feature = "futures-scheduler")]
pub use thread_pool::ThreadPoolScheduler;
pub use timeout::TimeoutScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;
pub use trampoline::CurrentThreadScheduler;
pub use virtual_time::VirtualTimeScheduler;

pub type Duration = std::time::Duration;

/// A point on a scheduler's clock, measured from that clock's epoch.
///
/// Real-time schedulers share one process-wide epoch; virtual-time
/// schedulers start at zero. One virtual tick is one millisecond.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(Duration);

impl Instant {
  pub const ZERO: Instant = Instant(Duration::ZERO);

  pub const fn from_duration(d: Duration) -> Self { Instant(d) }

  pub const fn from_millis(ms: u64) -> Self { Instant(Duration::from_millis(ms)) }

  pub fn as_duration(&self) -> Duration { self.0 }

  pub fn as_millis(&self) -> u64 { self.0.as_millis() as u64 }

  /// Span from `earlier` to `self`, zero when `earlier` is later.
  pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
    self.0.saturating_sub(earlier.0)
  }
}

impl Add<Duration> for Instant {
  type Output = Instant;
  fn add(self, rhs: Duration) -> Instant { Instant(self.0 + rhs) }
}

impl AddAssign<Duration> for Instant {
  fn add_assign(&mut self, rhs: Duration) { self.0 += rhs }
}

impl Sub<Duration> for Instant {
  type Output = Instant;
  fn sub(self, rhs: Duration) -> Instant { Instant(self.0.saturating_sub(rhs)) }
}

impl Sub<Instant> for Instant {
  type Output = Duration;
  fn sub(self, rhs: Instant) -> Duration { self.saturating_duration_since(rhs) }
}

static EPOCH: Lazy<std::time::Instant> = Lazy::new(std::time::Instant::now);

/// Wall clock shared by the real-time schedulers.
pub(crate) fn wall_clock() -> Instant { Instant(EPOCH.elapsed()) }

/// Clamp a signed millisecond span to a non-negative [`Duration`].
pub fn normalize(millis: i64) -> Duration { Duration::from_millis(millis.max(0) as u64) }

/// Unit of scheduled work. It receives the scheduler it runs on and returns
/// whatever must be released when the scheduled item is disposed.
pub type Action = Box<dyn FnOnce(&dyn Scheduler) -> Subscription + Send>;

/// Work re-invoked on every period of [`Scheduler::schedule_periodic`].
pub type PeriodicAction = Box<dyn FnMut() + Send>;

pub type SchedulerRef = Arc<dyn Scheduler>;

pub trait Scheduler: Send + Sync {
  /// Current time of this scheduler's clock; never decreases.
  fn now(&self) -> Instant;

  fn schedule(&self, action: Action) -> Subscription;

  /// Run `action` after `due`; a zero span means as soon as possible.
  fn schedule_relative(&self, due: Duration, action: Action) -> Subscription;

  /// Run `action` at `due`; a time in the past means as soon as possible.
  fn schedule_absolute(&self, due: Instant, action: Action) -> Subscription;

  /// Re-invoke `action` every `period` until the returned subscription is
  /// disposed. Each next due time is `max(now, previous_due + period)`, so a
  /// late tick does not shift the ones after it.
  fn schedule_periodic(&self, period: Duration, action: PeriodicAction) -> Subscription {
    let serial = SerialDisposable::new();
    let due = self.now() + period;
    let first = self.schedule_absolute(due, periodic_tick(due, period, action, serial.clone()));
    serial.set(first);
    Subscription::new(serial)
  }
}

fn periodic_tick(due: Instant, period: Duration, mut action: PeriodicAction, serial: SerialDisposable) -> Action {
  Box::new(move |scheduler| {
    if serial.is_disposed() {
      return Subscription::empty();
    }
    action();
    let next = (due + period).max(scheduler.now());
    let sub = scheduler.schedule_absolute(next, periodic_tick(next, period, action, serial.clone()));
    serial.set(sub);
    Subscription::empty()
  })
}

/// Handle given to a recursive action to ask for another run.
#[derive(Debug, Default)]
pub struct Recurse {
  again: Option<Duration>,
}

impl Recurse {
  /// Schedule the action again as soon as possible.
  pub fn again(&mut self) { self.again = Some(Duration::ZERO) }

  /// Schedule the action again after `delay`.
  pub fn again_after(&mut self, delay: Duration) { self.again = Some(delay) }
}

/// Convenience layer over [`Scheduler`], available on every scheduler
/// including `dyn Scheduler`.
pub trait SchedulerExt: Scheduler {
  fn schedule_fn<F>(&self, f: F) -> Subscription
  where
    F: FnOnce(&dyn Scheduler) + Send + 'static,
  {
    self.schedule(Box::new(move |s| {
      f(s);
      Subscription::empty()
    }))
  }

  fn schedule_relative_fn<F>(&self, due: Duration, f: F) -> Subscription
  where
    F: FnOnce(&dyn Scheduler) + Send + 'static,
  {
    self.schedule_relative(
      due,
      Box::new(move |s| {
        f(s);
        Subscription::empty()
      }),
    )
  }

  fn schedule_absolute_fn<F>(&self, due: Instant, f: F) -> Subscription
  where
    F: FnOnce(&dyn Scheduler) + Send + 'static,
  {
    self.schedule_absolute(
      due,
      Box::new(move |s| {
        f(s);
        Subscription::empty()
      }),
    )
  }

  /// Run `f` now; each call of [`Recurse::again`] inside `f` schedules one
  /// more run on the scheduler the action is executing on.
  fn schedule_recursive<F>(&self, f: F) -> Subscription
  where
    F: FnMut(&dyn Scheduler, &mut Recurse) + Send + 'static,
  {
    let serial = SerialDisposable::new();
    let first = self.schedule(recursive_step(f, serial.clone()));
    serial.set(first);
    Subscription::new(serial)
  }

  /// Like [`SchedulerExt::schedule_recursive`] but the first run happens after
  /// `due`.
  fn schedule_recursive_relative<F>(&self, due: Duration, f: F) -> Subscription
  where
    F: FnMut(&dyn Scheduler, &mut Recurse) + Send + 'static,
  {
    let serial = SerialDisposable::new();
    let first = self.schedule_relative(due, recursive_step(f, serial.clone()));
    serial.set(first);
    Subscription::new(serial)
  }

  fn to_relative(&self, due: Instant) -> Duration { due - self.now() }

  fn to_absolute(&self, span: Duration) -> Instant { self.now() + span }
}

impl<S: Scheduler + ?Sized> SchedulerExt for S {}

fn recursive_step<F>(mut f: F, serial: SerialDisposable) -> Action
where
  F: FnMut(&dyn Scheduler, &mut Recurse) + Send + 'static,
{
  Box::new(move |scheduler| {
    if serial.is_disposed() {
      return Subscription::empty();
    }
    let mut recurse = Recurse::default();
    f(scheduler, &mut recurse);
    if let Some(delay) = recurse.again {
      let next = recursive_step(f, serial.clone());
      let sub = if delay.is_zero() {
        scheduler.schedule(next)
      } else {
        scheduler.schedule_relative(delay, next)
      };
      serial.set(sub);
    }
    Subscription::empty()
  })
}

// ==================== Scheduled items ====================

/// A queued action ordered by `(due, seq)` so ties keep FIFO order.
pub(crate) struct ScheduledItem {
  pub(crate) due: Instant,
  pub(crate) seq: u64,
  action: Action,
  pub(crate) disposable: SingleAssignmentDisposable,
}

impl ScheduledItem {
  pub(crate) fn new(due: Instant, seq: u64, action: Action) -> Self {
    ScheduledItem { due, seq, action, disposable: SingleAssignmentDisposable::new() }
  }

  /// The handle returned to whoever scheduled this item.
  pub(crate) fn handle(&self) -> Subscription { Subscription::new(self.disposable.clone()) }

  #[inline]
  pub(crate) fn is_cancelled(&self) -> bool { self.disposable.is_disposed() }

  pub(crate) fn invoke(self, scheduler: &dyn Scheduler) {
    if self.is_cancelled() {
      return;
    }
    let sub = (self.action)(scheduler);
    // Only fails if someone else assigned the slot, which never happens.
    let _ = self.disposable.set(sub);
  }
}

impl PartialEq for ScheduledItem {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for ScheduledItem {}

impl PartialOrd for ScheduledItem {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledItem {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by seq
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}
