//! Test kit: recorded notifications, subscription logs, mock observers and
//! hot/cold observables driven by a [`TestScheduler`].
//!
//! Expected message lists are built with the factories [`on_next`],
//! [`on_error`], [`on_completed`] and [`subscribe`], then compared by value
//! with what a [`MockObserver`] recorded.
//!
//! [`TestScheduler`]: crate::scheduler::TestScheduler

use crate::{error::RxError, notification::Notification};
use std::fmt;

mod cold_observable;
mod hot_observable;
pub mod marbles;
mod mock_observer;

pub use cold_observable::ColdObservable;
pub use hot_observable::HotObservable;
pub use marbles::MARBLE_FRAME;
pub use mock_observer::MockObserver;

/// Unsubscribe time of a subscription that was never disposed.
pub const NEVER: u64 = u64::MAX;

/// A notification stamped with the virtual tick it happened at.
#[derive(Clone, PartialEq, Eq)]
pub struct Recorded<T> {
  pub time: u64,
  pub value: Notification<T>,
}

impl<T> Recorded<T> {
  pub fn new(time: u64, value: Notification<T>) -> Self { Recorded { time, value } }
}

impl<T: fmt::Debug> fmt::Debug for Recorded<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.value {
      Notification::Next(v) => write!(f, "{:?}@{}", v, self.time),
      Notification::Error(e) => write!(f, "error({})@{}", e, self.time),
      Notification::Completed => write!(f, "completed@{}", self.time),
    }
  }
}

/// When a test observable was subscribed and disposed, in ticks.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionLog {
  pub subscribe: u64,
  pub unsubscribe: u64,
}

impl fmt::Debug for SubscriptionLog {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.unsubscribe == NEVER {
      write!(f, "({}, never)", self.subscribe)
    } else {
      write!(f, "({}, {})", self.subscribe, self.unsubscribe)
    }
  }
}

// ==================== Factories ====================

pub fn on_next<T>(time: u64, value: T) -> Recorded<T> { Recorded::new(time, Notification::Next(value)) }

pub fn on_error<T>(time: u64, err: impl Into<RxError>) -> Recorded<T> {
  Recorded::new(time, Notification::Error(err.into()))
}

pub fn on_completed<T>(time: u64) -> Recorded<T> { Recorded::new(time, Notification::Completed) }

pub fn subscribe(start: u64, end: u64) -> SubscriptionLog { SubscriptionLog { subscribe: start, unsubscribe: end } }

#[cfg(test)]
mod tests {
  use super::*;

  #[rxrt_macro::test]
  fn recorded_compares_by_value() {
    assert_eq!(on_next(210, 'a'), Recorded::new(210, Notification::Next('a')));
    assert_ne!(on_next(210, 'a'), on_next(211, 'a'));
    assert_eq!(on_error::<i32>(300, "boom"), on_error(300, RxError::msg("boom")));
  }

  #[rxrt_macro::test]
  fn debug_output_is_compact() {
    assert_eq!(format!("{:?}", on_next(210, 3)), "3@210");
    assert_eq!(format!("{:?}", on_completed::<i32>(250)), "completed@250");
    assert_eq!(format!("{:?}", subscribe(200, NEVER)), "(200, never)");
  }
}
