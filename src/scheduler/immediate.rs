use super::{wall_clock, Action, Duration, Instant, Scheduler};
use crate::subscription::Subscription;

/// Runs every action synchronously on the caller's thread.
///
/// A positive relative delay blocks the calling thread for that long.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn now(&self) -> Instant { wall_clock() }

  fn schedule(&self, action: Action) -> Subscription { action(self) }

  fn schedule_relative(&self, due: Duration, action: Action) -> Subscription {
    if !due.is_zero() {
      std::thread::sleep(due);
    }
    action(self)
  }

  fn schedule_absolute(&self, due: Instant, action: Action) -> Subscription {
    self.schedule_relative(due - wall_clock(), action)
  }
}
