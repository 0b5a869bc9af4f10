use super::{wall_clock, Action, Duration, Instant, ScheduledItem, Scheduler};
use crate::subscription::Subscription;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;

static SEQ: AtomicU64 = AtomicU64::new(0);

/// Runs actions as blocking tasks on a tokio runtime.
#[derive(Clone)]
pub struct TokioScheduler {
  handle: Handle,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { TokioScheduler { handle } }

  /// Scheduler bound to the runtime of the calling task.
  pub fn current() -> Self { TokioScheduler { handle: Handle::current() } }
}

impl Scheduler for TokioScheduler {
  fn now(&self) -> Instant { wall_clock() }

  fn schedule(&self, action: Action) -> Subscription { self.schedule_relative(Duration::ZERO, action) }

  fn schedule_relative(&self, due: Duration, action: Action) -> Subscription {
    let item = ScheduledItem::new(wall_clock() + due, SEQ.fetch_add(1, Ordering::Relaxed), action);
    let handle = item.handle();
    let this = self.clone();
    self.handle.spawn_blocking(move || {
      if !due.is_zero() && !item.is_cancelled() {
        std::thread::sleep(due);
      }
      item.invoke(&this)
    });
    handle
  }

  fn schedule_absolute(&self, due: Instant, action: Action) -> Subscription {
    self.schedule_relative(due - wall_clock(), action)
  }
}
