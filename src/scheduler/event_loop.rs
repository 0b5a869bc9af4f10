use super::{timer_queue::TimerQueue, wall_clock, Action, Duration, Instant, ScheduledItem, Scheduler};
use crate::subscription::Subscription;
use std::sync::{
  atomic::{AtomicU64, Ordering},
  Arc,
};

static SEQ: AtomicU64 = AtomicU64::new(0);

struct Lifetime(Arc<TimerQueue>);

impl Drop for Lifetime {
  fn drop(&mut self) { self.0.stop() }
}

/// Runs every action on one dedicated thread, in due-time order.
///
/// Unlike [`TimeoutScheduler`](super::TimeoutScheduler) the thread belongs
/// to this scheduler and its clones: [`EventLoopScheduler::dispose`] stops
/// it, and so does dropping the last clone once no action is pending.
/// Actions scheduled after that are dropped and logged.
#[derive(Clone)]
pub struct EventLoopScheduler {
  queue: Arc<Lifetime>,
}

impl Default for EventLoopScheduler {
  fn default() -> Self { EventLoopScheduler { queue: Arc::new(Lifetime(TimerQueue::new("rxrt-event-loop"))) } }
}

impl EventLoopScheduler {
  pub fn new() -> Self { Self::default() }

  /// Stop the thread; pending actions never run.
  pub fn dispose(&self) { self.queue.0.stop() }
}

impl Scheduler for EventLoopScheduler {
  fn now(&self) -> Instant { wall_clock() }

  fn schedule(&self, action: Action) -> Subscription { self.schedule_absolute(wall_clock(), action) }

  fn schedule_relative(&self, due: Duration, action: Action) -> Subscription {
    self.schedule_absolute(wall_clock() + due, action)
  }

  fn schedule_absolute(&self, due: Instant, action: Action) -> Subscription {
    let item = ScheduledItem::new(due, SEQ.fetch_add(1, Ordering::Relaxed), action);
    let handle = item.handle();
    let this = self.clone();
    let accepted = self.queue.0.add(due, item.disposable.clone(), Box::new(move || item.invoke(&this)));
    if !accepted {
      tracing::error!("action scheduled on a disposed event loop");
      handle.dispose();
    }
    handle
  }
}
