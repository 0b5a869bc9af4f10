use super::{timer_queue::TimerQueue, wall_clock, Action, Duration, Instant, ScheduledItem, Scheduler};
use crate::subscription::Subscription;
use futures::executor::ThreadPool;
use once_cell::sync::Lazy;
use std::sync::{
  atomic::{AtomicU64, Ordering},
  Arc,
};

static POOL_TIMER: Lazy<Arc<TimerQueue>> = Lazy::new(|| TimerQueue::new("rxrt-pool-timer"));
static SEQ: AtomicU64 = AtomicU64::new(0);

/// Runs actions on a fixed-size pool of worker threads. Timed work waits on a
/// shared timer thread and is then handed to the pool.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl ThreadPoolScheduler {
  /// A pool with `size` worker threads.
  pub fn new(size: usize) -> std::io::Result<Self> {
    let pool = ThreadPool::builder()
      .pool_size(size.max(1))
      .name_prefix("rxrt-pool-")
      .create()?;
    Ok(ThreadPoolScheduler { pool })
  }

  /// A pool sized to the number of CPUs.
  pub fn with_default_size() -> std::io::Result<Self> {
    let pool = ThreadPool::builder().name_prefix("rxrt-pool-").create()?;
    Ok(ThreadPoolScheduler { pool })
  }

  fn dispatch(&self, item: ScheduledItem) {
    let this = self.clone();
    self.pool.spawn_ok(async move { item.invoke(&this) });
  }
}

impl Scheduler for ThreadPoolScheduler {
  fn now(&self) -> Instant { wall_clock() }

  fn schedule(&self, action: Action) -> Subscription {
    let item = ScheduledItem::new(wall_clock(), SEQ.fetch_add(1, Ordering::Relaxed), action);
    let handle = item.handle();
    self.dispatch(item);
    handle
  }

  fn schedule_relative(&self, due: Duration, action: Action) -> Subscription {
    self.schedule_absolute(wall_clock() + due, action)
  }

  fn schedule_absolute(&self, due: Instant, action: Action) -> Subscription {
    if due <= wall_clock() {
      return self.schedule(action);
    }
    let item = ScheduledItem::new(due, SEQ.fetch_add(1, Ordering::Relaxed), action);
    let handle = item.handle();
    let this = self.clone();
    POOL_TIMER.add(due, item.disposable.clone(), Box::new(move || this.dispatch(item)));
    handle
  }
}
