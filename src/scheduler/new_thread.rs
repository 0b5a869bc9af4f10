use super::{trampoline, wall_clock, Action, CurrentThreadScheduler, Duration, Instant, PeriodicAction, ScheduledItem, Scheduler};
use crate::subscription::{BooleanDisposable, Disposable, Subscription};
use std::sync::{
  atomic::{AtomicU64, Ordering},
  Arc,
};

static SEQ: AtomicU64 = AtomicU64::new(0);

/// Spawns a dedicated thread for every scheduled action.
///
/// Inside that thread a trampoline is installed and the action runs on the
/// [`CurrentThreadScheduler`], so its own follow-up work stays on the same
/// thread in FIFO order.
#[derive(Debug, Clone)]
pub struct NewThreadScheduler {
  name: Arc<str>,
}

impl Default for NewThreadScheduler {
  fn default() -> Self { NewThreadScheduler::with_name("rxrt-thread") }
}

impl NewThreadScheduler {
  pub fn new() -> Self { Self::default() }

  /// Threads spawned by this scheduler carry `name`.
  pub fn with_name(name: &str) -> Self { NewThreadScheduler { name: Arc::from(name) } }

  fn spawn<F: FnOnce() + Send + 'static>(&self, f: F) {
    let spawned = std::thread::Builder::new().name(self.name.to_string()).spawn(f);
    if let Err(err) = spawned {
      tracing::warn!(%err, thread = %self.name, "failed to spawn scheduler thread");
    }
  }
}

impl Scheduler for NewThreadScheduler {
  fn now(&self) -> Instant { wall_clock() }

  fn schedule(&self, action: Action) -> Subscription { self.schedule_absolute(wall_clock(), action) }

  fn schedule_relative(&self, due: Duration, action: Action) -> Subscription {
    self.schedule_absolute(wall_clock() + due, action)
  }

  fn schedule_absolute(&self, due: Instant, action: Action) -> Subscription {
    let item = ScheduledItem::new(due, SEQ.fetch_add(1, Ordering::Relaxed), action);
    let handle = item.handle();
    self.spawn(move || {
      let now = wall_clock();
      if item.due > now && !item.is_cancelled() {
        std::thread::sleep(item.due - now);
      }
      trampoline::run(|| item.invoke(&CurrentThreadScheduler));
    });
    handle
  }

  fn schedule_periodic(&self, period: Duration, mut action: PeriodicAction) -> Subscription {
    let cancel = Arc::new(BooleanDisposable::new());
    let flag = cancel.clone();
    self.spawn(move || {
      let mut due = wall_clock() + period;
      loop {
        let now = wall_clock();
        if due > now {
          std::thread::sleep(due - now);
        }
        if flag.is_disposed() {
          break;
        }
        action();
        due = (due + period).max(wall_clock());
      }
    });
    Subscription::from_fn(move || cancel.dispose())
  }
}
