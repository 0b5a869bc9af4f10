use super::{timer_queue::TimerQueue, wall_clock, Action, Duration, Instant, ScheduledItem, Scheduler};
use crate::subscription::Subscription;
use once_cell::sync::Lazy;
use std::sync::{
  atomic::{AtomicU64, Ordering},
  Arc,
};

static TIMER: Lazy<Arc<TimerQueue>> = Lazy::new(|| TimerQueue::new("rxrt-timeout"));
static SEQ: AtomicU64 = AtomicU64::new(0);

/// Runs every action on one process-wide timer thread.
///
/// This is the scheduler time-based operators fall back to when neither the
/// operator nor the subscription names one.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
  fn now(&self) -> Instant { wall_clock() }

  fn schedule(&self, action: Action) -> Subscription { self.schedule_absolute(wall_clock(), action) }

  fn schedule_relative(&self, due: Duration, action: Action) -> Subscription {
    self.schedule_absolute(wall_clock() + due, action)
  }

  fn schedule_absolute(&self, due: Instant, action: Action) -> Subscription {
    let item = ScheduledItem::new(due, SEQ.fetch_add(1, Ordering::Relaxed), action);
    let handle = item.handle();
    TIMER.add(due, item.disposable.clone(), Box::new(move || item.invoke(&TimeoutScheduler)));
    handle
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::SchedulerExt;
  use std::sync::mpsc;

  #[rxrt_macro::test]
  fn fires_in_due_order() {
    let (tx, rx) = mpsc::channel();
    let t1 = tx.clone();
    TimeoutScheduler.schedule_relative_fn(Duration::from_millis(40), move |_| t1.send(2).unwrap());
    TimeoutScheduler.schedule_relative_fn(Duration::from_millis(10), move |_| tx.send(1).unwrap());
    let got: Vec<i32> = rx.iter().take(2).collect();
    assert_eq!(got, vec![1, 2]);
  }

  #[rxrt_macro::test]
  fn survives_a_panicking_action() {
    TimeoutScheduler.schedule_relative_fn(Duration::from_millis(1), |_| panic!("boom"));
    let (tx, rx) = mpsc::channel();
    TimeoutScheduler.schedule_relative_fn(Duration::from_millis(10), move |_| {
      let _ = tx.send(1);
    });
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(1));
  }

  #[rxrt_macro::test]
  fn cancelled_never_fires() {
    let (tx, rx) = mpsc::channel::<i32>();
    let sub = TimeoutScheduler.schedule_relative_fn(Duration::from_millis(10), move |_| {
      let _ = tx.send(1);
    });
    sub.dispose();
    assert!(rx.recv_timeout(Duration::from_millis(60)).is_err());
  }
}
