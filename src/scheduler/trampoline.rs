//! The current-thread trampoline.
//!
//! The first schedule call on a thread installs a queue, drains it to empty
//! and uninstalls it again. Schedule calls made while the queue is draining
//! only enqueue, so recursive producers run in FIFO order with a flat stack.

use super::{wall_clock, Action, Duration, Instant, ScheduledItem, Scheduler};
use crate::subscription::Subscription;
use std::{cell::RefCell, collections::BinaryHeap};

#[derive(Default)]
struct Queue {
  heap: BinaryHeap<ScheduledItem>,
  seq: u64,
}

thread_local! {
  static QUEUE: RefCell<Option<Queue>> = const { RefCell::new(None) };
}

/// Schedules work on the calling thread through a FIFO trampoline.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentThreadScheduler;

/// Whether a trampoline is currently draining on this thread.
pub fn is_running() -> bool { QUEUE.with(|q| q.borrow().is_some()) }

/// Run `f` with a trampoline installed on this thread, then drain every item
/// `f` scheduled. When a trampoline is already running, `f` is called
/// directly and the outer drain picks up its work.
pub fn run<R>(f: impl FnOnce() -> R) -> R {
  if is_running() {
    return f();
  }
  QUEUE.with(|q| *q.borrow_mut() = Some(Queue::default()));
  tracing::trace!("trampoline installed");
  let _guard = Uninstall;
  let r = f();
  drain();
  r
}

struct Uninstall;

impl Drop for Uninstall {
  fn drop(&mut self) {
    QUEUE.with(|q| q.borrow_mut().take());
    tracing::trace!("trampoline uninstalled");
  }
}

fn drain() {
  loop {
    let item = QUEUE.with(|q| q.borrow_mut().as_mut().and_then(|q| q.heap.pop()));
    let Some(item) = item else { break };
    if item.is_cancelled() {
      continue;
    }
    let now = wall_clock();
    if item.due > now {
      std::thread::sleep(item.due - now);
    }
    item.invoke(&CurrentThreadScheduler);
  }
}

fn enqueue(due: Instant, action: Action) -> Subscription {
  QUEUE.with(|q| {
    let mut q = q.borrow_mut();
    // Callers install the queue first; `run` guarantees it.
    let q = q.get_or_insert_with(Queue::default);
    q.seq += 1;
    let item = ScheduledItem::new(due, q.seq, action);
    let handle = item.handle();
    q.heap.push(item);
    handle
  })
}

impl Scheduler for CurrentThreadScheduler {
  fn now(&self) -> Instant { wall_clock() }

  fn schedule(&self, action: Action) -> Subscription { self.schedule_absolute(wall_clock(), action) }

  fn schedule_relative(&self, due: Duration, action: Action) -> Subscription {
    self.schedule_absolute(wall_clock() + due, action)
  }

  fn schedule_absolute(&self, due: Instant, action: Action) -> Subscription {
    run(move || enqueue(due, action))
  }
}
