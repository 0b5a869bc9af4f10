//! One background thread firing callbacks at their due time.

use super::{wall_clock, Instant};
use crate::{
  error::RxError,
  subscription::{Disposable, SingleAssignmentDisposable},
};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  panic::{catch_unwind, AssertUnwindSafe},
  sync::Arc,
};

/// Cancelled entries are swept once the heap grows past this size.
const SWEEP_THRESHOLD: usize = 1024;

pub(crate) type Fire = Box<dyn FnOnce() + Send>;

struct Entry {
  due: Instant,
  seq: u64,
  cancel: SingleAssignmentDisposable,
  fire: Fire,
}

impl PartialEq for Entry {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Entry {
  fn cmp(&self, other: &Self) -> Ordering {
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct State {
  heap: BinaryHeap<Entry>,
  seq: u64,
  started: bool,
  stopped: bool,
}

#[derive(Default)]
pub(crate) struct TimerQueue {
  name: &'static str,
  state: Mutex<State>,
  cond: Condvar,
}

impl TimerQueue {
  pub(crate) fn new(name: &'static str) -> Arc<Self> {
    Arc::new(TimerQueue { name, ..Default::default() })
  }

  /// Call `fire` at `due` on the timer thread unless `cancel` is disposed by
  /// then. Returns `false`, dropping `fire`, once the queue is stopped.
  pub(crate) fn add(self: &Arc<Self>, due: Instant, cancel: SingleAssignmentDisposable, fire: Fire) -> bool {
    let mut st = self.state.lock();
    if st.stopped {
      return false;
    }
    if !st.started {
      st.started = self.spawn();
    }
    let mut swept = Vec::new();
    if st.heap.len() >= SWEEP_THRESHOLD {
      let (live, cancelled): (Vec<Entry>, Vec<Entry>) =
        std::mem::take(&mut st.heap).into_iter().partition(|e| !e.cancel.is_disposed());
      st.heap = BinaryHeap::from(live);
      swept = cancelled;
    }
    st.seq += 1;
    let seq = st.seq;
    st.heap.push(Entry { due, seq, cancel, fire });
    self.cond.notify_one();
    // Entries may own the last handle to this queue; drop them unlocked.
    drop(st);
    drop(swept);
    true
  }

  /// Drop every pending entry and let the thread exit.
  pub(crate) fn stop(&self) {
    let pending = {
      let mut st = self.state.lock();
      st.stopped = true;
      std::mem::take(&mut st.heap)
    };
    self.cond.notify_all();
    drop(pending);
  }

  /// Start the timer thread; a failed spawn is retried by the next `add`.
  fn spawn(self: &Arc<Self>) -> bool {
    let this = self.clone();
    let spawned = std::thread::Builder::new()
      .name(self.name.to_owned())
      .spawn(move || this.run());
    match spawned {
      Ok(_) => {
        tracing::debug!(thread = self.name, "timer thread started");
        true
      }
      Err(err) => {
        tracing::warn!(thread = self.name, %err, "failed to spawn timer thread");
        false
      }
    }
  }

  fn run(&self) {
    let mut st = self.state.lock();
    loop {
      if st.stopped {
        tracing::debug!(thread = self.name, "timer thread stopped");
        return;
      }
      let now = wall_clock();
      let due = match st.heap.peek() {
        None => {
          self.cond.wait(&mut st);
          continue;
        }
        Some(e) if e.cancel.is_disposed() => now,
        Some(e) => e.due,
      };
      if due > now {
        self.cond.wait_for(&mut st, due - now);
        continue;
      }
      let Some(entry) = st.heap.pop() else { continue };
      // The thread is shared by every action on this queue; a panicking
      // action must not take it down. Cancelled entries are dropped unlocked
      // too, as they may own the last handle to this queue.
      let outcome = MutexGuard::unlocked(&mut st, move || {
        if entry.cancel.is_disposed() {
          Ok(())
        } else {
          catch_unwind(AssertUnwindSafe(entry.fire))
        }
      });
      if let Err(payload) = outcome {
        let err = RxError::from_panic(payload.as_ref());
        tracing::error!(thread = self.name, error = %err, "timed action panicked");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::Duration;
  use std::sync::mpsc;

  #[rxrt_macro::test]
  fn keeps_firing_after_a_panicking_action() {
    let queue = TimerQueue::new("rxrt-timer-test");
    queue.add(wall_clock(), SingleAssignmentDisposable::new(), Box::new(|| panic!("boom")));
    let (tx, rx) = mpsc::channel();
    queue.add(
      wall_clock() + Duration::from_millis(5),
      SingleAssignmentDisposable::new(),
      Box::new(move || {
        let _ = tx.send("fired");
      }),
    );
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok("fired"));
  }

  #[rxrt_macro::test]
  fn stopped_queue_refuses_entries() {
    let queue = TimerQueue::new("rxrt-timer-test");
    let (tx, rx) = mpsc::channel::<i32>();
    let early = tx.clone();
    assert!(queue.add(
      wall_clock() + Duration::from_millis(50),
      SingleAssignmentDisposable::new(),
      Box::new(move || {
        let _ = early.send(1);
      }),
    ));
    queue.stop();
    assert!(!queue.add(wall_clock(), SingleAssignmentDisposable::new(), Box::new(move || {
      let _ = tx.send(2);
    })));
    assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
  }
}
