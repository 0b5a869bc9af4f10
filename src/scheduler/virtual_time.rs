use super::{Action, Duration, Instant, ScheduledItem, Scheduler};
use crate::{error::RxError, subscription::Subscription};
use parking_lot::Mutex;
use std::{collections::BinaryHeap, sync::Arc};

#[derive(Default)]
struct State {
  clock: Instant,
  queue: BinaryHeap<ScheduledItem>,
  seq: u64,
  is_enabled: bool,
}

/// A scheduler whose clock only moves when it is told to.
///
/// Work is kept in a priority queue ordered by `(due, seq)`. [`start`] drains
/// the queue, jumping the clock to each item's due time; [`advance_to`] drains
/// up to a point in time; [`sleep`] moves the clock without running anything.
///
/// [`start`]: VirtualTimeScheduler::start
/// [`advance_to`]: VirtualTimeScheduler::advance_to
/// [`sleep`]: VirtualTimeScheduler::sleep
#[derive(Clone, Default)]
pub struct VirtualTimeScheduler(Arc<Mutex<State>>);

impl VirtualTimeScheduler {
  pub fn new() -> Self { Self::default() }

  pub fn with_clock(clock: Instant) -> Self {
    let this = Self::default();
    this.0.lock().clock = clock;
    this
  }

  pub fn is_enabled(&self) -> bool { self.0.lock().is_enabled }

  pub fn pending(&self) -> usize { self.0.lock().queue.len() }

  /// Drain the queue until it is empty or [`stop`](Self::stop) is called.
  pub fn start(&self) { self.run_on(self) }

  /// Same as [`start`](Self::start) but actions receive `outer` as the
  /// scheduler they run on, so schedulers built on top of this one keep
  /// their own scheduling rules for follow-up work.
  pub(crate) fn run_on(&self, outer: &dyn Scheduler) {
    if !self.enable() {
      return;
    }
    while let Some(item) = self.next_item(None) {
      item.invoke(outer);
      if !self.is_enabled() {
        break;
      }
    }
    self.0.lock().is_enabled = false;
  }

  pub fn stop(&self) { self.0.lock().is_enabled = false }

  /// Run every item due at or before `time`, then set the clock to `time`.
  pub fn advance_to(&self, time: Instant) -> Result<(), RxError> { self.advance_to_on(self, time) }

  pub(crate) fn advance_to_on(&self, outer: &dyn Scheduler, time: Instant) -> Result<(), RxError> {
    {
      let st = self.0.lock();
      if st.clock > time {
        return Err(RxError::out_of_range("cannot advance a virtual clock backwards"));
      }
      if st.clock == time {
        return Ok(());
      }
    }
    if !self.enable() {
      return Ok(());
    }
    while let Some(item) = self.next_item(Some(time)) {
      item.invoke(outer);
      if !self.is_enabled() {
        break;
      }
    }
    let mut st = self.0.lock();
    st.is_enabled = false;
    st.clock = st.clock.max(time);
    tracing::trace!(clock = st.clock.as_millis(), "virtual clock advanced");
    Ok(())
  }

  pub fn advance_by(&self, span: Duration) -> Result<(), RxError> {
    let to = self.now() + span;
    self.advance_to(to)
  }

  pub(crate) fn advance_by_on(&self, outer: &dyn Scheduler, span: Duration) -> Result<(), RxError> {
    let to = self.now() + span;
    self.advance_to_on(outer, to)
  }

  /// Move the clock forward without running any queued work.
  pub fn sleep(&self, span: Duration) { self.0.lock().clock += span }

  fn enable(&self) -> bool {
    let mut st = self.0.lock();
    if st.is_enabled {
      false
    } else {
      st.is_enabled = true;
      true
    }
  }

  /// Pop the next live item due no later than `until`, moving the clock to
  /// its due time.
  fn next_item(&self, until: Option<Instant>) -> Option<ScheduledItem> {
    let mut st = self.0.lock();
    loop {
      let head = st.queue.peek()?;
      if head.is_cancelled() {
        st.queue.pop();
        continue;
      }
      if until.is_some_and(|limit| head.due > limit) {
        return None;
      }
      let item = st.queue.pop()?;
      if item.due > st.clock {
        st.clock = item.due;
      }
      return Some(item);
    }
  }
}

impl Scheduler for VirtualTimeScheduler {
  fn now(&self) -> Instant { self.0.lock().clock }

  fn schedule(&self, action: Action) -> Subscription {
    let now = self.now();
    self.schedule_absolute(now, action)
  }

  fn schedule_relative(&self, due: Duration, action: Action) -> Subscription {
    let at = self.now() + due;
    self.schedule_absolute(at, action)
  }

  fn schedule_absolute(&self, due: Instant, action: Action) -> Subscription {
    let mut st = self.0.lock();
    st.seq += 1;
    let item = ScheduledItem::new(due, st.seq, action);
    let handle = item.handle();
    st.queue.push(item);
    handle
  }
}
