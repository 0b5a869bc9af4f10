use super::{Observer, SharedObserver};
use crate::{
  error::RxError,
  notification::Notification,
  scheduler::SchedulerRef,
  subscription::{Disposable, SerialDisposable, Subscription},
};
use parking_lot::Mutex;
use std::{
  collections::VecDeque,
  panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
  sync::Arc,
};

struct State<Item> {
  queue: VecDeque<Notification<Item>>,
  is_acquired: bool,
  has_faulted: bool,
}

struct Inner<Item> {
  scheduler: SchedulerRef,
  observer: SharedObserver<Item>,
  state: Mutex<State<Item>>,
  disposable: SerialDisposable,
}

/// Queues notifications and replays them on a scheduler, one per scheduled
/// turn.
///
/// Pushing only enqueues; [`ScheduledObserver::ensure_active`] starts a
/// drain if none is running. Used by `observe_on` and by `ReplaySubject` to
/// decouple emission from consumption.
pub struct ScheduledObserver<Item> {
  inner: Arc<Inner<Item>>,
  auto_activate: bool,
}

impl<Item> Clone for ScheduledObserver<Item> {
  fn clone(&self) -> Self { ScheduledObserver { inner: self.inner.clone(), auto_activate: self.auto_activate } }
}

impl<Item: Send + 'static> ScheduledObserver<Item> {
  pub fn new(scheduler: SchedulerRef, observer: SharedObserver<Item>) -> Self {
    ScheduledObserver {
      inner: Arc::new(Inner {
        scheduler,
        observer,
        state: Mutex::new(State { queue: VecDeque::new(), is_acquired: false, has_faulted: false }),
        disposable: SerialDisposable::new(),
      }),
      auto_activate: false,
    }
  }

  /// Variant that calls [`ensure_active`](Self::ensure_active) after every
  /// notification, which is what `observe_on` needs.
  pub fn auto_activated(scheduler: SchedulerRef, observer: SharedObserver<Item>) -> Self {
    ScheduledObserver { auto_activate: true, ..Self::new(scheduler, observer) }
  }

  fn push(&self, n: Notification<Item>) {
    self.inner.state.lock().queue.push_back(n);
    if self.auto_activate {
      self.ensure_active();
    }
  }

  /// Schedule a drain unless one is already pending.
  pub fn ensure_active(&self) {
    let is_owner = {
      let mut st = self.inner.state.lock();
      if st.has_faulted || st.queue.is_empty() || st.is_acquired {
        false
      } else {
        st.is_acquired = true;
        true
      }
    };
    if is_owner {
      schedule_run(&self.inner);
    }
  }

  /// Stop draining and detach the observer.
  pub fn dispose(&self) {
    self.inner.disposable.dispose();
    self.inner.observer.close();
    self.inner.state.lock().queue.clear();
  }
}

fn schedule_run<Item: Send + 'static>(inner: &Arc<Inner<Item>>) {
  let this = inner.clone();
  let sub = inner.scheduler.schedule(Box::new(move |_| {
    run(this);
    Subscription::empty()
  }));
  inner.disposable.set(sub);
}

fn run<Item: Send + 'static>(inner: Arc<Inner<Item>>) {
  let work = {
    let mut st = inner.state.lock();
    match st.queue.pop_front() {
      Some(n) => n,
      None => {
        st.is_acquired = false;
        return;
      }
    }
  };
  let mut observer = inner.observer.clone();
  if let Err(payload) = catch_unwind(AssertUnwindSafe(|| work.accept(&mut observer))) {
    let mut st = inner.state.lock();
    st.queue.clear();
    st.has_faulted = true;
    drop(st);
    resume_unwind(payload);
  }
  if !inner.disposable.is_disposed() {
    schedule_run(&inner);
  }
}

impl<Item: Send + 'static> Observer<Item> for ScheduledObserver<Item> {
  fn next(&mut self, value: Item) { self.push(Notification::Next(value)) }

  fn error(&mut self, err: RxError) { self.push(Notification::Error(err)) }

  fn complete(&mut self) { self.push(Notification::Completed) }

  fn is_finished(&self) -> bool { self.inner.observer.is_finished() }
}
