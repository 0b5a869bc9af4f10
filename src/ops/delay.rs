//! `delay` and `delay_subscription`.

use crate::{
  error::RxError,
  notification::Notification,
  observable::{subscribe_detached, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  ops::timed_or,
  scheduler::{Duration, Instant, SchedulerExt, SchedulerRef},
  subscription::{CompositeDisposable, SerialDisposable, Subscription},
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

/// Shifts every value and the completion later by `due`. Errors are not
/// delayed: they drop whatever is still queued and go through at once.
pub struct DelayOp<S> {
  pub(crate) source: S,
  pub(crate) due: Duration,
  pub(crate) scheduler: Option<SchedulerRef>,
}

impl<S: Clone> Clone for DelayOp<S> {
  fn clone(&self) -> Self { DelayOp { source: self.source.clone(), due: self.due, scheduler: self.scheduler.clone() } }
}

struct Queue<T> {
  items: VecDeque<(Instant, Notification<T>)>,
  /// A drain is scheduled.
  active: bool,
  stopped: bool,
}

struct Shared<T> {
  queue: Mutex<Queue<T>>,
  observer: SharedObserver<T>,
  scheduler: SchedulerRef,
  timer: SerialDisposable,
}

impl<S: Observable> Observable for DelayOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let shared = Arc::new(Shared {
      queue: Mutex::new(Queue { items: VecDeque::new(), active: false, stopped: false }),
      observer: SharedObserver::from_box(observer),
      scheduler: timed_or(&self.scheduler, &scheduler),
      timer: SerialDisposable::new(),
    });
    let delay = DelayObserver { shared: shared.clone(), due: self.due };
    // The source is released as soon as it terminates, even while values
    // are still queued.
    let upstream = subscribe_detached(&self.source, Box::new(delay), scheduler);
    Subscription::new(CompositeDisposable::from_iter([upstream, Subscription::new(shared.timer.clone())]))
  }
}

struct DelayObserver<T> {
  shared: Arc<Shared<T>>,
  due: Duration,
}

impl<T: Send + 'static> DelayObserver<T> {
  fn push(&mut self, n: Notification<T>) {
    let at = self.shared.scheduler.now() + self.due;
    let start = {
      let mut q = self.shared.queue.lock();
      if q.stopped {
        return;
      }
      q.items.push_back((at, n));
      !std::mem::replace(&mut q.active, true)
    };
    if start {
      schedule_drain(&self.shared, self.due);
    }
  }
}

fn schedule_drain<T: Send + 'static>(shared: &Arc<Shared<T>>, after: Duration) {
  let this = shared.clone();
  shared.timer.set(shared.scheduler.schedule_relative_fn(after, move |s| drain(this, s.now())));
}

fn drain<T: Send + 'static>(shared: Arc<Shared<T>>, now: Instant) {
  loop {
    let next = {
      let mut q = shared.queue.lock();
      match q.items.front() {
        Some((at, _)) if *at <= now => q.items.pop_front(),
        Some((at, _)) => {
          let wait = *at - now;
          drop(q);
          schedule_drain(&shared, wait);
          return;
        }
        None => {
          q.active = false;
          return;
        }
      }
    };
    if let Some((_, n)) = next {
      let mut observer = shared.observer.clone();
      n.accept(&mut observer);
    }
  }
}

impl<T: Send + 'static> Observer<T> for DelayObserver<T> {
  fn next(&mut self, value: T) { self.push(Notification::Next(value)) }

  fn error(&mut self, err: RxError) {
    {
      let mut q = self.shared.queue.lock();
      q.stopped = true;
      q.items.clear();
    }
    self.shared.timer.set(Subscription::empty());
    self.shared.observer.clone().error(err);
  }

  fn complete(&mut self) { self.push(Notification::Completed) }

  fn is_finished(&self) -> bool { self.shared.observer.is_finished() }
}

/// Postpones the subscription to the source by `due`.
pub struct DelaySubscriptionOp<S> {
  pub(crate) source: Arc<S>,
  pub(crate) due: Duration,
  pub(crate) scheduler: Option<SchedulerRef>,
}

impl<S> Clone for DelaySubscriptionOp<S> {
  fn clone(&self) -> Self {
    DelaySubscriptionOp { source: self.source.clone(), due: self.due, scheduler: self.scheduler.clone() }
  }
}

impl<S: Observable> Observable for DelaySubscriptionOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let serial = SerialDisposable::new();
    let (source, slot, downstream) = (self.source.clone(), serial.clone(), scheduler.clone());
    let pending = timed_or(&self.scheduler, &scheduler).schedule_relative_fn(self.due, move |_| {
      slot.set(source.actual_subscribe(observer, downstream));
    });
    if serial.get().is_none() {
      serial.set(pending);
    }
    Subscription::new(serial)
  }
}
