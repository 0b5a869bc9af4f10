use super::{
  report_refusal,
  subscribers::{broadcast_next, Subscribers},
  Stopped,
};
use crate::{
  error::{RxError, RxResult},
  observable::{subscribe_detached, Observable},
  observer::{BoxObserver, Observer, ScheduledObserver, SharedObserver},
  scheduler::{CurrentThreadScheduler, Duration, Instant, SchedulerRef},
  subscription::Subscription,
  Value,
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

struct State<T> {
  buffer: VecDeque<(Instant, T)>,
  observers: Subscribers<ScheduledObserver<T>>,
  stopped: Stopped,
  disposed: bool,
}

struct Inner<T> {
  buffer_size: Option<usize>,
  window: Option<Duration>,
  scheduler: SchedulerRef,
  state: Mutex<State<T>>,
}

impl<T> Inner<T> {
  /// Drop values over the size bound first, then those older than the
  /// window.
  fn trim(&self, st: &mut State<T>) {
    if let Some(size) = self.buffer_size {
      while st.buffer.len() > size {
        st.buffer.pop_front();
      }
    }
    if let Some(window) = self.window {
      let now = self.scheduler.now();
      while st.buffer.front().is_some_and(|(at, _)| now - *at > window) {
        st.buffer.pop_front();
      }
    }
  }
}

/// A subject that records values and replays them to every new subscriber.
///
/// The buffer is bounded by `buffer_size` values and by a time `window` on
/// the subject's scheduler; `None` leaves that dimension unbounded. Each
/// subscriber is fed through its own [`ScheduledObserver`], so replayed and
/// live values reach it in order and one per scheduled turn.
pub struct ReplaySubject<T> {
  inner: Arc<Inner<T>>,
}

impl<T> Clone for ReplaySubject<T> {
  fn clone(&self) -> Self { ReplaySubject { inner: self.inner.clone() } }
}

impl<T: Value> ReplaySubject<T> {
  pub fn new(buffer_size: Option<usize>, window: Option<Duration>) -> Self {
    Self::with_scheduler(buffer_size, window, Arc::new(CurrentThreadScheduler))
  }

  pub fn with_scheduler(buffer_size: Option<usize>, window: Option<Duration>, scheduler: SchedulerRef) -> Self {
    ReplaySubject {
      inner: Arc::new(Inner {
        buffer_size,
        window,
        scheduler,
        state: Mutex::new(State {
          buffer: VecDeque::new(),
          observers: Subscribers::default(),
          stopped: Stopped::Running,
          disposed: false,
        }),
      }),
    }
  }

  pub fn try_next(&self, value: T) -> RxResult<()> {
    let observers = {
      let mut st = self.inner.state.lock();
      if st.disposed {
        return Err(RxError::Disposed);
      }
      if st.stopped.is_stopped() {
        return Ok(());
      }
      st.buffer.push_back((self.inner.scheduler.now(), value.clone()));
      self.inner.trim(&mut st);
      st.observers.snapshot()
    };
    broadcast_next(observers.clone(), value);
    for o in observers {
      o.ensure_active();
    }
    Ok(())
  }

  pub fn try_error(&self, err: RxError) -> RxResult<()> { self.terminate(Stopped::Errored(err)) }

  pub fn try_complete(&self) -> RxResult<()> { self.terminate(Stopped::Completed) }

  pub fn try_subscribe<O: Observer<T> + 'static>(&self, observer: O) -> RxResult<Subscription> {
    if self.is_disposed() {
      return Err(RxError::Disposed);
    }
    Ok(subscribe_detached(self, Box::new(observer), None))
  }

  pub fn next(&self, value: T) { report_refusal(self.try_next(value), "next") }

  pub fn error(&self, err: RxError) { report_refusal(self.try_error(err), "error") }

  pub fn complete(&self) { report_refusal(self.try_complete(), "complete") }

  fn terminate(&self, terminal: Stopped) -> RxResult<()> {
    let observers = {
      let mut st = self.inner.state.lock();
      if st.disposed {
        return Err(RxError::Disposed);
      }
      if st.stopped.is_stopped() {
        return Ok(());
      }
      st.stopped = terminal.clone();
      self.inner.trim(&mut st);
      st.observers.take_all()
    };
    for mut o in observers {
      terminal.replay(&mut o);
      o.ensure_active();
    }
    Ok(())
  }

  pub fn has_observers(&self) -> bool { !self.inner.state.lock().observers.is_empty() }

  pub fn dispose(&self) {
    let observers = {
      let mut st = self.inner.state.lock();
      st.disposed = true;
      st.buffer.clear();
      st.observers.take_all()
    };
    for o in observers {
      o.dispose();
    }
  }

  pub fn is_disposed(&self) -> bool { self.inner.state.lock().disposed }
}

impl<T: Value> Observable for ReplaySubject<T> {
  type Item = T;

  fn actual_subscribe(&self, observer: BoxObserver<T>, _: Option<SchedulerRef>) -> Subscription {
    let mut scheduled = ScheduledObserver::new(self.inner.scheduler.clone(), SharedObserver::from_box(observer));
    let id = {
      let mut st = self.inner.state.lock();
      if st.disposed {
        drop(st);
        report_refusal(Err(RxError::Disposed), "subscribe");
        return Subscription::empty();
      }
      self.inner.trim(&mut st);
      // Only enqueues; the drain starts after the lock is released.
      for (_, v) in st.buffer.iter() {
        scheduled.next(v.clone());
      }
      st.stopped.replay(&mut scheduled);
      if st.stopped.is_stopped() {
        None
      } else {
        Some(st.observers.add(scheduled.clone()))
      }
    };
    scheduled.ensure_active();
    let Some(id) = id else {
      return Subscription::empty();
    };
    let state = Arc::downgrade(&self.inner);
    Subscription::from_fn(move || {
      if let Some(inner) = state.upgrade() {
        let removed = inner.state.lock().observers.remove(id);
        if let Some(o) = removed {
          o.dispose();
        }
      }
    })
  }
}

impl<T: Value> Observer<T> for ReplaySubject<T> {
  fn next(&mut self, value: T) { ReplaySubject::next(self, value) }

  fn error(&mut self, err: RxError) { ReplaySubject::error(self, err) }

  fn complete(&mut self) { ReplaySubject::complete(self) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{observable::ObservableExt, observer::FnObserver, scheduler::TestScheduler, testing::*};

  fn subject_on(scheduler: &TestScheduler, size: Option<usize>, window: Option<u64>) -> ReplaySubject<i32> {
    ReplaySubject::with_scheduler(size, window.map(Duration::from_millis), Arc::new(scheduler.clone()))
  }

  #[rxrt_macro::test]
  fn replays_buffer_then_live_values() {
    let scheduler = TestScheduler::new();
    let subject = subject_on(&scheduler, Some(2), None);
    for (t, v) in [(100, 1), (200, 2), (250, 3), (280, 4), (340, 5)] {
      let s = subject.clone();
      scheduler.schedule_at(t, move |_| s.next(v));
    }
    let o = scheduler.create_observer();
    let (s, obs) = (subject.clone(), o.clone());
    scheduler.schedule_at(300, move |_| {
      s.subscribe_observer(obs);
    });
    scheduler.start();
    assert_eq!(o.messages(), vec![on_next(301, 3), on_next(302, 4), on_next(341, 5)]);
  }

  #[rxrt_macro::test]
  fn size_and_window_bound_the_replay() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(70, 1),
      on_next(110, 2),
      on_next(220, 3),
      on_next(270, 4),
      on_next(340, 5),
      on_next(410, 6),
      on_next(520, 7),
      on_next(630, 8),
    ]);
    let subject = subject_on(&scheduler, Some(3), Some(100));
    let (source, hub) = (xs.clone(), subject.clone());
    scheduler.schedule_at(50, move |_| {
      source.subscribe_observer(hub);
    });
    let o = scheduler.create_observer();
    let held = Arc::new(Mutex::new(None));
    let (s, obs, slot) = (subject.clone(), o.clone(), held.clone());
    scheduler.schedule_at(300, move |_| {
      *slot.lock() = Some(s.subscribe_observer(obs));
    });
    let slot = held.clone();
    scheduler.schedule_at(600, move |_| {
      if let Some(sub) = slot.lock().take() {
        sub.unsubscribe();
      }
    });
    scheduler.start();
    assert_eq!(
      o.messages(),
      vec![on_next(301, 3), on_next(302, 4), on_next(341, 5), on_next(411, 6), on_next(521, 7)]
    );
  }

  #[rxrt_macro::test]
  fn disposed_subject_fails_the_caller() {
    let subject = ReplaySubject::new(None, None);
    subject.next(1);
    subject.dispose();
    assert_eq!(subject.try_next(2), Err(RxError::Disposed));
    assert_eq!(subject.try_error(RxError::msg("boom")), Err(RxError::Disposed));
    let seen = Arc::new(Mutex::new(vec![]));
    let log = seen.clone();
    assert!(subject.try_subscribe(FnObserver::new(move |v: i32| log.lock().push(v), |_| {}, || {})).is_err());
    assert!(seen.lock().is_empty());
  }

  #[rxrt_macro::test]
  fn window_drops_old_values() {
    let scheduler = TestScheduler::new();
    let subject = subject_on(&scheduler, None, Some(100));
    for (t, v) in [(100, 1), (250, 2), (280, 3)] {
      let s = subject.clone();
      scheduler.schedule_at(t, move |_| s.next(v));
    }
    let o = scheduler.create_observer();
    let (s, obs) = (subject.clone(), o.clone());
    scheduler.schedule_at(300, move |_| {
      s.subscribe_observer(obs);
    });
    scheduler.start();
    assert_eq!(o.messages(), vec![on_next(301, 2), on_next(302, 3)]);
  }

  #[rxrt_macro::test]
  fn terminal_is_replayed_after_buffer() {
    let scheduler = TestScheduler::new();
    let subject = ReplaySubject::new(None, None);
    subject.next(1);
    subject.next(2);
    subject.error(RxError::msg("boom"));
    let o = scheduler.create_observer();
    subject.clone().subscribe_observer(o.clone());
    assert_eq!(o.messages(), vec![on_next(0, 1), on_next(0, 2), on_error(0, "boom")]);
    assert!(!subject.has_observers());
  }

  #[rxrt_macro::test]
  fn unsubscribe_stops_delivery() {
    let subject = ReplaySubject::new(None, None);
    let seen = Arc::new(Mutex::new(vec![]));
    let log = seen.clone();
    let sub = subject.clone().subscribe(move |v| log.lock().push(v));
    subject.next(1);
    sub.unsubscribe();
    subject.next(2);
    assert_eq!(*seen.lock(), vec![1]);
    assert!(!subject.has_observers());
  }
}
