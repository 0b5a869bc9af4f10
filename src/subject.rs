//! Subjects: observers and observables at once.
//!
//! | Subject | A new subscriber receives |
//! |---------|---------------------------|
//! | [`Subject`] | values emitted after it subscribed |
//! | [`BehaviorSubject`] | the current value, then later values |
//! | [`ReplaySubject`] | the buffered values, then later values |
//! | [`AsyncSubject`] | only the last value, on completion |
//!
//! After `error` or `complete` a subject drops its observers; a later
//! subscriber gets the terminal notification right away.
//!
//! A disposed subject refuses input and subscriptions. The `try_*` methods
//! return [`RxError::Disposed`] to the caller; the infallible forms and the
//! [`Observer`] implementation log the refusal at `error` level. The refusal
//! never reaches an observer.

use crate::{
  error::{RxError, RxResult},
  observable::{subscribe_detached, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  scheduler::SchedulerRef,
  subscription::Subscription,
  Value,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

mod async_subject;
mod behavior;
mod replay;
mod subscribers;

pub use async_subject::AsyncSubject;
pub use behavior::BehaviorSubject;
pub use replay::ReplaySubject;
use subscribers::{broadcast_next, Subscribers};

/// Anything usable as the hub of a multicast.
pub trait SubjectLike<T>: Observer<T> + Observable<Item = T> + Clone {}

impl<T, S> SubjectLike<T> for S where S: Observer<T> + Observable<Item = T> + Clone {}

/// Log input or a subscription refused by a disposed subject.
pub(crate) fn report_refusal(result: RxResult<()>, action: &'static str) {
  if let Err(err) = result {
    tracing::error!(error = %err, action, "disposed subject used");
  }
}

/// Terminal state shared by the subjects.
#[derive(Clone, Default)]
pub(crate) enum Stopped {
  #[default]
  Running,
  Completed,
  Errored(RxError),
}

impl Stopped {
  pub(crate) fn is_stopped(&self) -> bool { !matches!(self, Stopped::Running) }

  /// Replay the terminal notification to `observer`.
  pub(crate) fn replay<T, O: Observer<T> + ?Sized>(&self, observer: &mut O) {
    match self {
      Stopped::Running => {}
      Stopped::Completed => observer.complete(),
      Stopped::Errored(e) => observer.error(e.clone()),
    }
  }
}

struct State<T> {
  observers: Subscribers<SharedObserver<T>>,
  stopped: Stopped,
  disposed: bool,
}

/// Forwards every notification to the observers subscribed at that moment.
pub struct Subject<T> {
  state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Subject<T> {
  fn clone(&self) -> Self { Subject { state: self.state.clone() } }
}

impl<T: Value> Default for Subject<T> {
  fn default() -> Self { Self::new() }
}

impl<T: Value> Subject<T> {
  pub fn new() -> Self {
    Subject {
      state: Arc::new(Mutex::new(State {
        observers: Subscribers::default(),
        stopped: Stopped::Running,
        disposed: false,
      })),
    }
  }

  pub fn try_next(&self, value: T) -> RxResult<()> {
    let observers = {
      let st = self.state.lock();
      if st.disposed {
        return Err(RxError::Disposed);
      }
      if st.stopped.is_stopped() {
        return Ok(());
      }
      st.observers.snapshot()
    };
    broadcast_next(observers, value);
    Ok(())
  }

  pub fn try_error(&self, err: RxError) -> RxResult<()> { self.terminate(Stopped::Errored(err)) }

  pub fn try_complete(&self) -> RxResult<()> { self.terminate(Stopped::Completed) }

  /// Subscribe `observer`, or fail with [`RxError::Disposed`] without
  /// touching it.
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
      let mut st = self.state.lock();
      if st.disposed {
        return Err(RxError::Disposed);
      }
      if st.stopped.is_stopped() {
        return Ok(());
      }
      st.stopped = terminal.clone();
      st.observers.take_all()
    };
    for mut o in observers {
      terminal.replay(&mut o);
    }
    Ok(())
  }

  pub fn has_observers(&self) -> bool { !self.state.lock().observers.is_empty() }

  /// Release every observer and refuse further use.
  pub fn dispose(&self) {
    let observers = {
      let mut st = self.state.lock();
      st.disposed = true;
      st.observers.take_all()
    };
    drop(observers);
  }

  pub fn is_disposed(&self) -> bool { self.state.lock().disposed }
}

/// Subscription handle that takes one observer out of the subject behind
/// `state`.
pub(crate) fn removal<S, O, F>(state: Weak<Mutex<S>>, observers: F) -> Subscription
where
  S: Send + 'static,
  O: Send + 'static,
  F: FnOnce(&mut S) -> Option<O> + Send + 'static,
{
  Subscription::from_fn(move || {
    if let Some(state) = state.upgrade() {
      let removed = observers(&mut state.lock());
      drop(removed);
    }
  })
}

impl<T: Value> Observable for Subject<T> {
  type Item = T;

  fn actual_subscribe(&self, mut observer: BoxObserver<T>, _: Option<SchedulerRef>) -> Subscription {
    let mut st = self.state.lock();
    if st.disposed {
      drop(st);
      report_refusal(Err(RxError::Disposed), "subscribe");
      return Subscription::empty();
    }
    if st.stopped.is_stopped() {
      let stopped = st.stopped.clone();
      drop(st);
      stopped.replay(&mut observer);
      return Subscription::empty();
    }
    let id = st.observers.add(SharedObserver::from_box(observer));
    drop(st);
    removal(Arc::downgrade(&self.state), move |st: &mut State<T>| st.observers.remove(id))
  }
}

impl<T: Value> Observer<T> for Subject<T> {
  fn next(&mut self, value: T) { Subject::next(self, value) }

  fn error(&mut self, err: RxError) { Subject::error(self, err) }

  fn complete(&mut self) { Subject::complete(self) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    observable::ObservableExt,
    scheduler::TestScheduler,
    testing::*,
  };

  #[rxrt_macro::test]
  fn multicasts_to_current_subscribers() {
    let scheduler = TestScheduler::new();
    let subject = Subject::<i32>::new();
    let (a, b) = (scheduler.create_observer(), scheduler.create_observer());

    let s = subject.clone();
    scheduler.schedule_at(100, move |_| s.next(1));
    let (s, o) = (subject.clone(), a.clone());
    scheduler.schedule_at(150, move |_| {
      s.subscribe_observer(o);
    });
    let s = subject.clone();
    scheduler.schedule_at(200, move |_| s.next(2));
    let (s, o) = (subject.clone(), b.clone());
    scheduler.schedule_at(250, move |_| {
      s.subscribe_observer(o);
    });
    let s = subject.clone();
    scheduler.schedule_at(300, move |_| s.next(3));
    let s = subject.clone();
    scheduler.schedule_at(400, move |_| s.complete());
    scheduler.start();

    assert_eq!(a.messages(), vec![on_next(200, 2), on_next(300, 3), on_completed(400)]);
    assert_eq!(b.messages(), vec![on_next(300, 3), on_completed(400)]);
    assert!(!subject.has_observers());
  }

  #[rxrt_macro::test]
  fn late_subscriber_gets_the_terminal() {
    let scheduler = TestScheduler::new();
    let subject = Subject::<i32>::new();
    subject.error(RxError::msg("boom"));
    subject.next(1);
    let o = scheduler.create_observer();
    subject.clone().subscribe_observer(o.clone());
    assert_eq!(o.messages(), vec![on_error(0, "boom")]);
  }

  #[rxrt_macro::test]
  fn unsubscribe_removes_the_observer() {
    let subject = Subject::<i32>::new();
    let sub = subject.clone().subscribe(|_| {});
    assert!(subject.has_observers());
    sub.unsubscribe();
    assert!(!subject.has_observers());
  }

  #[rxrt_macro::test]
  fn disposed_subject_fails_the_caller() {
    let scheduler = TestScheduler::new();
    let subject = Subject::<i32>::new();
    let before = scheduler.create_observer();
    subject.clone().subscribe_observer(before.clone());
    subject.dispose();
    assert!(subject.is_disposed());
    assert_eq!(subject.try_next(1), Err(RxError::Disposed));
    assert_eq!(subject.try_error(RxError::msg("boom")), Err(RxError::Disposed));
    assert_eq!(subject.try_complete(), Err(RxError::Disposed));

    let after = scheduler.create_observer();
    assert_eq!(subject.try_subscribe(after.clone()).err(), Some(RxError::Disposed));
    subject.clone().subscribe_observer(after.clone());
    subject.next(2);
    assert!(before.messages().is_empty());
    assert!(after.messages().is_empty());
  }

  #[rxrt_macro::test]
  fn try_methods_succeed_while_live() {
    let scheduler = TestScheduler::new();
    let subject = Subject::<i32>::new();
    let o = scheduler.create_observer();
    assert!(subject.try_subscribe(o.clone()).is_ok());
    assert_eq!(subject.try_next(1), Ok(()));
    assert_eq!(subject.try_complete(), Ok(()));
    assert_eq!(subject.try_next(2), Ok(()));
    assert_eq!(o.messages(), vec![on_next(0, 1), on_completed(0)]);
  }

  #[rxrt_macro::test]
  fn reentrant_next_from_a_subscriber() {
    let subject = Subject::<i32>::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let (s, log) = (subject.clone(), seen.clone());
    subject.clone().subscribe(move |v| {
      log.lock().push(v);
      if v < 3 {
        s.next(v + 1);
      }
    });
    subject.next(1);
    assert_eq!(*seen.lock(), vec![1, 2, 3]);
  }
}
