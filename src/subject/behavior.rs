use super::{
  removal, report_refusal,
  subscribers::{broadcast_next, Subscribers},
  Stopped,
};
use crate::{
  error::{RxError, RxResult},
  observable::{subscribe_detached, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  scheduler::SchedulerRef,
  subscription::Subscription,
  Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

struct State<T> {
  value: T,
  /// Bumped on every `next`, so a subscriber can tell whether the value it
  /// was handed is still current.
  version: u64,
  observers: Subscribers<SharedObserver<T>>,
  stopped: Stopped,
  disposed: bool,
}

/// A subject holding a current value; every new subscriber receives it
/// first.
pub struct BehaviorSubject<T> {
  state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for BehaviorSubject<T> {
  fn clone(&self) -> Self { BehaviorSubject { state: self.state.clone() } }
}

impl<T: Value> BehaviorSubject<T> {
  pub fn new(initial: T) -> Self {
    BehaviorSubject {
      state: Arc::new(Mutex::new(State {
        value: initial,
        version: 0,
        observers: Subscribers::default(),
        stopped: Stopped::Running,
        disposed: false,
      })),
    }
  }

  /// The current value; fails once the subject errored or was disposed.
  pub fn value(&self) -> RxResult<T> {
    let st = self.state.lock();
    if st.disposed {
      return Err(RxError::Disposed);
    }
    match &st.stopped {
      Stopped::Errored(e) => Err(e.clone()),
      _ => Ok(st.value.clone()),
    }
  }

  pub fn try_next(&self, value: T) -> RxResult<()> {
    let observers = {
      let mut st = self.state.lock();
      if st.disposed {
        return Err(RxError::Disposed);
      }
      if st.stopped.is_stopped() {
        return Ok(());
      }
      st.value = value.clone();
      st.version += 1;
      st.observers.snapshot()
    };
    broadcast_next(observers, value);
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

impl<T: Value> Observable for BehaviorSubject<T> {
  type Item = T;

  fn actual_subscribe(&self, observer: BoxObserver<T>, _: Option<SchedulerRef>) -> Subscription {
    let mut shared = SharedObserver::from_box(observer);
    let mut seen = None;
    loop {
      let (value, version) = {
        let mut st = self.state.lock();
        if st.disposed {
          drop(st);
          report_refusal(Err(RxError::Disposed), "subscribe");
          return Subscription::empty();
        }
        if st.stopped.is_stopped() {
          let stopped = st.stopped.clone();
          drop(st);
          stopped.replay(&mut shared);
          return Subscription::empty();
        }
        if seen == Some(st.version) {
          let id = st.observers.add(shared.clone());
          drop(st);
          return removal(Arc::downgrade(&self.state), move |st: &mut State<T>| st.observers.remove(id));
        }
        (st.value.clone(), st.version)
      };
      // Deliver outside the lock, then register only if no newer value
      // slipped in meanwhile.
      shared.next(value);
      seen = Some(version);
    }
  }
}

impl<T: Value> Observer<T> for BehaviorSubject<T> {
  fn next(&mut self, value: T) { BehaviorSubject::next(self, value) }

  fn error(&mut self, err: RxError) { BehaviorSubject::error(self, err) }

  fn complete(&mut self) { BehaviorSubject::complete(self) }
}
