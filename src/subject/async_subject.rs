use super::{removal, report_refusal, subscribers::Subscribers, Stopped};
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
  last: Option<T>,
  observers: Subscribers<SharedObserver<T>>,
  stopped: Stopped,
  disposed: bool,
}

/// A subject that emits only its last value, and only once it completes.
pub struct AsyncSubject<T> {
  state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for AsyncSubject<T> {
  fn clone(&self) -> Self { AsyncSubject { state: self.state.clone() } }
}

impl<T: Value> Default for AsyncSubject<T> {
  fn default() -> Self { Self::new() }
}

fn finish<T, O: Observer<T>>(observer: &mut O, last: Option<T>, stopped: &Stopped) {
  if let (Stopped::Completed, Some(v)) = (stopped, last) {
    observer.next(v);
  }
  stopped.replay(observer);
}

impl<T: Value> AsyncSubject<T> {
  pub fn new() -> Self {
    AsyncSubject {
      state: Arc::new(Mutex::new(State {
        last: None,
        observers: Subscribers::default(),
        stopped: Stopped::Running,
        disposed: false,
      })),
    }
  }

  pub fn try_next(&self, value: T) -> RxResult<()> {
    let mut st = self.state.lock();
    if st.disposed {
      return Err(RxError::Disposed);
    }
    if !st.stopped.is_stopped() {
      st.last = Some(value);
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
    let (observers, last) = {
      let mut st = self.state.lock();
      if st.disposed {
        return Err(RxError::Disposed);
      }
      if st.stopped.is_stopped() {
        return Ok(());
      }
      st.stopped = terminal.clone();
      (st.observers.take_all(), st.last.clone())
    };
    for mut o in observers {
      finish(&mut o, last.clone(), &terminal);
    }
    Ok(())
  }

  pub fn has_observers(&self) -> bool { !self.state.lock().observers.is_empty() }

  pub fn dispose(&self) {
    let observers = {
      let mut st = self.state.lock();
      st.disposed = true;
      st.last = None;
      st.observers.take_all()
    };
    drop(observers);
  }

  pub fn is_disposed(&self) -> bool { self.state.lock().disposed }
}

impl<T: Value> Observable for AsyncSubject<T> {
  type Item = T;

  fn actual_subscribe(&self, mut observer: BoxObserver<T>, _: Option<SchedulerRef>) -> Subscription {
    let mut st = self.state.lock();
    if st.disposed {
      drop(st);
      report_refusal(Err(RxError::Disposed), "subscribe");
      return Subscription::empty();
    }
    if st.stopped.is_stopped() {
      let (last, stopped) = (st.last.clone(), st.stopped.clone());
      drop(st);
      finish(&mut observer, last, &stopped);
      return Subscription::empty();
    }
    let id = st.observers.add(SharedObserver::from_box(observer));
    drop(st);
    removal(Arc::downgrade(&self.state), move |st: &mut State<T>| st.observers.remove(id))
  }
}

impl<T: Value> Observer<T> for AsyncSubject<T> {
  fn next(&mut self, value: T) { AsyncSubject::next(self, value) }

  fn error(&mut self, err: RxError) { AsyncSubject::error(self, err) }

  fn complete(&mut self) { AsyncSubject::complete(self) }
}
