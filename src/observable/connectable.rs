//! Multicasting through a subject.
//!
//! A [`ConnectableObservable`] subscribes its observers to a subject and only
//! subscribes the subject to the source when [`connect`] is called, so every
//! observer shares one run of the source.
//!
//! ```rust
//! use rxrt::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(vec![]));
//! let published = of([1, 2]).publish();
//! let (a, b) = (seen.clone(), seen.clone());
//! published.clone().subscribe(move |v| a.lock().unwrap().push(("a", v)));
//! published.clone().subscribe(move |v| b.lock().unwrap().push(("b", v)));
//! published.connect();
//! assert_eq!(*seen.lock().unwrap(), vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]);
//! ```
//!
//! [`connect`]: ConnectableObservable::connect

use super::{subscribe_detached, Observable};
use crate::{
  observer::BoxObserver,
  scheduler::SchedulerRef,
  subject::SubjectLike,
  subscription::{Disposable, SingleAssignmentDisposable, Subscription},
};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct Connection {
  current: Option<(u64, Subscription)>,
  next_id: u64,
}

struct Inner<S, Subj> {
  source: S,
  subject: Subj,
  connection: Mutex<Connection>,
}

/// A source shared through a subject once connected.
pub struct ConnectableObservable<S, Subj> {
  inner: Arc<Inner<S, Subj>>,
}

impl<S, Subj> Clone for ConnectableObservable<S, Subj> {
  fn clone(&self) -> Self { ConnectableObservable { inner: self.inner.clone() } }
}

impl<S, Subj> ConnectableObservable<S, Subj>
where
  S: Observable,
  Subj: SubjectLike<S::Item>,
{
  pub fn new(source: S, subject: Subj) -> Self {
    ConnectableObservable {
      inner: Arc::new(Inner { source, subject, connection: Mutex::new(Connection::default()) }),
    }
  }

  /// Subscribe the subject to the source. While connected, further calls
  /// return the existing connection; disposing it disconnects.
  pub fn connect(&self) -> Subscription { self.connect_with(None) }

  /// Like [`connect`](Self::connect), handing `scheduler` to the source.
  pub fn connect_with(&self, scheduler: Option<SchedulerRef>) -> Subscription {
    let (id, slot) = {
      let mut conn = self.inner.connection.lock();
      if let Some((_, current)) = &conn.current {
        return current.clone();
      }
      let id = conn.next_id;
      conn.next_id += 1;
      let slot = SingleAssignmentDisposable::new();
      let weak = Arc::downgrade(&self.inner);
      let release = slot.clone();
      let handle = Subscription::from_fn(move || {
        release.dispose();
        if let Some(inner) = weak.upgrade() {
          let mut conn = inner.connection.lock();
          // A newer connection may have replaced this one.
          if conn.current.as_ref().is_some_and(|(cur, _)| *cur == id) {
            conn.current = None;
          }
        }
      });
      conn.current = Some((id, handle));
      (id, slot)
    };
    tracing::debug!(connection = id, "connectable connected");
    // Subscribing outside the lock lets a synchronous source reenter.
    let upstream =
      subscribe_detached(&self.inner.source, Box::new(self.inner.subject.clone()), scheduler);
    let _ = slot.set(upstream);
    self.current_connection()
  }

  fn current_connection(&self) -> Subscription {
    self.inner.connection.lock().current.as_ref().map(|(_, s)| s.clone()).unwrap_or_default()
  }

  pub fn is_connected(&self) -> bool { self.inner.connection.lock().current.is_some() }

  /// Connect when the first observer subscribes, disconnect when the last
  /// one unsubscribes.
  pub fn ref_count(self) -> RefCountOp<S, Subj> {
    RefCountOp { source: self, state: Arc::new(Mutex::new(RefState::default())) }
  }

  /// Connect once `subscribers` observers have subscribed; `0` connects
  /// right away.
  pub fn auto_connect(self, subscribers: usize) -> AutoConnectOp<S, Subj> {
    let mut state = AutoState::default();
    if subscribers == 0 {
      state.connection = Some(self.connect());
      state.is_connected = true;
    }
    AutoConnectOp { source: self, subscribers, state: Arc::new(Mutex::new(state)) }
  }
}

impl<S, Subj> Observable for ConnectableObservable<S, Subj>
where
  S: Observable,
  Subj: SubjectLike<S::Item>,
{
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    self.inner.subject.actual_subscribe(observer, scheduler)
  }
}

// ==================== RefCount ====================

#[derive(Default)]
struct RefState {
  count: usize,
  connection: Option<Subscription>,
}

/// Returned by [`ConnectableObservable::ref_count`].
pub struct RefCountOp<S, Subj> {
  source: ConnectableObservable<S, Subj>,
  state: Arc<Mutex<RefState>>,
}

impl<S, Subj> Clone for RefCountOp<S, Subj> {
  fn clone(&self) -> Self { RefCountOp { source: self.source.clone(), state: self.state.clone() } }
}

impl<S, Subj> Observable for RefCountOp<S, Subj>
where
  S: Observable,
  Subj: SubjectLike<S::Item>,
{
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let should_connect = {
      let mut st = self.state.lock();
      st.count += 1;
      st.count == 1
    };
    let subscription = self.source.actual_subscribe(observer, scheduler.clone());
    if should_connect {
      let connection = self.source.connect_with(scheduler);
      let mut st = self.state.lock();
      if st.count == 0 {
        drop(st);
        connection.dispose();
      } else {
        st.connection = Some(connection);
      }
    }
    let state = self.state.clone();
    Subscription::from_fn(move || {
      subscription.dispose();
      let last = {
        let mut st = state.lock();
        st.count = st.count.saturating_sub(1);
        if st.count == 0 { st.connection.take() } else { None }
      };
      if let Some(connection) = last {
        tracing::debug!("last ref_count subscriber left, disconnecting");
        connection.dispose();
      }
    })
  }
}

// ==================== AutoConnect ====================

#[derive(Default)]
struct AutoState {
  count: usize,
  is_connected: bool,
  connection: Option<Subscription>,
}

/// Returned by [`ConnectableObservable::auto_connect`].
pub struct AutoConnectOp<S, Subj> {
  source: ConnectableObservable<S, Subj>,
  subscribers: usize,
  state: Arc<Mutex<AutoState>>,
}

impl<S, Subj> Clone for AutoConnectOp<S, Subj> {
  fn clone(&self) -> Self {
    AutoConnectOp { source: self.source.clone(), subscribers: self.subscribers, state: self.state.clone() }
  }
}

impl<S, Subj> Observable for AutoConnectOp<S, Subj>
where
  S: Observable,
  Subj: SubjectLike<S::Item>,
{
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let should_connect = {
      let mut st = self.state.lock();
      st.count += 1;
      let connect = st.count == self.subscribers && !st.is_connected;
      if connect {
        st.is_connected = true;
      }
      connect
    };
    let subscription = self.source.actual_subscribe(observer, scheduler.clone());
    if should_connect {
      let connection = self.source.connect_with(scheduler);
      self.state.lock().connection = Some(connection);
    }
    let state = self.state.clone();
    Subscription::from_fn(move || {
      subscription.dispose();
      let mut st = state.lock();
      st.count = st.count.saturating_sub(1);
      st.is_connected = false;
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    observable::{of, ObservableExt},
    scheduler::TestScheduler,
    subject::Subject,
    testing::*,
  };

  fn hot_source(scheduler: &TestScheduler) -> crate::testing::HotObservable<i32> {
    scheduler.create_hot_observable(vec![
      on_next(210, 1),
      on_next(220, 2),
      on_next(230, 3),
      on_next(240, 4),
      on_completed(250),
    ])
  }

  #[rxrt_macro::test]
  fn nothing_flows_before_connect() {
    let scheduler = TestScheduler::new();
    let xs = hot_source(&scheduler);
    let published = xs.clone().publish();
    let connect = published.clone();
    scheduler.schedule_at(225, move |_| {
      connect.connect();
    });
    let results = scheduler.start_with_create(move || published);
    assert_eq!(results.messages(), vec![on_next(230, 3), on_next(240, 4), on_completed(250)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(225, 250)]);
  }

  #[rxrt_macro::test]
  fn disconnect_and_reconnect() {
    let scheduler = TestScheduler::new();
    let xs = hot_source(&scheduler);
    let published = xs.clone().multicast(Subject::new());
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::default();

    let (p, s) = (published.clone(), slot.clone());
    scheduler.schedule_at(205, move |_| *s.lock() = Some(p.connect()));
    let s = slot.clone();
    scheduler.schedule_at(215, move |_| {
      if let Some(c) = s.lock().take() {
        c.dispose();
      }
    });
    let p = published.clone();
    scheduler.schedule_at(235, move |_| {
      p.connect();
    });
    let results = scheduler.start_with_create(move || published);
    assert_eq!(results.messages(), vec![on_next(210, 1), on_next(240, 4), on_completed(250)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(205, 215), subscribe(235, 250)]);
  }

  #[rxrt_macro::test]
  fn connect_is_idempotent_while_connected() {
    let published = crate::observable::never::<i32>().publish();
    let first = published.connect();
    let second = published.connect();
    assert_eq!(first, second);
    assert!(published.is_connected());
    first.dispose();
    assert!(!published.is_connected());
  }

  #[rxrt_macro::test]
  fn ref_count_connects_once_and_disconnects_last() {
    let scheduler = TestScheduler::new();
    let xs = hot_source(&scheduler);
    let shared = xs.clone().share();
    let (a, b) = (scheduler.create_observer(), scheduler.create_observer());
    let subs: Arc<Mutex<Vec<Subscription>>> = Arc::default();

    for (t, o) in [(200, a.clone()), (215, b.clone())] {
      let (src, s) = (shared.clone(), subs.clone());
      scheduler.schedule_at(t, move |_| {
        let sub = src.subscribe_observer(o);
        s.lock().push(sub);
      });
    }
    for (t, i) in [(225, 0), (235, 1)] {
      let s = subs.clone();
      scheduler.schedule_at(t, move |_| s.lock()[i].dispose());
    }
    scheduler.start();

    assert_eq!(a.messages(), vec![on_next(210, 1), on_next(220, 2)]);
    assert_eq!(b.messages(), vec![on_next(220, 2), on_next(230, 3)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 235)]);
  }

  #[rxrt_macro::test]
  fn auto_connect_waits_for_subscribers() {
    let seen = Arc::new(Mutex::new(vec![]));
    let auto = of([1, 2, 3]).publish().auto_connect(2);
    let l = seen.clone();
    auto.clone().subscribe(move |v| l.lock().push(("a", v)));
    assert!(seen.lock().is_empty());
    let l = seen.clone();
    auto.subscribe(move |v| l.lock().push(("b", v)));
    assert_eq!(*seen.lock(), vec![("a", 1), ("b", 1), ("a", 2), ("b", 2), ("a", 3), ("b", 3)]);
  }
}
