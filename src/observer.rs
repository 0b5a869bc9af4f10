//! Observer trait and implementations
//!
//! An observer receives the grammar `next* (error | complete)?`. The wrappers
//! in this module enforce that grammar and make observers shareable between
//! the callbacks of an operator.

use crate::{error::RxError, notification::Notification};
use parking_lot::ReentrantMutex;
use std::{cell::RefCell, collections::VecDeque, sync::Arc};

mod auto_detach;
mod checked;
mod scheduled;

pub use auto_detach::AutoDetachObserver;
pub use checked::CheckedObserver;
pub use scheduled::ScheduledObserver;

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
pub trait Observer<Item>: Send {
  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error; nothing is delivered afterwards.
  fn error(&mut self, err: RxError);

  /// Handle completion; nothing is delivered afterwards.
  fn complete(&mut self);

  /// Sources check this to stop emitting early, e.g. after `take` has
  /// completed downstream.
  fn is_finished(&self) -> bool { false }
}

pub type BoxObserver<Item> = Box<dyn Observer<Item>>;

impl<Item, O> Observer<Item> for Box<O>
where
  O: Observer<Item> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: RxError) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }

  #[inline]
  fn is_finished(&self) -> bool { (**self).is_finished() }
}

// ============================================================================
// Closure observer
// ============================================================================

/// Observer built from three closures.
pub struct FnObserver<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<N, E, C> FnObserver<N, E, C> {
  pub fn new<Item>(next: N, error: E, complete: C) -> Self
  where
    N: FnMut(Item),
    E: FnMut(RxError),
    C: FnMut(),
  {
    FnObserver { next, error, complete }
  }
}

impl<Item, N, E, C> Observer<Item> for FnObserver<N, E, C>
where
  N: FnMut(Item) + Send,
  E: FnMut(RxError) + Send,
  C: FnMut() + Send,
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  #[inline]
  fn error(&mut self, err: RxError) { (self.error)(err) }

  #[inline]
  fn complete(&mut self) { (self.complete)() }
}

// ============================================================================
// Shared observer
// ============================================================================

struct Slot<Item> {
  observer: Option<BoxObserver<Item>>,
  pending: VecDeque<Notification<Item>>,
  busy: bool,
  closed: bool,
}

/// A clonable handle to one downstream observer.
///
/// Calls from different threads are serialised. A notification sent from
/// inside the observer's own callback is queued and delivered right after
/// the callback returns, so the observer never sees overlapping calls. After
/// a terminal notification the handle drops the observer and ignores
/// everything else.
pub struct SharedObserver<Item>(Arc<ReentrantMutex<RefCell<Slot<Item>>>>);

impl<Item> Clone for SharedObserver<Item> {
  fn clone(&self) -> Self { SharedObserver(self.0.clone()) }
}

impl<Item: 'static> SharedObserver<Item> {
  pub fn new<O: Observer<Item> + 'static>(observer: O) -> Self {
    Self::from_box(Box::new(observer))
  }

  pub fn from_box(observer: BoxObserver<Item>) -> Self {
    SharedObserver(Arc::new(ReentrantMutex::new(RefCell::new(Slot {
      observer: Some(observer),
      pending: VecDeque::new(),
      busy: false,
      closed: false,
    }))))
  }

  /// Detach the observer; later notifications are ignored.
  pub fn close(&self) {
    let guard = self.0.lock();
    let (observer, pending) = {
      let mut slot = guard.borrow_mut();
      slot.closed = true;
      (slot.observer.take(), std::mem::take(&mut slot.pending))
    };
    drop((observer, pending));
  }

  pub fn is_closed(&self) -> bool {
    let guard = self.0.lock();
    let closed = guard.try_borrow().map(|s| s.closed).unwrap_or(false);
    closed
  }

  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }

  fn deliver(&self, n: Notification<Item>) {
    let guard = self.0.lock();
    {
      let mut slot = guard.borrow_mut();
      if slot.closed {
        return;
      }
      if slot.busy {
        slot.pending.push_back(n);
        return;
      }
      slot.busy = true;
    }
    let _busy = BusyReset(&guard);
    let mut current = Some(n);
    while let Some(n) = current {
      let taken = guard.borrow_mut().observer.take();
      if let Some(mut observer) = taken {
        let terminal = n.is_terminal();
        n.accept(&mut observer);
        let (keep, dropped) = {
          let mut slot = guard.borrow_mut();
          if terminal {
            slot.closed = true;
            (false, std::mem::take(&mut slot.pending))
          } else {
            (!slot.closed, VecDeque::new())
          }
        };
        if keep {
          guard.borrow_mut().observer = Some(observer);
        } else {
          drop((observer, dropped));
        }
      }
      current = guard.borrow_mut().pending.pop_front();
    }
  }
}

struct BusyReset<'a, Item>(&'a RefCell<Slot<Item>>);

impl<Item> Drop for BusyReset<'_, Item> {
  fn drop(&mut self) {
    if let Ok(mut slot) = self.0.try_borrow_mut() {
      slot.busy = false;
    }
  }
}

impl<Item: Send + 'static> Observer<Item> for SharedObserver<Item> {
  fn next(&mut self, value: Item) { self.deliver(Notification::Next(value)) }

  fn error(&mut self, err: RxError) { self.deliver(Notification::Error(err)) }

  fn complete(&mut self) { self.deliver(Notification::Completed) }

  fn is_finished(&self) -> bool {
    let guard = self.0.lock();
    let finished = guard
      .try_borrow()
      .map(|s| s.closed || s.observer.as_ref().is_some_and(|o| o.is_finished()))
      .unwrap_or(false);
    finished
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use parking_lot::Mutex;

  #[derive(Clone, Default)]
  struct Log(Arc<Mutex<Vec<Notification<i32>>>>);

  impl Observer<i32> for Log {
    fn next(&mut self, v: i32) { self.0.lock().push(Notification::Next(v)) }
    fn error(&mut self, e: RxError) { self.0.lock().push(Notification::Error(e)) }
    fn complete(&mut self) { self.0.lock().push(Notification::Completed) }
  }

  #[rxrt_macro::test]
  fn ignores_everything_after_terminal() {
    let log = Log::default();
    let mut shared = SharedObserver::new(log.clone());
    shared.next(1);
    shared.complete();
    shared.next(2);
    shared.error(RxError::Timeout);
    assert!(shared.is_finished());
    assert_eq!(*log.0.lock(), vec![Notification::Next(1), Notification::Completed]);
  }

  #[rxrt_macro::test]
  fn reentrant_notifications_are_queued_in_order() {
    let log = Log::default();
    let slot: Arc<Mutex<Option<SharedObserver<i32>>>> = Arc::default();
    let (l, s) = (log.clone(), slot.clone());
    let observer = FnObserver::new(
      move |v: i32| {
        l.0.lock().push(Notification::Next(v));
        if v < 3 {
          let me = s.lock().clone();
          if let Some(mut me) = me {
            me.next(v + 1);
            me.next(v + 10);
          }
        }
      },
      |_| {},
      || {},
    );
    let mut shared = SharedObserver::new(observer);
    *slot.lock() = Some(shared.clone());
    shared.next(1);
    let got: Vec<_> = log.0.lock().iter().filter_map(|n| n.value().copied()).collect();
    assert_eq!(got, vec![1, 2, 11, 3, 12]);
  }

  #[rxrt_macro::test]
  fn close_detaches() {
    let log = Log::default();
    let mut shared = SharedObserver::new(log.clone());
    shared.close();
    shared.next(1);
    assert!(shared.is_closed());
    assert!(log.0.lock().is_empty());
  }
}
