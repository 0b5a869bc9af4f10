//! Pairwise comparison of two sequences.
//!
//! Values are matched by position. Whichever side runs ahead is queued until
//! the other side catches up; the first mismatch, or a side that completes
//! while the other still has values, decides `false` at once.

use crate::{
  error::RxError,
  observable::{subscribe_detached, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

pub type Comparer<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Emit `true` once both sequences completed with equal values, `false` on
/// the first difference.
pub struct SequenceEqualOp<S: Observable, O> {
  pub(crate) source: S,
  pub(crate) other: O,
  pub(crate) comparer: Comparer<S::Item>,
}

impl<S: Observable + Clone, O: Clone> Clone for SequenceEqualOp<S, O> {
  fn clone(&self) -> Self {
    SequenceEqualOp { source: self.source.clone(), other: self.other.clone(), comparer: self.comparer.clone() }
  }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
  Left,
  Right,
}

struct Sides<T> {
  queue: [VecDeque<T>; 2],
  done: [bool; 2],
}

struct Comparison<T> {
  sides: Mutex<Sides<T>>,
  comparer: Comparer<T>,
  observer: SharedObserver<bool>,
}

impl<T: Value> Comparison<T> {
  fn decide(&self, equal: bool) {
    let mut observer = self.observer.clone();
    observer.next(equal);
    observer.complete();
  }

  fn on_next(&self, side: Side, value: T) {
    let (me, other) = if side == Side::Left { (0, 1) } else { (1, 0) };
    let pending = {
      let mut sides = self.sides.lock();
      match sides.queue[other].pop_front() {
        Some(queued) => Some(queued),
        None if sides.done[other] => None,
        None => {
          sides.queue[me].push_back(value);
          return;
        }
      }
    };
    let Some(queued) = pending else {
      return self.decide(false);
    };
    let (left, right) = if side == Side::Left { (&value, &queued) } else { (&queued, &value) };
    match guarded(|| (self.comparer)(left, right)) {
      Ok(true) => {}
      Ok(false) => self.decide(false),
      Err(e) => self.observer.clone().error(e),
    }
  }

  fn on_complete(&self, side: Side) {
    let (me, other) = if side == Side::Left { (0, 1) } else { (1, 0) };
    let verdict = {
      let mut sides = self.sides.lock();
      sides.done[me] = true;
      if !sides.queue[me].is_empty() {
        None
      } else if !sides.queue[other].is_empty() {
        Some(false)
      } else if sides.done[other] {
        Some(true)
      } else {
        None
      }
    };
    if let Some(equal) = verdict {
      self.decide(equal);
    }
  }
}

impl<S, O> Observable for SequenceEqualOp<S, O>
where
  S: Observable,
  O: Observable<Item = S::Item>,
{
  type Item = bool;

  fn actual_subscribe(&self, observer: BoxObserver<bool>, scheduler: Option<SchedulerRef>) -> Subscription {
    let comparison = Arc::new(Comparison {
      sides: Mutex::new(Sides { queue: [VecDeque::new(), VecDeque::new()], done: [false, false] }),
      comparer: self.comparer.clone(),
      observer: SharedObserver::from_box(observer),
    });
    let group = CompositeDisposable::new();
    let left = SideObserver { comparison: comparison.clone(), side: Side::Left };
    group.add(subscribe_detached(&self.source, Box::new(left), scheduler.clone()));
    let right = SideObserver { comparison, side: Side::Right };
    group.add(subscribe_detached(&self.other, Box::new(right), scheduler));
    Subscription::new(group)
  }
}

struct SideObserver<T> {
  comparison: Arc<Comparison<T>>,
  side: Side,
}

impl<T: Value> Observer<T> for SideObserver<T> {
  fn next(&mut self, value: T) { self.comparison.on_next(self.side, value) }

  fn error(&mut self, err: RxError) { self.comparison.observer.clone().error(err) }

  fn complete(&mut self) { self.comparison.on_complete(self.side) }

  fn is_finished(&self) -> bool { self.comparison.observer.is_finished() }
}
