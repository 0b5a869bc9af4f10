use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer, SharedObserver},
  ops::{guarded, watch_in, DurationFn},
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc};

type JoinResultFn<L, R, U> = Arc<dyn Fn(L, R) -> U + Send + Sync>;

/// Emits `result(left, right)` for every pair of values whose durations
/// overlap. Completes once a side has completed and the other side has no
/// live values left, or both sides have completed.
pub struct JoinOp<L: Observable, R: Observable, U> {
  pub(crate) left: L,
  pub(crate) right: R,
  pub(crate) left_duration: DurationFn<L::Item>,
  pub(crate) right_duration: DurationFn<R::Item>,
  pub(crate) result: JoinResultFn<L::Item, R::Item, U>,
}

impl<L: Observable + Clone, R: Observable + Clone, U> Clone for JoinOp<L, R, U> {
  fn clone(&self) -> Self {
    JoinOp {
      left: self.left.clone(),
      right: self.right.clone(),
      left_duration: self.left_duration.clone(),
      right_duration: self.right_duration.clone(),
      result: self.result.clone(),
    }
  }
}

/// Live values of one side.
struct Side<V> {
  values: BTreeMap<u64, V>,
  next_id: u64,
  done: bool,
}

impl<V> Default for Side<V> {
  fn default() -> Self { Side { values: BTreeMap::new(), next_id: 0, done: false } }
}

struct Sides<LV, RV> {
  left: Side<LV>,
  right: Side<RV>,
}

struct Join<LV, RV, U> {
  sides: Mutex<Sides<LV, RV>>,
  observer: SharedObserver<U>,
  group: CompositeDisposable,
  left_duration: DurationFn<LV>,
  right_duration: DurationFn<RV>,
  result: JoinResultFn<LV, RV, U>,
  scheduler: Option<SchedulerRef>,
}

impl<LV: Value, RV: Value, U: Value> Join<LV, RV, U> {
  fn emit_pairs(&self, pairs: impl IntoIterator<Item = (LV, RV)>) {
    for (l, r) in pairs {
      match guarded(|| (self.result)(l, r)) {
        Ok(v) => self.observer.clone().next(v),
        Err(e) => return self.observer.clone().error(e),
      }
    }
  }

  fn on_left(self: &Arc<Self>, value: LV) {
    let ends = match guarded(|| (self.left_duration)(&value)) {
      Ok(ends) => ends,
      Err(e) => return self.observer.clone().error(e),
    };
    let (id, rights) = {
      let mut sides = self.sides.lock();
      let id = sides.left.next_id;
      sides.left.next_id += 1;
      sides.left.values.insert(id, value.clone());
      (id, sides.right.values.values().cloned().collect::<Vec<_>>())
    };
    let this = self.clone();
    watch_in(&self.group, &ends, self.scheduler.clone(), move |err| match err {
      None => {
        let finished = {
          let mut sides = this.sides.lock();
          sides.left.values.remove(&id);
          sides.left.values.is_empty() && sides.left.done
        };
        if finished {
          this.observer.clone().complete();
        }
      }
      Some(e) => this.observer.clone().error(e),
    });
    self.emit_pairs(rights.into_iter().map(|r| (value.clone(), r)));
  }

  fn on_right(self: &Arc<Self>, value: RV) {
    let ends = match guarded(|| (self.right_duration)(&value)) {
      Ok(ends) => ends,
      Err(e) => return self.observer.clone().error(e),
    };
    let (id, lefts) = {
      let mut sides = self.sides.lock();
      let id = sides.right.next_id;
      sides.right.next_id += 1;
      sides.right.values.insert(id, value.clone());
      (id, sides.left.values.values().cloned().collect::<Vec<_>>())
    };
    let this = self.clone();
    watch_in(&self.group, &ends, self.scheduler.clone(), move |err| match err {
      None => {
        let finished = {
          let mut sides = this.sides.lock();
          sides.right.values.remove(&id);
          sides.right.values.is_empty() && sides.right.done
        };
        if finished {
          this.observer.clone().complete();
        }
      }
      Some(e) => this.observer.clone().error(e),
    });
    self.emit_pairs(lefts.into_iter().map(|l| (l, value.clone())));
  }
}

impl<L, R, U> Observable for JoinOp<L, R, U>
where
  L: Observable,
  R: Observable,
  U: Value,
{
  type Item = U;

  fn actual_subscribe(&self, observer: BoxObserver<U>, scheduler: Option<SchedulerRef>) -> Subscription {
    let group = CompositeDisposable::new();
    let join = Arc::new(Join {
      sides: Mutex::new(Sides { left: Side::default(), right: Side::default() }),
      observer: SharedObserver::from_box(observer),
      group: group.clone(),
      left_duration: self.left_duration.clone(),
      right_duration: self.right_duration.clone(),
      result: self.result.clone(),
      scheduler: scheduler.clone(),
    });
    group.add(self.left.actual_subscribe(Box::new(LeftObserver(join.clone())), scheduler.clone()));
    group.add(self.right.actual_subscribe(Box::new(RightObserver(join)), scheduler));
    Subscription::new(group)
  }
}

impl<LV: Value, RV: Value, U: Value> Join<LV, RV, U> {
  fn complete_side(&self, is_left: bool) {
    let finished = {
      let mut sides = self.sides.lock();
      let Sides { left, right } = &mut *sides;
      if is_left {
        left.done = true;
        right.done || left.values.is_empty()
      } else {
        right.done = true;
        left.done || right.values.is_empty()
      }
    };
    if finished {
      self.observer.clone().complete();
    }
  }
}

struct LeftObserver<LV, RV, U>(Arc<Join<LV, RV, U>>);

impl<LV: Value, RV: Value, U: Value> Observer<LV> for LeftObserver<LV, RV, U> {
  fn next(&mut self, value: LV) { self.0.on_left(value) }

  fn error(&mut self, err: RxError) { self.0.observer.clone().error(err) }

  fn complete(&mut self) { self.0.complete_side(true) }

  fn is_finished(&self) -> bool { self.0.observer.is_finished() }
}

struct RightObserver<LV, RV, U>(Arc<Join<LV, RV, U>>);

impl<LV: Value, RV: Value, U: Value> Observer<RV> for RightObserver<LV, RV, U> {
  fn next(&mut self, value: RV) { self.0.on_right(value) }

  fn error(&mut self, err: RxError) { self.0.observer.clone().error(err) }

  fn complete(&mut self) { self.0.complete_side(false) }

  fn is_finished(&self) -> bool { self.0.observer.is_finished() }
}
