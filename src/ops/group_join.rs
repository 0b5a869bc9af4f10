//! `group_join`: correlate two sources by overlapping durations.
//!
//! Each left value opens a window subject that receives every right value
//! alive at the same time. The window completes when the left value's
//! duration ends; right values simply drop out of the live set when theirs
//! ends.

use crate::{
  error::RxError,
  observable::{BoxObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  ops::{guarded, watch_in, DurationFn, Leased},
  scheduler::SchedulerRef,
  subject::Subject,
  subscription::{CompositeDisposable, RefCountDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc};

type GroupResultFn<L, R, U> = Arc<dyn Fn(L, BoxObservable<R>) -> U + Send + Sync>;

pub struct GroupJoinOp<L: Observable, R: Observable, U> {
  pub(crate) left: L,
  pub(crate) right: R,
  pub(crate) left_duration: DurationFn<L::Item>,
  pub(crate) right_duration: DurationFn<R::Item>,
  pub(crate) result: GroupResultFn<L::Item, R::Item, U>,
}

impl<L: Observable + Clone, R: Observable + Clone, U> Clone for GroupJoinOp<L, R, U> {
  fn clone(&self) -> Self {
    GroupJoinOp {
      left: self.left.clone(),
      right: self.right.clone(),
      left_duration: self.left_duration.clone(),
      right_duration: self.right_duration.clone(),
      result: self.result.clone(),
    }
  }
}

struct Live<RV> {
  windows: BTreeMap<u64, Subject<RV>>,
  rights: BTreeMap<u64, RV>,
  next_left: u64,
  next_right: u64,
}

struct GroupJoin<LV, RV, U> {
  live: Mutex<Live<RV>>,
  observer: SharedObserver<U>,
  group: CompositeDisposable,
  leases: RefCountDisposable,
  left_duration: DurationFn<LV>,
  right_duration: DurationFn<RV>,
  result: GroupResultFn<LV, RV, U>,
  scheduler: Option<SchedulerRef>,
}

impl<LV, RV, U> GroupJoin<LV, RV, U>
where
  LV: Value,
  RV: Value,
  U: Value,
{
  fn fail(&self, err: RxError) {
    let windows: Vec<_> = std::mem::take(&mut self.live.lock().windows).into_values().collect();
    for w in windows {
      w.error(err.clone());
    }
    self.observer.clone().error(err);
  }

  fn on_left(self: &Arc<Self>, value: LV) {
    let ends = match guarded(|| (self.left_duration)(&value)) {
      Ok(ends) => ends,
      Err(e) => return self.fail(e),
    };
    let window = Subject::new();
    let (id, rights) = {
      let mut live = self.live.lock();
      let id = live.next_left;
      live.next_left += 1;
      live.windows.insert(id, window.clone());
      (id, live.rights.values().cloned().collect::<Vec<_>>())
    };
    let leased = Leased::boxed(window.clone(), self.leases.clone());
    match guarded(|| (self.result)(value, leased)) {
      Ok(v) => self.observer.clone().next(v),
      Err(e) => return self.fail(e),
    }
    for r in rights {
      window.next(r);
    }
    let this = self.clone();
    watch_in(&self.group, &ends, self.scheduler.clone(), move |err| match err {
      None => {
        let closed = this.live.lock().windows.remove(&id);
        if let Some(w) = closed {
          w.complete();
        }
      }
      Some(e) => this.fail(e),
    });
  }

  fn on_right(self: &Arc<Self>, value: RV) {
    let ends = match guarded(|| (self.right_duration)(&value)) {
      Ok(ends) => ends,
      Err(e) => return self.fail(e),
    };
    let (id, windows) = {
      let mut live = self.live.lock();
      let id = live.next_right;
      live.next_right += 1;
      live.rights.insert(id, value.clone());
      (id, live.windows.values().cloned().collect::<Vec<_>>())
    };
    let this = self.clone();
    watch_in(&self.group, &ends, self.scheduler.clone(), move |err| match err {
      None => {
        this.live.lock().rights.remove(&id);
      }
      Some(e) => this.fail(e),
    });
    for w in windows {
      w.next(value.clone());
    }
  }
}

impl<L, R, U> Observable for GroupJoinOp<L, R, U>
where
  L: Observable,
  R: Observable,
  U: Value,
{
  type Item = U;

  fn actual_subscribe(&self, observer: BoxObserver<U>, scheduler: Option<SchedulerRef>) -> Subscription {
    let group = CompositeDisposable::new();
    let join = Arc::new(GroupJoin {
      live: Mutex::new(Live { windows: BTreeMap::new(), rights: BTreeMap::new(), next_left: 0, next_right: 0 }),
      observer: SharedObserver::from_box(observer),
      group: group.clone(),
      leases: RefCountDisposable::new(Subscription::new(group.clone())),
      left_duration: self.left_duration.clone(),
      right_duration: self.right_duration.clone(),
      result: self.result.clone(),
      scheduler: scheduler.clone(),
    });
    group.add(self.left.actual_subscribe(Box::new(LeftObserver(join.clone())), scheduler.clone()));
    group.add(self.right.actual_subscribe(Box::new(RightObserver(join.clone())), scheduler));
    Subscription::new(join.leases.clone())
  }
}

struct LeftObserver<LV, RV, U>(Arc<GroupJoin<LV, RV, U>>);

impl<LV: Value, RV: Value, U: Value> Observer<LV> for LeftObserver<LV, RV, U> {
  fn next(&mut self, value: LV) { self.0.on_left(value) }

  fn error(&mut self, err: RxError) { self.0.fail(err) }

  fn complete(&mut self) { self.0.observer.clone().complete() }

  fn is_finished(&self) -> bool { self.0.observer.is_finished() }
}

struct RightObserver<LV, RV, U>(Arc<GroupJoin<LV, RV, U>>);

impl<LV: Value, RV: Value, U: Value> Observer<RV> for RightObserver<LV, RV, U> {
  fn next(&mut self, value: RV) { self.0.on_right(value) }

  fn error(&mut self, err: RxError) { self.0.fail(err) }

  // Only the left side decides when the result completes.
  fn complete(&mut self) {}

  fn is_finished(&self) -> bool { self.0.observer.is_finished() }
}
