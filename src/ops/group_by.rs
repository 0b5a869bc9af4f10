//! `group_by`, `group_by_with` and `group_by_until`.

use crate::{
  error::RxError,
  observable::{BoxObservable, GroupedObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  ops::{guarded, watch_in, DurationFn, Leased},
  scheduler::SchedulerRef,
  subject::Subject,
  subscription::{CompositeDisposable, RefCountDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::{collections::HashMap, hash::Hash, sync::Arc};

type KeyFn<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;
type ElementFn<T, V> = Arc<dyn Fn(T) -> V + Send + Sync>;

/// Splits the source into one [`GroupedObservable`] per key. With a
/// duration selector a group closes when its duration observable first
/// notifies; a later value with that key opens a fresh group.
pub struct GroupByOp<S: Observable, K, V> {
  source: S,
  key: KeyFn<S::Item, K>,
  element: ElementFn<S::Item, V>,
  duration: Option<DurationFn<GroupedObservable<K, V>>>,
}

impl<S: Observable + Clone, K, V> Clone for GroupByOp<S, K, V> {
  fn clone(&self) -> Self {
    GroupByOp {
      source: self.source.clone(),
      key: self.key.clone(),
      element: self.element.clone(),
      duration: self.duration.clone(),
    }
  }
}

impl<S: Observable, K, V> GroupByOp<S, K, V> {
  pub(crate) fn new(
    source: S, key: KeyFn<S::Item, K>, element: ElementFn<S::Item, V>,
    duration: Option<DurationFn<GroupedObservable<K, V>>>,
  ) -> Self {
    GroupByOp { source, key, element, duration }
  }
}

/// Live groups, in the order they were opened.
struct Writers<K, V> {
  map: HashMap<K, (u64, Subject<V>)>,
  opened: u64,
}

impl<K: Eq + Hash, V> Writers<K, V> {
  fn take_all(&mut self) -> Vec<Subject<V>> {
    let mut all: Vec<_> = self.map.drain().map(|(_, w)| w).collect();
    all.sort_by_key(|(seq, _)| *seq);
    all.into_iter().map(|(_, w)| w).collect()
  }
}

struct Groups<T, K, V> {
  writers: Mutex<Writers<K, V>>,
  key: KeyFn<T, K>,
  element: ElementFn<T, V>,
  duration: Option<DurationFn<GroupedObservable<K, V>>>,
  observer: SharedObserver<GroupedObservable<K, V>>,
  group: CompositeDisposable,
  leases: RefCountDisposable,
  scheduler: Option<SchedulerRef>,
}

impl<T, K, V> Groups<T, K, V>
where
  T: Send + 'static,
  K: Value + Eq + Hash,
  V: Value,
{
  fn fail(&self, err: RxError) {
    let live = self.writers.lock().take_all();
    for w in live {
      w.error(err.clone());
    }
    self.observer.clone().error(err);
  }

  fn expire(&self, key: &K, seq: u64) {
    let closed = {
      let mut writers = self.writers.lock();
      match writers.map.get(key) {
        Some((s, _)) if *s == seq => writers.map.remove(key).map(|(_, w)| w),
        _ => None,
      }
    };
    if let Some(w) = closed {
      w.complete();
    }
  }

  fn watch(self: &Arc<Self>, duration: &DurationFn<GroupedObservable<K, V>>, key: K, seq: u64, writer: &Subject<V>) {
    let view = GroupedObservable::new(key.clone(), BoxObservable::new(writer.clone()));
    let ends = match guarded(|| duration(&view)) {
      Ok(ends) => ends,
      Err(e) => return self.fail(e),
    };
    let this = self.clone();
    watch_in(&self.group, &ends, self.scheduler.clone(), move |err| match err {
      None => this.expire(&key, seq),
      Some(e) => this.fail(e),
    });
  }
}

impl<S, K, V> Observable for GroupByOp<S, K, V>
where
  S: Observable,
  K: Value + Eq + Hash,
  V: Value,
{
  type Item = GroupedObservable<K, V>;

  fn actual_subscribe(
    &self, observer: BoxObserver<GroupedObservable<K, V>>, scheduler: Option<SchedulerRef>,
  ) -> Subscription {
    let group = CompositeDisposable::new();
    let groups = Arc::new(Groups {
      writers: Mutex::new(Writers { map: HashMap::new(), opened: 0 }),
      key: self.key.clone(),
      element: self.element.clone(),
      duration: self.duration.clone(),
      observer: SharedObserver::from_box(observer),
      group: group.clone(),
      leases: RefCountDisposable::new(Subscription::new(group.clone())),
      scheduler: scheduler.clone(),
    });
    let upstream = self.source.actual_subscribe(Box::new(GroupObserver(groups.clone())), scheduler);
    group.add(upstream);
    Subscription::new(groups.leases.clone())
  }
}

struct GroupObserver<T, K, V>(Arc<Groups<T, K, V>>);

impl<T, K, V> Observer<T> for GroupObserver<T, K, V>
where
  T: Send + 'static,
  K: Value + Eq + Hash,
  V: Value,
{
  fn next(&mut self, value: T) {
    let groups = &self.0;
    let key = match guarded(|| (groups.key)(&value)) {
      Ok(k) => k,
      Err(e) => return groups.fail(e),
    };
    let (writer, opened) = {
      let mut writers = groups.writers.lock();
      match writers.map.get(&key) {
        Some((_, w)) => (w.clone(), None),
        None => {
          writers.opened += 1;
          let seq = writers.opened;
          let w = Subject::new();
          writers.map.insert(key.clone(), (seq, w.clone()));
          (w, Some(seq))
        }
      }
    };
    if let Some(seq) = opened {
      tracing::trace!(group = seq, "group opened");
      let leased = Leased::boxed(writer.clone(), groups.leases.clone());
      groups.observer.clone().next(GroupedObservable::new(key.clone(), leased));
      if let Some(duration) = &groups.duration {
        groups.watch(duration, key, seq, &writer);
      }
    }
    match guarded(|| (groups.element)(value)) {
      Ok(v) => writer.next(v),
      Err(e) => groups.fail(e),
    }
  }

  fn error(&mut self, err: RxError) { self.0.fail(err) }

  fn complete(&mut self) {
    let live = self.0.writers.lock().take_all();
    for w in live {
      w.complete();
    }
    self.0.observer.clone().complete();
  }

  fn is_finished(&self) -> bool { self.0.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  fn odds_and_evens(scheduler: &TestScheduler) -> HotObservable<i32> {
    scheduler.create_hot_observable(vec![
      on_next(210, 1),
      on_next(220, 3),
      on_next(240, 5),
      on_next(250, 2),
      on_completed(300),
    ])
  }

  #[rxrt_macro::test]
  fn one_group_per_key() {
    let scheduler = TestScheduler::new();
    let xs = odds_and_evens(&scheduler);
    let results = scheduler.start_with_create(move || xs.group_by(|v| v % 2).map(|g| *g.key()));
    assert_eq!(results.messages(), vec![on_next(210, 1), on_next(250, 0), on_completed(300)]);
  }

  #[rxrt_macro::test]
  fn groups_carry_their_elements() {
    let scheduler = TestScheduler::new();
    let xs = odds_and_evens(&scheduler);
    let results = scheduler.start_with_create(move || {
      xs.group_by_with(|v| v % 2, |v| v * 10).flat_map(|g| g.to_list())
    });
    assert_eq!(results.messages(), vec![on_next(300, vec![10, 30, 50]), on_next(300, vec![20]), on_completed(300)]);
  }

  #[rxrt_macro::test]
  fn duration_closes_and_reopens_groups() {
    let scheduler = TestScheduler::new();
    let xs = odds_and_evens(&scheduler);
    let results = scheduler.start_with_create(move || {
      xs.group_by_until(|v| v % 2, |v| v, |_| timer(Duration::from_millis(25))).flat_map(|g| g.to_list())
    });
    assert_eq!(
      results.messages(),
      vec![on_next(235, vec![1, 3]), on_next(265, vec![5]), on_next(275, vec![2]), on_completed(300)]
    );
  }

  #[rxrt_macro::test]
  fn error_reaches_every_group() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(220, 2), on_error(230, "boom")]);
    let results = scheduler.start_with_create(move || {
      xs.group_by(|v| v % 2).flat_map(|g| g.materialize().map(|n| n.kind()))
    });
    assert_eq!(
      results.messages(),
      vec![on_next(210, 'N'), on_next(220, 'N'), on_next(230, 'E'), on_next(230, 'E'), on_error(230, "boom")]
    );
  }

  #[rxrt_macro::test]
  fn panicking_key_selector_errors() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(220, 0)]);
    let results = scheduler.start_with_create(move || {
      xs.group_by(|v| if *v == 0 { panic!("zero key") } else { *v }).map(|g| *g.key())
    });
    assert_eq!(results.messages(), vec![on_next(210, 1), on_error(220, RxError::Panic("zero key".into()))]);
  }
}
