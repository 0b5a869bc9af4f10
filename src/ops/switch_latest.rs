use crate::{
  error::RxError,
  observable::{subscribe_detached, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, SerialDisposable, SingleAssignmentDisposable, Subscription},
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Mirrors the most recent inner observable, unsubscribing from the
/// previous one whenever a new inner arrives.
#[derive(Clone)]
pub struct SwitchLatestOp<S> {
  pub(crate) source: S,
}

#[derive(Default)]
struct Latest {
  id: u64,
  has_inner: bool,
  stopped: bool,
}

struct Switch<T> {
  latest: Mutex<Latest>,
  inner: SerialDisposable,
  observer: SharedObserver<T>,
}

impl<S> Observable for SwitchLatestOp<S>
where
  S: Observable,
  S::Item: Observable,
{
  type Item = <S::Item as Observable>::Item;

  fn actual_subscribe(&self, observer: BoxObserver<Self::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let switch = Arc::new(Switch {
      latest: Mutex::new(Latest::default()),
      inner: SerialDisposable::new(),
      observer: SharedObserver::from_box(observer),
    });
    let outer = SwitchObserver { switch: switch.clone(), scheduler: scheduler.clone() };
    let upstream = self.source.actual_subscribe(Box::new(outer), scheduler);
    Subscription::new(CompositeDisposable::from_iter([upstream, Subscription::new(switch.inner.clone())]))
  }
}

struct SwitchObserver<T> {
  switch: Arc<Switch<T>>,
  scheduler: Option<SchedulerRef>,
}

impl<N: Observable> Observer<N> for SwitchObserver<N::Item> {
  fn next(&mut self, inner: N) {
    let id = {
      let mut latest = self.switch.latest.lock();
      latest.id += 1;
      latest.has_inner = true;
      latest.id
    };
    let slot = SingleAssignmentDisposable::new();
    self.switch.inner.set(Subscription::new(slot.clone()));
    let observer = InnerObserver { switch: self.switch.clone(), id };
    let _ = slot.set(subscribe_detached(&inner, Box::new(observer), self.scheduler.clone()));
  }

  fn error(&mut self, err: RxError) { self.switch.observer.clone().error(err) }

  fn complete(&mut self) {
    let done = {
      let mut latest = self.switch.latest.lock();
      latest.stopped = true;
      !latest.has_inner
    };
    if done {
      self.switch.observer.clone().complete();
    }
  }

  fn is_finished(&self) -> bool { self.switch.observer.is_finished() }
}

struct InnerObserver<T> {
  switch: Arc<Switch<T>>,
  id: u64,
}

impl<T: Send + 'static> InnerObserver<T> {
  fn is_latest(&self) -> bool { self.switch.latest.lock().id == self.id }
}

impl<T: Send + 'static> Observer<T> for InnerObserver<T> {
  fn next(&mut self, value: T) {
    if self.is_latest() {
      self.switch.observer.clone().next(value);
    }
  }

  fn error(&mut self, err: RxError) {
    if self.is_latest() {
      self.switch.observer.clone().error(err);
    }
  }

  fn complete(&mut self) {
    let done = {
      let mut latest = self.switch.latest.lock();
      if latest.id != self.id {
        return;
      }
      latest.has_inner = false;
      latest.stopped
    };
    if done {
      self.switch.observer.clone().complete();
    }
  }

  fn is_finished(&self) -> bool { self.switch.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn follows_the_latest_inner() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_cold_observable(vec![on_next(10, 101), on_next(20, 102), on_next(110, 103), on_completed(200)]);
    let b = scheduler.create_cold_observable(vec![on_next(10, 201), on_next(20, 202), on_completed(50)]);
    let outer = scheduler.create_hot_observable(vec![
      on_next(300, a.clone().box_it()),
      on_next(400, b.clone().box_it()),
      on_completed(500),
    ]);
    let results = scheduler.start_with_create(move || outer.switch_latest());
    assert_eq!(
      results.messages(),
      vec![on_next(310, 101), on_next(320, 102), on_next(410, 201), on_next(420, 202), on_completed(500)]
    );
    assert_eq!(a.subscriptions(), vec![subscribe(300, 400)]);
    assert_eq!(b.subscriptions(), vec![subscribe(400, 450)]);
  }

  #[rxrt_macro::test]
  fn waits_for_the_last_inner() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_cold_observable(vec![on_next(10, 1), on_completed(150)]);
    let outer = scheduler.create_hot_observable(vec![on_next(300, a.box_it()), on_completed(350)]);
    let results = scheduler.start_with_create(move || outer.switch_latest());
    assert_eq!(results.messages(), vec![on_next(310, 1), on_completed(450)]);
  }

  #[rxrt_macro::test]
  fn switch_map_over_values() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(260, 2), on_completed(400)]);
    let results = scheduler.start_with_create(move || {
      xs.switch_map(|v| interval(Duration::from_millis(20)).map(move |n| v * 10 + n as i32).take(3))
    });
    assert_eq!(
      results.messages(),
      vec![on_next(230, 10), on_next(250, 11), on_next(280, 20), on_next(300, 21), on_next(320, 22), on_completed(400)]
    );
  }
}
