use super::{Recorded, SubscriptionLog, NEVER};
use crate::{
  observable::Observable,
  observer::{BoxObserver, SharedObserver},
  scheduler::{Instant, SchedulerExt, SchedulerRef, TestScheduler},
  subscription::Subscription,
  Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

struct Inner<T> {
  observers: Vec<(u64, SharedObserver<T>)>,
  subscriptions: Vec<SubscriptionLog>,
  next_id: u64,
}

/// Emits its recorded messages at their absolute ticks to whoever is
/// subscribed at that moment.
pub struct HotObservable<T> {
  scheduler: TestScheduler,
  messages: Arc<Vec<Recorded<T>>>,
  inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for HotObservable<T> {
  fn clone(&self) -> Self {
    HotObservable { scheduler: self.scheduler.clone(), messages: self.messages.clone(), inner: self.inner.clone() }
  }
}

impl<T: Value> HotObservable<T> {
  pub fn new(scheduler: TestScheduler, messages: Vec<Recorded<T>>) -> Self {
    let inner = Arc::new(Mutex::new(Inner { observers: vec![], subscriptions: vec![], next_id: 0 }));
    for m in messages.iter() {
      let (inner, value) = (inner.clone(), m.value.clone());
      scheduler.schedule_absolute_fn(Instant::from_millis(m.time), move |_| {
        let observers: Vec<_> = inner.lock().observers.iter().map(|(_, o)| o.clone()).collect();
        for mut o in observers {
          value.clone().accept(&mut o);
        }
      });
    }
    HotObservable { scheduler, messages: Arc::new(messages), inner }
  }

  pub fn messages(&self) -> &[Recorded<T>] { &self.messages }

  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.inner.lock().subscriptions.clone() }
}

impl<T: Value> Observable for HotObservable<T> {
  type Item = T;

  fn actual_subscribe(&self, observer: BoxObserver<T>, _: Option<SchedulerRef>) -> Subscription {
    let (id, index) = {
      let mut inner = self.inner.lock();
      let id = inner.next_id;
      inner.next_id += 1;
      inner.observers.push((id, SharedObserver::from_box(observer)));
      inner.subscriptions.push(SubscriptionLog { subscribe: self.scheduler.clock(), unsubscribe: NEVER });
      (id, inner.subscriptions.len() - 1)
    };
    let (inner, scheduler) = (self.inner.clone(), self.scheduler.clone());
    Subscription::from_fn(move || {
      let removed = {
        let mut inner = inner.lock();
        inner.subscriptions[index].unsubscribe = scheduler.clock();
        let pos = inner.observers.iter().position(|(i, _)| *i == id);
        pos.map(|p| inner.observers.remove(p).1)
      };
      drop(removed);
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{observable::ObservableExt, testing::*};

  #[rxrt_macro::test]
  fn only_current_subscribers_see_values() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(150, 1),
      on_next(220, 2),
      on_next(320, 3),
      on_completed(400),
    ]);
    let results = scheduler.start_with_timing(
      {
        let xs = xs.clone();
        move || xs
      },
      100,
      200,
      300,
    );
    assert_eq!(results.messages(), vec![on_next(220, 2)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 300)]);
  }

  #[rxrt_macro::test]
  fn notifications_keep_their_kind() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 'a'), on_error(220, "boom")]);
    let results = scheduler.start_with_create(move || xs.map(|c| c.to_ascii_uppercase()));
    assert_eq!(results.messages(), vec![on_next(210, 'A'), on_error(220, "boom")]);
  }
}
