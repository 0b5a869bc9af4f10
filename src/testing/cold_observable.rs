use super::{Recorded, SubscriptionLog, NEVER};
use crate::{
  observable::Observable,
  observer::{BoxObserver, SharedObserver},
  scheduler::{Duration, SchedulerExt, SchedulerRef, TestScheduler},
  subscription::{CompositeDisposable, Disposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Replays its recorded messages to every subscriber, with times taken
/// relative to the moment of subscription.
pub struct ColdObservable<T> {
  scheduler: TestScheduler,
  messages: Arc<Vec<Recorded<T>>>,
  subscriptions: Arc<Mutex<Vec<SubscriptionLog>>>,
}

impl<T> Clone for ColdObservable<T> {
  fn clone(&self) -> Self {
    ColdObservable {
      scheduler: self.scheduler.clone(),
      messages: self.messages.clone(),
      subscriptions: self.subscriptions.clone(),
    }
  }
}

impl<T: Value> ColdObservable<T> {
  pub fn new(scheduler: TestScheduler, messages: Vec<Recorded<T>>) -> Self {
    ColdObservable { scheduler, messages: Arc::new(messages), subscriptions: Arc::default() }
  }

  pub fn messages(&self) -> &[Recorded<T>] { &self.messages }

  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.subscriptions.lock().clone() }
}

impl<T: Value> Observable for ColdObservable<T> {
  type Item = T;

  fn actual_subscribe(&self, observer: BoxObserver<T>, _: Option<SchedulerRef>) -> Subscription {
    let index = {
      let mut subs = self.subscriptions.lock();
      subs.push(SubscriptionLog { subscribe: self.scheduler.clock(), unsubscribe: NEVER });
      subs.len() - 1
    };
    let observer = SharedObserver::from_box(observer);
    let group = CompositeDisposable::new();
    for m in self.messages.iter() {
      let (mut observer, value) = (observer.clone(), m.value.clone());
      group.add(
        self
          .scheduler
          .schedule_relative_fn(Duration::from_millis(m.time), move |_| value.accept(&mut observer)),
      );
    }
    let (subscriptions, scheduler) = (self.subscriptions.clone(), self.scheduler.clone());
    Subscription::from_fn(move || {
      subscriptions.lock()[index].unsubscribe = scheduler.clock();
      group.dispose();
    })
  }
}
