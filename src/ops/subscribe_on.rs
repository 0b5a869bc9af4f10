use crate::{
  observable::Observable,
  observer::BoxObserver,
  scheduler::SchedulerRef,
  subscription::{ScheduledDisposable, SerialDisposable, Subscription},
};
use std::sync::Arc;

/// Subscribes to the source, and later disposes that subscription, on the
/// given scheduler.
pub struct SubscribeOnOp<S> {
  pub(crate) source: Arc<S>,
  pub(crate) scheduler: SchedulerRef,
}

impl<S> Clone for SubscribeOnOp<S> {
  fn clone(&self) -> Self { SubscribeOnOp { source: self.source.clone(), scheduler: self.scheduler.clone() } }
}

impl<S: Observable> Observable for SubscribeOnOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let serial = SerialDisposable::new();
    let (source, on, slot) = (self.source.clone(), self.scheduler.clone(), serial.clone());
    let pending = self.scheduler.schedule(Box::new(move |_| {
      let upstream = source.actual_subscribe(observer, scheduler);
      slot.set(Subscription::new(ScheduledDisposable::new(on, upstream)));
      Subscription::empty()
    }));
    // The action may have run already and replaced the pending handle.
    if serial.get().is_none() {
      serial.set(pending);
    }
    Subscription::new(serial)
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};
  use std::sync::Arc;

  #[rxrt_macro::test]
  fn subscribes_and_disposes_on_the_scheduler() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 2), on_next(220, 3), on_completed(250)]);
    let (source, on): (_, SchedulerRef) = (xs.clone(), Arc::new(scheduler.clone()));
    let results = scheduler.start_with_create(move || source.subscribe_on(on));
    assert_eq!(results.messages(), vec![on_next(210, 2), on_next(220, 3), on_completed(250)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(201, 251)]);
  }

  #[rxrt_macro::test]
  fn disposed_before_the_action_runs() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 2)]);
    let (source, on): (_, SchedulerRef) = (xs.clone(), Arc::new(scheduler.clone()));
    let sub = source.subscribe_on(on).subscribe(|_| {});
    sub.dispose();
    scheduler.start();
    assert!(xs.subscriptions().is_empty());
  }
}
