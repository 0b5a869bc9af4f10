use crate::{
  observable::Observable,
  observer::{BoxObserver, ScheduledObserver, SharedObserver},
  scheduler::SchedulerRef,
  subscription::Subscription,
};

/// Re-emits all notifications from the source on the given scheduler.
///
/// Notifications are queued and drained in order, one per scheduled turn,
/// so the downstream never runs on the producer's thread.
#[derive(Clone)]
pub struct ObserveOnOp<S> {
  pub(crate) source: S,
  pub(crate) scheduler: SchedulerRef,
}

impl<S: Observable> Observable for ObserveOnOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let scheduled = ScheduledObserver::auto_activated(self.scheduler.clone(), SharedObserver::from_box(observer));
    let upstream = self.source.actual_subscribe(Box::new(scheduled.clone()), scheduler);
    Subscription::from_fn(move || {
      upstream.dispose();
      scheduled.dispose();
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};
  use std::sync::{mpsc, Arc};

  #[rxrt_macro::test]
  fn shifts_each_notification_one_turn() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 2), on_next(220, 3), on_completed(250)]);
    let on: SchedulerRef = Arc::new(scheduler.clone());
    let results = scheduler.start_with_create(move || xs.observe_on(on));
    assert_eq!(results.messages(), vec![on_next(211, 2), on_next(221, 3), on_completed(251)]);
  }

  #[rxrt_macro::test]
  fn delivers_on_another_thread() {
    let (tx, rx) = mpsc::channel();
    let here = std::thread::current().id();
    of([1, 2, 3])
      .observe_on(Arc::new(NewThreadScheduler::default()))
      .subscribe(move |v| tx.send((v, std::thread::current().id())).unwrap());
    let got: Vec<_> = rx.iter().take(3).collect();
    assert_eq!(got.iter().map(|(v, _)| *v).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(got.iter().all(|(_, id)| *id != here));
  }
}
