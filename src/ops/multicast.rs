use crate::{
  observable::{ConnectableObservable, Observable},
  observer::BoxObserver,
  scheduler::SchedulerRef,
  subject::SubjectLike,
  subscription::{CompositeDisposable, Subscription},
};
use std::sync::Arc;

type SelectorFn<S, Subj, N> = Arc<dyn Fn(ConnectableObservable<Arc<S>, Subj>) -> N + Send + Sync>;

/// `multicast` with a selector: every subscription gets a fresh subject from
/// the factory, its own pipeline built by the selector over that subject,
/// and its own connection to the source.
pub struct MulticastSelectorOp<S, Subj, N> {
  pub(crate) source: Arc<S>,
  pub(crate) factory: Arc<dyn Fn() -> Subj + Send + Sync>,
  pub(crate) selector: SelectorFn<S, Subj, N>,
}

impl<S, Subj, N> Clone for MulticastSelectorOp<S, Subj, N> {
  fn clone(&self) -> Self {
    MulticastSelectorOp {
      source: self.source.clone(),
      factory: self.factory.clone(),
      selector: self.selector.clone(),
    }
  }
}

impl<S, Subj, N> Observable for MulticastSelectorOp<S, Subj, N>
where
  S: Observable,
  Subj: SubjectLike<S::Item>,
  N: Observable,
{
  type Item = N::Item;

  fn actual_subscribe(&self, observer: BoxObserver<N::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let connectable = ConnectableObservable::new(self.source.clone(), (self.factory)());
    let selected = (self.selector)(connectable.clone());
    let downstream = selected.actual_subscribe(observer, scheduler.clone());
    let connection = connectable.connect_with(scheduler);
    Subscription::new(CompositeDisposable::from_iter([downstream, connection]))
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};
  use parking_lot::Mutex;
  use std::sync::Arc;

  #[rxrt_macro::test]
  fn selector_shares_one_source_subscription() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(220, 2), on_completed(230)]);
    let source = xs.clone();
    let results = scheduler.start_with_create(move || {
      source.multicast_with(Subject::new, |shared| shared.clone().merge_with(shared.map(|v| v * 10)))
    });
    assert_eq!(
      results.messages(),
      vec![on_next(210, 1), on_next(210, 10), on_next(220, 2), on_next(220, 20), on_completed(230)]
    );
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 230)]);
  }

  #[rxrt_macro::test]
  fn each_subscription_gets_its_own_subject() {
    let seen = Arc::new(Mutex::new(vec![]));
    let plan = of([1, 2, 3]).multicast_with(Subject::new, |shared| shared.take(2));
    for run in 0..2 {
      let s = seen.clone();
      plan.clone().subscribe(move |v| s.lock().push((run, v)));
    }
    assert_eq!(*seen.lock(), vec![(0, 1), (0, 2), (1, 1), (1, 2)]);
  }
}
