use crate::{
  observable::Observable,
  observer::BoxObserver,
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::Subscription,
};
use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

/// Runs an action once the subscription ends, whether by `complete`,
/// `error` or disposal. The action runs after the terminal notification
/// has been delivered.
pub struct FinalizeOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: Arc<F>,
}

impl<S: Clone, F> Clone for FinalizeOp<S, F> {
  fn clone(&self) -> Self { FinalizeOp { source: self.source.clone(), func: self.func.clone() } }
}

impl<S, F> Observable for FinalizeOp<S, F>
where
  S: Observable,
  F: Fn() + Send + Sync + 'static,
{
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let upstream = self.source.actual_subscribe(observer, scheduler);
    let (func, ran) = (self.func.clone(), AtomicBool::new(false));
    Subscription::from_fn(move || {
      upstream.dispose();
      if !ran.swap(true, Ordering::AcqRel) {
        if let Err(e) = guarded(|| func()) {
          tracing::error!(error = %e, "finalize action panicked");
        }
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  #[rxrt_macro::test]
  fn runs_after_completion() {
    let scheduler = TestScheduler::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_completed(250)]);
    let results = scheduler.start_with_create(move || {
      xs.finalize(move || {
        h.fetch_add(1, Ordering::SeqCst);
      })
    });
    assert_eq!(results.messages(), vec![on_next(210, 1), on_completed(250)]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[rxrt_macro::test]
  fn runs_on_dispose() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let sub = never::<i32>()
      .finalize(move || {
        h.fetch_add(1, Ordering::SeqCst);
      })
      .subscribe(|_| {});
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    sub.dispose();
    sub.dispose();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[rxrt_macro::test]
  fn runs_after_error() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    throw::<i32>("boom")
      .finalize(move || {
        h.fetch_add(1, Ordering::SeqCst);
      })
      .subscribe_err(|_| {}, |_| {});
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }
}
