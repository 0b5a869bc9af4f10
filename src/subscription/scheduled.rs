use super::{Disposable, Subscription};
use crate::scheduler::{SchedulerExt, SchedulerRef};
use std::sync::atomic::{AtomicBool, Ordering};

/// Disposes the wrapped disposable as a scheduled action instead of inline.
pub struct ScheduledDisposable {
  scheduler: SchedulerRef,
  inner: Subscription,
  disposed: AtomicBool,
}

impl ScheduledDisposable {
  pub fn new(scheduler: SchedulerRef, inner: Subscription) -> Self {
    ScheduledDisposable { scheduler, inner, disposed: AtomicBool::new(false) }
  }
}

impl Disposable for ScheduledDisposable {
  fn dispose(&self) {
    if self.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    let inner = self.inner.clone();
    self.scheduler.schedule_fn(move |_| inner.dispose());
  }

  fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::TestScheduler;
  use std::sync::Arc;

  #[rxrt_macro::test]
  fn disposal_happens_on_the_scheduler() {
    let scheduler = TestScheduler::new();
    let inner = Subscription::empty();
    let d = ScheduledDisposable::new(Arc::new(scheduler.clone()), inner.clone());
    d.dispose();
    assert!(d.is_disposed());
    assert!(!inner.is_disposed());
    scheduler.start();
    assert!(inner.is_disposed());
  }
}
