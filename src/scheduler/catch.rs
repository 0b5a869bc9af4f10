use super::{Action, Duration, Instant, Scheduler, SchedulerRef};
use crate::{error::RxError, subscription::Subscription};
use std::{
  panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
  sync::Arc,
};

type Handler = Arc<dyn Fn(&RxError) -> bool + Send + Sync>;

/// Decorates another scheduler; when a scheduled action panics, `handler`
/// decides whether the panic is swallowed (`true`) or resumed (`false`).
#[derive(Clone)]
pub struct CatchScheduler {
  inner: SchedulerRef,
  handler: Handler,
}

impl CatchScheduler {
  pub fn new<H>(inner: SchedulerRef, handler: H) -> Self
  where
    H: Fn(&RxError) -> bool + Send + Sync + 'static,
  {
    CatchScheduler { inner, handler: Arc::new(handler) }
  }

  fn wrap(&self, action: Action) -> Action {
    let this = self.clone();
    Box::new(move |_| match catch_unwind(AssertUnwindSafe(|| action(&this))) {
      Ok(sub) => sub,
      Err(payload) => {
        let err = RxError::from_panic(payload.as_ref());
        if (this.handler)(&err) {
          tracing::warn!(error = %err, "scheduled action panicked, swallowed");
          Subscription::empty()
        } else {
          resume_unwind(payload)
        }
      }
    })
  }
}

impl Scheduler for CatchScheduler {
  fn now(&self) -> Instant { self.inner.now() }

  fn schedule(&self, action: Action) -> Subscription { self.inner.schedule(self.wrap(action)) }

  fn schedule_relative(&self, due: Duration, action: Action) -> Subscription {
    self.inner.schedule_relative(due, self.wrap(action))
  }

  fn schedule_absolute(&self, due: Instant, action: Action) -> Subscription {
    self.inner.schedule_absolute(due, self.wrap(action))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::{SchedulerExt, TestScheduler};
  use parking_lot::Mutex;

  #[rxrt_macro::test]
  fn swallows_when_handler_agrees() {
    let scheduler = TestScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    let catch = CatchScheduler::new(Arc::new(scheduler.clone()), move |e| {
      s.lock().push(e.clone());
      true
    });
    catch.schedule_fn(|_| panic!("boom"));
    let after = Arc::new(Mutex::new(false));
    let a = after.clone();
    catch.schedule_fn(move |_| *a.lock() = true);
    scheduler.start();
    assert_eq!(*seen.lock(), vec![RxError::Panic("boom".into())]);
    assert!(*after.lock());
  }

  #[rxrt_macro::test]
  fn nested_work_stays_wrapped() {
    let scheduler = TestScheduler::new();
    let count = Arc::new(Mutex::new(0));
    let c = count.clone();
    let catch = CatchScheduler::new(Arc::new(scheduler.clone()), move |_| {
      *c.lock() += 1;
      true
    });
    catch.schedule_fn(|s| {
      s.schedule_fn(|_| panic!("inner"));
    });
    scheduler.start();
    assert_eq!(*count.lock(), 1);
  }

  #[rxrt_macro::test]
  #[should_panic(expected = "fatal")]
  fn rethrows_when_handler_refuses() {
    let scheduler = TestScheduler::new();
    let catch = CatchScheduler::new(Arc::new(scheduler.clone()), |_| false);
    catch.schedule_fn(|_| panic!("fatal"));
    scheduler.start();
  }
}
