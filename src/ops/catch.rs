use crate::{
  error::RxError,
  observable::{BoxObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  ops::guarded,
  scheduler::SchedulerRef,
  subscription::{SerialDisposable, Subscription},
  Value,
};
use std::sync::Arc;

pub(crate) type Handler<T> = Arc<dyn Fn(RxError) -> BoxObservable<T> + Send + Sync>;

/// On error, continues with the observable the handler returns for it.
pub struct CatchOp<S: Observable> {
  pub(crate) source: S,
  pub(crate) handler: Handler<S::Item>,
}

impl<S: Observable + Clone> Clone for CatchOp<S> {
  fn clone(&self) -> Self { CatchOp { source: self.source.clone(), handler: self.handler.clone() } }
}

impl<S: Observable> Observable for CatchOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let serial = SerialDisposable::new();
    let catcher = CatchObserver {
      observer: SharedObserver::from_box(observer),
      handler: self.handler.clone(),
      serial: serial.clone(),
      scheduler: scheduler.clone(),
    };
    serial.set(self.source.actual_subscribe(Box::new(catcher), scheduler));
    Subscription::new(serial)
  }
}

struct CatchObserver<T> {
  observer: SharedObserver<T>,
  handler: Handler<T>,
  serial: SerialDisposable,
  scheduler: Option<SchedulerRef>,
}

impl<T: Value> Observer<T> for CatchObserver<T> {
  fn next(&mut self, value: T) { self.observer.next(value) }

  fn error(&mut self, err: RxError) {
    match guarded(|| (self.handler)(err)) {
      Ok(fallback) => {
        tracing::debug!("source errored, continuing with the handler's observable");
        let next = fallback.actual_subscribe(Box::new(self.observer.clone()), self.scheduler.clone());
        self.serial.set(next);
      }
      Err(e) => self.observer.error(e),
    }
  }

  fn complete(&mut self) { self.observer.complete() }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}
