use super::Recorded;
use crate::{error::RxError, notification::Notification, observer::Observer, scheduler::TestScheduler};
use parking_lot::Mutex;
use std::sync::Arc;

/// Observer that records every notification with the scheduler's clock.
///
/// Clones share the same log.
pub struct MockObserver<T> {
  scheduler: TestScheduler,
  messages: Arc<Mutex<Vec<Recorded<T>>>>,
}

impl<T> Clone for MockObserver<T> {
  fn clone(&self) -> Self { MockObserver { scheduler: self.scheduler.clone(), messages: self.messages.clone() } }
}

impl<T: Clone> MockObserver<T> {
  pub fn new(scheduler: TestScheduler) -> Self { MockObserver { scheduler, messages: Arc::default() } }

  pub fn messages(&self) -> Vec<Recorded<T>> { self.messages.lock().clone() }

  fn record(&self, value: Notification<T>) {
    let time = self.scheduler.clock();
    self.messages.lock().push(Recorded::new(time, value));
  }
}

impl<T: Clone + Send> Observer<T> for MockObserver<T> {
  fn next(&mut self, value: T) { self.record(Notification::Next(value)) }

  fn error(&mut self, err: RxError) { self.record(Notification::Error(err)) }

  fn complete(&mut self) { self.record(Notification::Completed) }
}
