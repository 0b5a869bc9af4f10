use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  scheduler::SchedulerRef,
  subscription::Subscription,
};

/// Collects every value into a `Vec`, emitted when the source completes.
#[derive(Clone)]
pub struct ToListOp<S> {
  pub(crate) source: S,
}

impl<S: Observable> Observable for ToListOp<S> {
  type Item = Vec<S::Item>;

  fn actual_subscribe(&self, observer: BoxObserver<Vec<S::Item>>, scheduler: Option<SchedulerRef>) -> Subscription {
    self.source.actual_subscribe(Box::new(ToListObserver { observer, list: Some(vec![]) }), scheduler)
  }
}

struct ToListObserver<O, T> {
  observer: O,
  list: Option<Vec<T>>,
}

impl<T: Send, O: Observer<Vec<T>>> Observer<T> for ToListObserver<O, T> {
  fn next(&mut self, value: T) {
    if let Some(list) = self.list.as_mut() {
      list.push(value);
    }
  }

  fn error(&mut self, err: RxError) {
    if self.list.take().is_some() {
      self.observer.error(err)
    }
  }

  fn complete(&mut self) {
    if let Some(list) = self.list.take() {
      self.observer.next(list);
      self.observer.complete();
    }
  }

  fn is_finished(&self) -> bool { self.list.is_none() || self.observer.is_finished() }
}
