use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  scheduler::SchedulerRef,
  subscription::Subscription,
};

/// Emit only the first value, then complete. An empty source emits the
/// default when there is one, and errors with
/// [`RxError::SequenceContainsNoElements`] otherwise.
#[derive(Clone)]
pub struct FirstOp<S: Observable> {
  pub(crate) source: S,
  pub(crate) default: Option<S::Item>,
}

impl<S: Observable> Observable for FirstOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let first = FirstObserver { observer, default: self.default.clone(), done: false };
    self.source.actual_subscribe(Box::new(first), scheduler)
  }
}

struct FirstObserver<O, T> {
  observer: O,
  default: Option<T>,
  done: bool,
}

impl<T: Send, O: Observer<T>> Observer<T> for FirstObserver<O, T> {
  fn next(&mut self, value: T) {
    if !std::mem::replace(&mut self.done, true) {
      self.observer.next(value);
      self.observer.complete();
    }
  }

  fn error(&mut self, err: RxError) {
    if !std::mem::replace(&mut self.done, true) {
      self.observer.error(err)
    }
  }

  fn complete(&mut self) {
    if std::mem::replace(&mut self.done, true) {
      return;
    }
    match self.default.take() {
      Some(v) => {
        self.observer.next(v);
        self.observer.complete();
      }
      None => self.observer.error(RxError::SequenceContainsNoElements),
    }
  }

  fn is_finished(&self) -> bool { self.done || self.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn takes_the_first_value() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 2), on_next(220, 3), on_completed(250)]);
    let source = xs.clone();
    let results = scheduler.start_with_create(move || source.first());
    assert_eq!(results.messages(), vec![on_next(210, 2), on_completed(210)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 210)]);
  }

  #[rxrt_macro::test]
  fn empty_source_errors() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32>(vec![on_completed(250)]);
    let results = scheduler.start_with_create(move || xs.first());
    assert_eq!(results.messages(), vec![on_error(250, RxError::SequenceContainsNoElements)]);
  }

  #[rxrt_macro::test]
  fn default_stands_in_for_an_empty_source() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32>(vec![on_completed(250)]);
    let results = scheduler.start_with_create(move || xs.first_or_default(7));
    assert_eq!(results.messages(), vec![on_next(250, 7), on_completed(250)]);
  }

  #[rxrt_macro::test]
  fn default_is_ignored_when_a_value_arrives() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(230, 3), on_completed(250)]);
    let results = scheduler.start_with_create(move || xs.first_or_default(7));
    assert_eq!(results.messages(), vec![on_next(230, 3), on_completed(230)]);
  }
}
