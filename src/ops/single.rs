use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  scheduler::SchedulerRef,
  subscription::Subscription,
};

/// Emit the only value of the source once it completes.
///
/// A second value errors with
/// [`RxError::SequenceContainsMoreThanOneElement`] right away. An empty source
/// emits the default if one was given, and errors with
/// [`RxError::SequenceContainsNoElements`] otherwise.
#[derive(Clone)]
pub struct SingleOp<S: Observable> {
  pub(crate) source: S,
  pub(crate) default: Option<S::Item>,
}

impl<S: Observable> Observable for SingleOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let single = SingleObserver { observer, seen: None, default: self.default.clone(), done: false };
    self.source.actual_subscribe(Box::new(single), scheduler)
  }
}

struct SingleObserver<O, T> {
  observer: O,
  seen: Option<T>,
  default: Option<T>,
  done: bool,
}

impl<T: Send, O: Observer<T>> Observer<T> for SingleObserver<O, T> {
  fn next(&mut self, value: T) {
    if self.done {
      return;
    }
    if self.seen.is_some() {
      self.done = true;
      self.seen = None;
      self.observer.error(RxError::SequenceContainsMoreThanOneElement);
    } else {
      self.seen = Some(value);
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
    match self.seen.take().or_else(|| self.default.take()) {
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
  fn emits_the_only_value_on_completion() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 2), on_completed(250)]);
    let results = scheduler.start_with_create(move || xs.single());
    assert_eq!(results.messages(), vec![on_next(250, 2), on_completed(250)]);
  }

  #[rxrt_macro::test]
  fn second_value_errors_at_once() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 2), on_next(220, 3), on_completed(250)]);
    let source = xs.clone();
    let results = scheduler.start_with_create(move || source.single());
    assert_eq!(results.messages(), vec![on_error(220, RxError::SequenceContainsMoreThanOneElement)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 220)]);
  }

  #[rxrt_macro::test]
  fn empty_source() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32>(vec![on_completed(250)]);
    let source = xs.clone();
    let results = scheduler.start_with_create(move || source.single());
    assert_eq!(results.messages(), vec![on_error(250, RxError::SequenceContainsNoElements)]);

    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32>(vec![on_completed(250)]);
    let results = scheduler.start_with_create(move || xs.single_or_default(9));
    assert_eq!(results.messages(), vec![on_next(250, 9), on_completed(250)]);
  }

  #[rxrt_macro::test]
  fn default_does_not_hide_a_second_value() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 2), on_next(230, 3), on_completed(250)]);
    let results = scheduler.start_with_create(move || xs.single_or_default(9));
    assert_eq!(results.messages(), vec![on_error(230, RxError::SequenceContainsMoreThanOneElement)]);
  }
}
