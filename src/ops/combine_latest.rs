use crate::{
  error::RxError,
  observable::{BoxObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Emit the latest value of every source each time any of them emits, once
/// all of them have emitted at least once.
pub fn combine_latest<T: Value>(sources: Vec<BoxObservable<T>>) -> CombineLatestOp<T> { CombineLatestOp { sources } }

#[derive(Clone)]
pub struct CombineLatestOp<T> {
  pub(crate) sources: Vec<BoxObservable<T>>,
}

struct Latest<T> {
  values: Vec<Option<T>>,
  done: Vec<bool>,
  all_have_values: bool,
}

enum Step<T> {
  Emit(Vec<T>),
  Complete,
  Nothing,
}

impl<T: Clone> Latest<T> {
  fn next(&mut self, i: usize, value: T) -> Step<T> {
    self.values[i] = Some(value);
    if !self.all_have_values {
      self.all_have_values = self.values.iter().all(Option::is_some);
    }
    if self.all_have_values {
      Step::Emit(self.values.iter().flatten().cloned().collect())
    } else if self.done.iter().enumerate().all(|(j, d)| j == i || *d) {
      // Every other source finished without a value; nothing can combine.
      Step::Complete
    } else {
      Step::Nothing
    }
  }

  fn complete(&mut self, i: usize) -> Step<T> {
    self.done[i] = true;
    if self.done.iter().all(|d| *d) { Step::Complete } else { Step::Nothing }
  }
}

impl<T: Value> Observable for CombineLatestOp<T> {
  type Item = Vec<T>;

  fn actual_subscribe(&self, observer: BoxObserver<Vec<T>>, scheduler: Option<SchedulerRef>) -> Subscription {
    let mut observer = SharedObserver::from_box(observer);
    let n = self.sources.len();
    if n == 0 {
      observer.complete();
      return Subscription::empty();
    }
    let latest = Arc::new(Mutex::new(Latest { values: vec![None; n], done: vec![false; n], all_have_values: false }));
    let group = CompositeDisposable::new();
    for (index, source) in self.sources.iter().enumerate() {
      let slot = SlotObserver { index, latest: latest.clone(), observer: observer.clone() };
      group.add(source.actual_subscribe(Box::new(slot), scheduler.clone()));
    }
    Subscription::new(group)
  }
}

struct SlotObserver<T> {
  index: usize,
  latest: Arc<Mutex<Latest<T>>>,
  observer: SharedObserver<Vec<T>>,
}

impl<T: Value> SlotObserver<T> {
  fn apply(&mut self, step: Step<T>) {
    match step {
      Step::Emit(values) => self.observer.next(values),
      Step::Complete => self.observer.complete(),
      Step::Nothing => {}
    }
  }
}

impl<T: Value> Observer<T> for SlotObserver<T> {
  fn next(&mut self, value: T) {
    let step = self.latest.lock().next(self.index, value);
    self.apply(step);
  }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) {
    let step = self.latest.lock().complete(self.index);
    self.apply(step);
  }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn combines_after_every_source_emitted() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(150, 1), on_next(215, 2), on_next(225, 4), on_completed(230)]);
    let ys = scheduler.create_hot_observable(vec![on_next(150, 1), on_next(220, 3), on_completed(240)]);
    let results = scheduler.start_with_create(move || xs.combine_latest_with(ys, |a, b| a + b));
    assert_eq!(results.messages(), vec![on_next(220, 5), on_next(225, 7), on_completed(240)]);
  }

  #[rxrt_macro::test]
  fn emits_vectors_in_source_order() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_hot_observable(vec![on_next(210, 'a'), on_next(240, 'b'), on_completed(300)]);
    let b = scheduler.create_hot_observable(vec![on_next(220, 'x'), on_completed(250)]);
    let results = scheduler.start_with_create(move || combine_latest(vec![a.box_it(), b.box_it()]));
    assert_eq!(
      results.messages(),
      vec![on_next(220, vec!['a', 'x']), on_next(240, vec!['b', 'x']), on_completed(300)]
    );
  }

  #[rxrt_macro::test]
  fn completes_when_no_combination_is_possible() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32>(vec![on_completed(210)]);
    let ys = scheduler.create_hot_observable(vec![on_next(220, 3), on_next(230, 4)]);
    let results = scheduler.start_with_create(move || combine_latest(vec![xs.box_it(), ys.box_it()]));
    assert_eq!(results.messages(), vec![on_completed(220)]);
  }

  #[rxrt_macro::test]
  fn error_from_either_side() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_error(220, "boom")]);
    let ys = scheduler.create_hot_observable(vec![on_next(215, 2), on_next(230, 3)]);
    let results = scheduler.start_with_create(move || xs.combine_latest_with(ys, |a, b| a * b));
    assert_eq!(results.messages(), vec![on_next(215, 2), on_error(220, "boom")]);
  }

  #[rxrt_macro::test]
  fn no_sources_completes() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| combine_latest::<i32>(vec![]));
    assert_eq!(results.messages(), vec![on_completed(200)]);
  }
}
