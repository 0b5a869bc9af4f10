//! Observables built from marble diagrams.

use super::{timer, BoxObservable, Observable, ObservableExt};
use crate::{
  error::RxError,
  observer::{BoxObserver, SharedObserver},
  ops::timed_or,
  scheduler::{Duration, SchedulerExt, SchedulerRef},
  subscription::{CompositeDisposable, Subscription},
  testing::{marbles, Recorded},
};
use std::sync::Arc;

/// Cold observable replaying a parsed marble diagram relative to each
/// subscription.
#[derive(Clone)]
pub struct MarbleObservable {
  records: Arc<Vec<Recorded<char>>>,
  scheduler: Option<SchedulerRef>,
}

/// Cold observable from a marble diagram; see [`marbles`] for the syntax.
/// Timed work runs on the subscription's scheduler, or the timeout scheduler.
pub fn from_marbles(diagram: &str) -> Result<MarbleObservable, RxError> {
  Ok(MarbleObservable { records: Arc::new(marbles::parse(diagram)?), scheduler: None })
}

impl MarbleObservable {
  pub fn with_scheduler(mut self, scheduler: SchedulerRef) -> Self {
    self.scheduler = Some(scheduler);
    self
  }
}

impl Observable for MarbleObservable {
  type Item = char;

  fn actual_subscribe(&self, observer: BoxObserver<char>, scheduler: Option<SchedulerRef>) -> Subscription {
    let scheduler = timed_or(&self.scheduler, &scheduler);
    let observer = SharedObserver::from_box(observer);
    let group = CompositeDisposable::new();
    for r in self.records.iter() {
      let (mut observer, value) = (observer.clone(), r.value.clone());
      group.add(scheduler.schedule_relative_fn(Duration::from_millis(r.time), move |_| value.accept(&mut observer)));
    }
    Subscription::new(group)
  }
}

/// Hot observable from a marble diagram: the diagram starts playing
/// `start` from now on `scheduler`, whether or not anyone is subscribed.
pub fn hot(diagram: &str, start: Duration, scheduler: SchedulerRef) -> Result<BoxObservable<char>, RxError> {
  let cold = from_marbles(diagram)?.with_scheduler(scheduler.clone());
  let published = timer(start).with_scheduler(scheduler).flat_map(move |_| cold.clone()).publish();
  published.connect();
  Ok(published.box_it())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    scheduler::TestScheduler,
    testing::{marbles::marble_error, on_completed, on_error, on_next},
  };

  #[rxrt_macro::test]
  fn cold_marbles_follow_the_subscription() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| from_marbles("-a-(bc)|").unwrap());
    assert_eq!(
      results.messages(),
      vec![on_next(300, 'a'), on_next(500, 'b'), on_next(500, 'c'), on_completed(900)]
    );
  }

  #[rxrt_macro::test]
  fn marble_errors_use_the_sentinel() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| from_marbles("a#").unwrap());
    assert_eq!(results.messages(), vec![on_next(201, 'a'), on_error(300, marble_error())]);
  }

  #[rxrt_macro::test]
  fn hot_marbles_play_without_subscribers() {
    let scheduler = TestScheduler::new();
    let s: SchedulerRef = Arc::new(scheduler.clone());
    let source = hot("a-b-c-|", Duration::ZERO, s).unwrap();
    let results = scheduler.start_with_create(move || source);
    assert_eq!(results.messages(), vec![on_next(201, 'b'), on_next(401, 'c'), on_completed(601)]);
  }
}
