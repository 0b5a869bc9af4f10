//! `timeout` in its timer-driven and observable-driven flavours.
//!
//! Both race the source against a timer. Every notification from the source
//! bumps an id; a timer only wins when the id it was armed with is still
//! current. Once a timer wins the source is dropped and the stream switches
//! to the fallback, which defaults to an error of [`RxError::Timeout`].

use crate::{
  error::RxError,
  observable::{BoxObservable, Observable, ObservableExt},
  observer::{BoxObserver, Observer, SharedObserver},
  ops::{guarded, timed_or, watch_duration, Due, DurationFn},
  scheduler::{SchedulerRef, SchedulerExt},
  subscription::{CompositeDisposable, SerialDisposable, SingleAssignmentDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct Ids {
  current: u64,
  switched: bool,
}

struct Race<T> {
  ids: Mutex<Ids>,
  observer: SharedObserver<T>,
  /// The source, then the fallback.
  subscription: SerialDisposable,
  timer: SerialDisposable,
  other: Option<BoxObservable<T>>,
  scheduler: Option<SchedulerRef>,
}

impl<T: Value> Race<T> {
  fn new(observer: BoxObserver<T>, other: Option<BoxObservable<T>>, scheduler: Option<SchedulerRef>) -> Arc<Self> {
    Arc::new(Race {
      ids: Mutex::new(Ids::default()),
      observer: SharedObserver::from_box(observer),
      subscription: SerialDisposable::new(),
      timer: SerialDisposable::new(),
      other,
      scheduler,
    })
  }

  fn current(&self) -> u64 { self.ids.lock().current }

  /// The source notified; false once a timer has won.
  fn source_wins(&self) -> bool {
    let mut ids = self.ids.lock();
    if ids.switched {
      return false;
    }
    ids.current += 1;
    true
  }

  fn timer_wins(&self, id: u64) -> bool {
    let mut ids = self.ids.lock();
    if ids.switched || ids.current != id {
      return false;
    }
    ids.switched = true;
    true
  }

  fn switch(&self, id: u64) {
    if self.timer_wins(id) {
      tracing::debug!("timeout elapsed, switching to fallback");
      match &self.other {
        Some(other) => {
          let fallback = other.actual_subscribe(Box::new(self.observer.clone()), self.scheduler.clone());
          self.subscription.set(fallback);
        }
        None => {
          self.subscription.set(Subscription::empty());
          self.observer.clone().error(RxError::Timeout);
        }
      }
    }
  }

  fn handle(&self) -> Subscription {
    Subscription::new(CompositeDisposable::from_iter([
      Subscription::new(self.subscription.clone()),
      Subscription::new(self.timer.clone()),
    ]))
  }
}

/// Switches to a fallback when `due` passes without a notification, or, for
/// an absolute due time, when the source has not terminated by then.
pub struct TimeoutOp<S, T> {
  pub(crate) source: S,
  pub(crate) due: Due,
  pub(crate) other: Option<BoxObservable<T>>,
  pub(crate) scheduler: Option<SchedulerRef>,
}

impl<S: Clone, T> Clone for TimeoutOp<S, T> {
  fn clone(&self) -> Self {
    TimeoutOp {
      source: self.source.clone(),
      due: self.due,
      other: self.other.clone(),
      scheduler: self.scheduler.clone(),
    }
  }
}

impl<S, T: Value> TimeoutOp<S, T> {
  /// Switch to `other` instead of erroring when the timer wins.
  pub fn with_fallback<O: Observable<Item = T>>(mut self, other: O) -> Self {
    self.other = Some(other.box_it());
    self
  }
}

impl<S: Observable> Observable for TimeoutOp<S, S::Item> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let race = Race::new(observer, self.other.clone(), scheduler.clone());
    let timed = TimedObserver { race: race.clone(), due: self.due, scheduler: timed_or(&self.scheduler, &scheduler) };
    let original = SingleAssignmentDisposable::new();
    race.subscription.set(Subscription::new(original.clone()));
    timed.arm();
    let _ = original.set(self.source.actual_subscribe(Box::new(timed), scheduler));
    race.handle()
  }
}

struct TimedObserver<T> {
  race: Arc<Race<T>>,
  due: Due,
  scheduler: SchedulerRef,
}

impl<T: Value> TimedObserver<T> {
  fn arm(&self) {
    let (id, race) = (self.race.current(), self.race.clone());
    let fire = move |_: &dyn crate::scheduler::Scheduler| race.switch(id);
    let timer = match self.due {
      Due::Relative(d) => self.scheduler.schedule_relative_fn(d, fire),
      Due::Absolute(at) => self.scheduler.schedule_absolute_fn(at, fire),
    };
    self.race.timer.set(timer);
  }
}

impl<T: Value> Observer<T> for TimedObserver<T> {
  fn next(&mut self, value: T) {
    if self.race.source_wins() {
      self.race.observer.clone().next(value);
      self.arm();
    }
  }

  fn error(&mut self, err: RxError) {
    if self.race.source_wins() {
      self.race.observer.clone().error(err);
    }
  }

  fn complete(&mut self) {
    if self.race.source_wins() {
      self.race.observer.clone().complete();
    }
  }

  fn is_finished(&self) -> bool { self.race.observer.is_finished() }
}

/// Timeout whose bounds are observables: `first` for the first value, then
/// the one `mapper` returns for each value. A bound ends on its first
/// notification; a bound that errors first forwards its error.
pub struct TimeoutWithMapperOp<S: Observable, N> {
  pub(crate) source: S,
  pub(crate) first: Arc<N>,
  pub(crate) mapper: DurationFn<S::Item>,
  pub(crate) other: Option<BoxObservable<S::Item>>,
}

impl<S: Observable + Clone, N> Clone for TimeoutWithMapperOp<S, N> {
  fn clone(&self) -> Self {
    TimeoutWithMapperOp {
      source: self.source.clone(),
      first: self.first.clone(),
      mapper: self.mapper.clone(),
      other: self.other.clone(),
    }
  }
}

impl<S: Observable, N: Observable> Observable for TimeoutWithMapperOp<S, N> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let race = Race::new(observer, self.other.clone(), scheduler.clone());
    let original = SingleAssignmentDisposable::new();
    race.subscription.set(Subscription::new(original.clone()));
    watch_bound(&race, &*self.first);
    let mapped = MappedObserver { race: race.clone(), mapper: self.mapper.clone() };
    let _ = original.set(self.source.actual_subscribe(Box::new(mapped), scheduler));
    race.handle()
  }
}

fn watch_bound<T: Value, O: Observable + ?Sized>(race: &Arc<Race<T>>, bound: &O) {
  let (id, this) = (race.current(), race.clone());
  let watch = watch_duration(bound, race.scheduler.clone(), move |err| match err {
    None => this.switch(id),
    Some(e) => {
      if this.timer_wins(id) {
        this.observer.clone().error(e);
      }
    }
  });
  race.timer.set(watch);
}

struct MappedObserver<T> {
  race: Arc<Race<T>>,
  mapper: DurationFn<T>,
}

impl<T: Value> Observer<T> for MappedObserver<T> {
  fn next(&mut self, value: T) {
    if !self.race.source_wins() {
      return;
    }
    let bound = guarded(|| (self.mapper)(&value));
    self.race.observer.clone().next(value);
    match bound {
      Ok(bound) => watch_bound(&self.race, &bound),
      Err(e) => {
        self.race.timer.set(Subscription::empty());
        self.race.observer.clone().error(e);
      }
    }
  }

  fn error(&mut self, err: RxError) {
    if self.race.source_wins() {
      self.race.observer.clone().error(err);
    }
  }

  fn complete(&mut self) {
    if self.race.source_wins() {
      self.race.observer.clone().complete();
    }
  }

  fn is_finished(&self) -> bool { self.race.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn in_time() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(150, 1),
      on_next(230, 2),
      on_next(260, 3),
      on_next(300, 4),
      on_next(350, 5),
      on_completed(400),
    ]);
    let results = scheduler.start_with_create(move || xs.timeout(Duration::from_millis(100)));
    assert_eq!(
      results.messages(),
      vec![on_next(230, 2), on_next(260, 3), on_next(300, 4), on_next(350, 5), on_completed(400)]
    );
  }

  #[rxrt_macro::test]
  fn switches_to_the_fallback() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(70, 1),
      on_next(130, 2),
      on_next(310, 3),
      on_next(400, 4),
      on_completed(500),
    ]);
    let ys = scheduler.create_cold_observable(vec![
      on_next(50, -1),
      on_next(200, -2),
      on_next(310, -3),
      on_completed(320),
    ]);
    let (source, other) = (xs.clone(), ys.clone());
    let results = scheduler.start_with_create(move || source.timeout_or(Duration::from_millis(100), other));
    assert_eq!(
      results.messages(),
      vec![on_next(350, -1), on_next(500, -2), on_next(610, -3), on_completed(620)]
    );
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 300)]);
    assert_eq!(ys.subscriptions(), vec![subscribe(300, 620)]);
  }

  #[rxrt_macro::test]
  fn default_fallback_errors() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(400, 2)]);
    let results = scheduler.start_with_create(move || xs.timeout(Duration::from_millis(50)));
    assert_eq!(results.messages(), vec![on_next(210, 1), on_error(260, RxError::Timeout)]);
  }

  #[rxrt_macro::test]
  fn absolute_deadline() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(310, 1), on_next(410, 2)]);
    let ys = scheduler.create_cold_observable(vec![on_next(100, -1)]);
    let source = xs.clone();
    let results = scheduler.start_with_create(move || {
      source.timeout_at(Instant::from_millis(400)).with_fallback(ys)
    });
    assert_eq!(results.messages(), vec![on_next(310, 1), on_next(500, -1)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 400)]);
  }

  #[rxrt_macro::test]
  fn mapper_bounds_each_value() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(310, 1),
      on_next(350, 2),
      on_next(420, 3),
      on_completed(450),
    ]);
    let ys = scheduler.create_cold_observable::<&str>(vec![on_next(200, "tick")]);
    let (first, bound) = (ys.clone(), ys.clone());
    let results = scheduler.start_with_create(move || xs.timeout_with_mapper(first, move |_| bound.clone(), None));
    assert_eq!(
      results.messages(),
      vec![on_next(310, 1), on_next(350, 2), on_next(420, 3), on_completed(450)]
    );
  }

  #[rxrt_macro::test]
  fn mapper_bound_elapses() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(310, 1), on_next(350, 2), on_next(500, 3)]);
    let zs = scheduler.create_cold_observable(vec![on_next(50, 42), on_completed(60)]);
    let results = scheduler.start_with_create(move || {
      xs.timeout_with_mapper(never::<()>(), |_| timer(Duration::from_millis(100)), Some(zs.box_it()))
    });
    assert_eq!(
      results.messages(),
      vec![on_next(310, 1), on_next(350, 2), on_next(500, 42), on_completed(510)]
    );
  }

  #[rxrt_macro::test]
  fn mapper_panic_errors() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(310, 1), on_next(350, 2)]);
    let results = scheduler.start_with_create(move || {
      xs.timeout_with_mapper(never::<()>(), |_| -> TimerObservable { panic!("no bound") }, None)
    });
    assert_eq!(results.messages(), vec![on_next(310, 1), on_error(310, RxError::Panic("no bound".into()))]);
  }
}
