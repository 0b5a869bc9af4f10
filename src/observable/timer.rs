//! `timer`, `timer_at`, `timer_periodic` and `interval`.

use super::Observable;
use crate::{
  observer::{BoxObserver, Observer},
  ops::{timed_or, Due},
  scheduler::{Duration, Instant, Scheduler, SchedulerRef},
  subscription::{SerialDisposable, Subscription},
};

/// Emits `0` at its due time, then `1, 2, ...` every period if it has one.
#[derive(Clone)]
pub struct TimerObservable {
  due: Due,
  period: Option<Duration>,
  scheduler: Option<SchedulerRef>,
}

/// Emit `0` after `due`, then complete.
pub fn timer(due: Duration) -> TimerObservable {
  TimerObservable { due: Due::Relative(due), period: None, scheduler: None }
}

/// Emit `0` at the absolute time `at`, then complete.
pub fn timer_at(at: Instant) -> TimerObservable {
  TimerObservable { due: Due::Absolute(at), period: None, scheduler: None }
}

/// Emit `0` after `due`, then a counter every `period`.
pub fn timer_periodic(due: Duration, period: Duration) -> TimerObservable {
  TimerObservable { due: Due::Relative(due), period: Some(period), scheduler: None }
}

/// Emit `0, 1, 2, ...` every `period`, starting one period from now.
pub fn interval(period: Duration) -> TimerObservable { timer_periodic(period, period) }

fn schedule_due(scheduler: &dyn Scheduler, due: Due, action: crate::scheduler::Action) -> Subscription {
  match due {
    Due::Relative(d) => scheduler.schedule_relative(d, action),
    Due::Absolute(at) => scheduler.schedule_absolute(at, action),
  }
}

impl Observable for TimerObservable {
  type Item = u64;

  fn actual_subscribe(&self, mut observer: BoxObserver<u64>, scheduler: Option<SchedulerRef>) -> Subscription {
    let scheduler = timed_or(&self.scheduler, &scheduler);
    match self.period {
      None => schedule_due(
        &*scheduler,
        self.due,
        Box::new(move |_| {
          observer.next(0);
          observer.complete();
          Subscription::empty()
        }),
      ),
      Some(period) if self.due == Due::Relative(period) => {
        let mut count = 0;
        scheduler.schedule_periodic(
          period,
          Box::new(move || {
            observer.next(count);
            count += 1;
          }),
        )
      }
      Some(period) => {
        let serial = SerialDisposable::new();
        let inner = serial.clone();
        let first = schedule_due(
          &*scheduler,
          self.due,
          Box::new(move |s| {
            observer.next(0);
            let mut count = 1;
            let periodic = s.schedule_periodic(
              period,
              Box::new(move || {
                observer.next(count);
                count += 1;
              }),
            );
            inner.set(periodic);
            Subscription::empty()
          }),
        );
        // The first tick may already have replaced this handle.
        if serial.get().is_none() {
          serial.set(first);
        }
        Subscription::new(serial)
      }
    }
  }
}

impl TimerObservable {
  /// Run the timer on `scheduler` instead of the subscription's scheduler.
  pub fn with_scheduler(mut self, scheduler: SchedulerRef) -> Self {
    self.scheduler = Some(scheduler);
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{scheduler::TestScheduler, testing::*};

  #[rxrt_macro::test]
  fn one_shot_timer() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| timer(Duration::from_millis(300)));
    assert_eq!(results.messages(), vec![on_next(500, 0), on_completed(500)]);
  }

  #[rxrt_macro::test]
  fn absolute_timer_in_the_past_fires_next_tick() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| timer_at(Instant::from_millis(10)));
    assert_eq!(results.messages(), vec![on_next(201, 0), on_completed(201)]);
  }

  #[rxrt_macro::test]
  fn interval_until_disposed() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_create(|| interval(Duration::from_millis(100)));
    let expected: Vec<_> = (0..7).map(|i| on_next(300 + i * 100, i)).collect();
    assert_eq!(results.messages(), expected);
  }

  #[rxrt_macro::test]
  fn due_then_period() {
    let scheduler = TestScheduler::new();
    let results = scheduler.start_with_timing(
      || timer_periodic(Duration::from_millis(50), Duration::from_millis(100)),
      100,
      200,
      500,
    );
    assert_eq!(results.messages(), vec![on_next(250, 0), on_next(350, 1), on_next(450, 2)]);
  }
}
