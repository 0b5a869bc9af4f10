use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::timed_or,
  scheduler::{Duration, Instant, SchedulerRef},
  subscription::Subscription,
};

/// Emits a value, then drops every value arriving within `window` of it.
pub struct ThrottleFirstOp<S> {
  pub(crate) source: S,
  pub(crate) window: Duration,
  pub(crate) scheduler: Option<SchedulerRef>,
}

impl<S: Clone> Clone for ThrottleFirstOp<S> {
  fn clone(&self) -> Self {
    ThrottleFirstOp { source: self.source.clone(), window: self.window, scheduler: self.scheduler.clone() }
  }
}

impl<S: Observable> Observable for ThrottleFirstOp<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let throttle = ThrottleFirstObserver {
      observer,
      window: self.window,
      clock: timed_or(&self.scheduler, &scheduler),
      last: None,
    };
    self.source.actual_subscribe(Box::new(throttle), scheduler)
  }
}

struct ThrottleFirstObserver<O> {
  observer: O,
  window: Duration,
  clock: SchedulerRef,
  last: Option<Instant>,
}

impl<T, O: Observer<T>> Observer<T> for ThrottleFirstObserver<O> {
  fn next(&mut self, value: T) {
    let now = self.clock.now();
    let open = self.last.map_or(true, |last| now - last >= self.window);
    if open {
      self.last = Some(now);
      self.observer.next(value);
    }
  }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};

  #[rxrt_macro::test]
  fn drops_values_inside_the_window() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![
      on_next(150, 1),
      on_next(210, 2),
      on_next(250, 3),
      on_next(310, 4),
      on_next(350, 5),
      on_next(410, 6),
      on_next(450, 7),
      on_completed(500),
    ]);
    let results = scheduler.start_with_create(move || xs.throttle_first(Duration::from_millis(200)));
    assert_eq!(results.messages(), vec![on_next(210, 2), on_next(410, 6), on_completed(500)]);
  }

  #[rxrt_macro::test]
  fn error_passes_through() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable(vec![on_next(210, 2), on_next(250, 3), on_error(300, "boom")]);
    let results = scheduler.start_with_create(move || xs.throttle_first(Duration::from_millis(200)));
    assert_eq!(results.messages(), vec![on_next(210, 2), on_error(300, "boom")]);
  }
}
