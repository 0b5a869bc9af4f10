use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::timed_or,
  scheduler::{Duration, Instant, SchedulerRef},
  subscription::Subscription,
  testing::MARBLE_FRAME,
};
use std::fmt::{Display, Write};

/// Records the source as a marble diagram and emits it once the source
/// terminates: one `-` per elapsed frame before each event, `#` for an
/// error, `|` for completion.
#[derive(Clone)]
pub struct ToMarblesOp<S> {
  pub(crate) source: S,
  pub(crate) scheduler: Option<SchedulerRef>,
}

impl<S> Observable for ToMarblesOp<S>
where
  S: Observable,
  S::Item: Display,
{
  type Item = String;

  fn actual_subscribe(&self, observer: BoxObserver<String>, scheduler: Option<SchedulerRef>) -> Subscription {
    let clock = timed_or(&self.scheduler, &scheduler);
    let recorder = Recorder { last: clock.now(), clock, diagram: String::new(), observer };
    self.source.actual_subscribe(Box::new(recorder), scheduler)
  }
}

struct Recorder {
  clock: SchedulerRef,
  last: Instant,
  diagram: String,
  observer: BoxObserver<String>,
}

impl Recorder {
  fn elapse(&mut self) {
    let now = self.clock.now();
    let frame = Duration::from_millis(MARBLE_FRAME).as_nanos();
    let frames = ((now - self.last).as_nanos() + frame / 2) / frame;
    self.last = now;
    self.diagram.extend(std::iter::repeat('-').take(frames as usize));
  }

  fn finish(&mut self, end: char) {
    self.elapse();
    self.diagram.push(end);
    self.observer.next(std::mem::take(&mut self.diagram));
    self.observer.complete();
  }
}

impl<T: Display> Observer<T> for Recorder {
  fn next(&mut self, value: T) {
    self.elapse();
    let text = value.to_string();
    if text.chars().count() > 1 {
      let _ = write!(self.diagram, "({text})");
    } else {
      self.diagram.push_str(&text);
    }
  }

  fn error(&mut self, _: RxError) { self.finish('#') }

  fn complete(&mut self) { self.finish('|') }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}
