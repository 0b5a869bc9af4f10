use crate::{
  error::RxError,
  observable::{BoxObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  ops::Leased,
  scheduler::SchedulerRef,
  subject::Subject,
  subscription::{RefCountDisposable, SingleAssignmentDisposable, Subscription},
  Value,
};
use std::collections::VecDeque;

/// Windows of `count` values, a new one starting every `skip` values.
/// Either being zero is an [`RxError::ArgumentOutOfRange`] error.
#[derive(Clone)]
pub struct WindowWithCountOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
  pub(crate) skip: usize,
}

impl<S: Observable> Observable for WindowWithCountOp<S> {
  type Item = BoxObservable<S::Item>;

  fn actual_subscribe(
    &self, mut observer: BoxObserver<BoxObservable<S::Item>>, scheduler: Option<SchedulerRef>,
  ) -> Subscription {
    if self.count == 0 || self.skip == 0 {
      observer.error(RxError::out_of_range("window count and skip must be positive"));
      return Subscription::empty();
    }
    let upstream = SingleAssignmentDisposable::new();
    let leases = RefCountDisposable::new(Subscription::new(upstream.clone()));
    let mut windows = CountObserver {
      windows: VecDeque::new(),
      seen: 0,
      count: self.count,
      skip: self.skip,
      observer: SharedObserver::from_box(observer),
      leases: leases.clone(),
    };
    windows.open();
    let _ = upstream.set(self.source.actual_subscribe(Box::new(windows), scheduler));
    Subscription::new(leases)
  }
}

struct CountObserver<T> {
  windows: VecDeque<Subject<T>>,
  seen: usize,
  count: usize,
  skip: usize,
  observer: SharedObserver<BoxObservable<T>>,
  leases: RefCountDisposable,
}

impl<T: Value> CountObserver<T> {
  fn open(&mut self) {
    let window = Subject::new();
    self.windows.push_back(window.clone());
    self.observer.next(Leased::boxed(window, self.leases.clone()));
  }

  fn drain(&mut self) -> Vec<Subject<T>> { self.windows.drain(..).collect() }
}

impl<T: Value> Observer<T> for CountObserver<T> {
  fn next(&mut self, value: T) {
    for w in &self.windows {
      w.next(value.clone());
    }
    // Index of the value that fills the oldest window, if it is a full one.
    if self.seen + 1 >= self.count && (self.seen + 1 - self.count) % self.skip == 0 {
      if let Some(w) = self.windows.pop_front() {
        w.complete();
      }
    }
    self.seen += 1;
    if self.seen % self.skip == 0 {
      self.open();
    }
  }

  fn error(&mut self, err: RxError) {
    for w in self.drain() {
      w.error(err.clone());
    }
    self.observer.error(err);
  }

  fn complete(&mut self) {
    for w in self.drain() {
      w.complete();
    }
    self.observer.complete();
  }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}
