//! Time-driven windows.
//!
//! Every window is a [`Subject`] handed downstream through a lease on the
//! operator's subscription, so the source stays subscribed while an emitted
//! window still has listeners even after the outer stream was disposed.

use crate::{
  error::RxError,
  observable::{BoxObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  ops::{timed_or, Leased},
  scheduler::{Duration, SchedulerExt, SchedulerRef},
  subject::Subject,
  subscription::{CompositeDisposable, RefCountDisposable, SerialDisposable, SingleAssignmentDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

/// Windows opened every `shift` and closed `span` after opening.
pub struct WindowWithTimeOp<S> {
  pub(crate) source: S,
  pub(crate) span: Duration,
  pub(crate) shift: Duration,
  pub(crate) scheduler: Option<SchedulerRef>,
}

impl<S: Clone> Clone for WindowWithTimeOp<S> {
  fn clone(&self) -> Self {
    WindowWithTimeOp { source: self.source.clone(), span: self.span, shift: self.shift, scheduler: self.scheduler.clone() }
  }
}

struct Schedule {
  next_span: Duration,
  next_shift: Duration,
  total: Duration,
}

struct TimeWindows<T> {
  windows: Mutex<VecDeque<Subject<T>>>,
  schedule: Mutex<Schedule>,
  shift: Duration,
  observer: SharedObserver<BoxObservable<T>>,
  leases: RefCountDisposable,
  timer: SerialDisposable,
  scheduler: SchedulerRef,
}

impl<T: Value> TimeWindows<T> {
  fn open(&self) {
    let window = Subject::new();
    self.windows.lock().push_back(window.clone());
    self.observer.clone().next(Leased::boxed(window, self.leases.clone()));
  }

  fn create_timer(self: &Arc<Self>) {
    let (wait, is_span, is_shift) = {
      let mut s = self.schedule.lock();
      let (is_span, is_shift) = match s.next_span.cmp(&s.next_shift) {
        std::cmp::Ordering::Equal => (true, true),
        std::cmp::Ordering::Less => (true, false),
        std::cmp::Ordering::Greater => (false, true),
      };
      let total = if is_span { s.next_span } else { s.next_shift };
      let wait = total - s.total;
      s.total = total;
      if is_span {
        s.next_span += self.shift;
      }
      if is_shift {
        s.next_shift += self.shift;
      }
      (wait, is_span, is_shift)
    };
    let slot = SingleAssignmentDisposable::new();
    self.timer.set(Subscription::new(slot.clone()));
    let this = self.clone();
    let _ = slot.set(self.scheduler.schedule_relative_fn(wait, move |_| {
      if is_shift {
        this.open();
      }
      if is_span {
        let closing = this.windows.lock().pop_front();
        if let Some(w) = closing {
          w.complete();
        }
      }
      this.create_timer();
    }));
  }
}

impl<S: Observable> Observable for WindowWithTimeOp<S> {
  type Item = BoxObservable<S::Item>;

  fn actual_subscribe(
    &self, observer: BoxObserver<BoxObservable<S::Item>>, scheduler: Option<SchedulerRef>,
  ) -> Subscription {
    let mut observer = observer;
    if self.span.is_zero() || self.shift.is_zero() {
      observer.error(RxError::out_of_range("window span and shift must be positive"));
      return Subscription::empty();
    }
    let timer = SerialDisposable::new();
    let group = CompositeDisposable::from_iter([Subscription::new(timer.clone())]);
    let windows = Arc::new(TimeWindows {
      windows: Mutex::new(VecDeque::new()),
      schedule: Mutex::new(Schedule { next_span: self.span, next_shift: self.shift, total: Duration::ZERO }),
      shift: self.shift,
      observer: SharedObserver::from_box(observer),
      leases: RefCountDisposable::new(Subscription::new(group.clone())),
      timer,
      scheduler: timed_or(&self.scheduler, &scheduler),
    });
    windows.open();
    windows.create_timer();
    let upstream = self.source.actual_subscribe(Box::new(TimeWindowObserver(windows.clone())), scheduler);
    group.add(upstream);
    Subscription::new(windows.leases.clone())
  }
}

struct TimeWindowObserver<T>(Arc<TimeWindows<T>>);

impl<T: Value> Observer<T> for TimeWindowObserver<T> {
  fn next(&mut self, value: T) {
    let open: Vec<_> = self.0.windows.lock().iter().cloned().collect();
    for w in open {
      w.next(value.clone());
    }
  }

  fn error(&mut self, err: RxError) {
    let open: Vec<_> = self.0.windows.lock().drain(..).collect();
    for w in open {
      w.error(err.clone());
    }
    self.0.observer.clone().error(err);
  }

  fn complete(&mut self) {
    let open: Vec<_> = self.0.windows.lock().drain(..).collect();
    for w in open {
      w.complete();
    }
    self.0.observer.clone().complete();
  }

  fn is_finished(&self) -> bool { self.0.observer.is_finished() }
}

/// Windows closed after `span` or after `count` values, whichever happens
/// first; closing one opens the next.
pub struct WindowWithTimeOrCountOp<S> {
  pub(crate) source: S,
  pub(crate) span: Duration,
  pub(crate) count: usize,
  pub(crate) scheduler: Option<SchedulerRef>,
}

impl<S: Clone> Clone for WindowWithTimeOrCountOp<S> {
  fn clone(&self) -> Self {
    WindowWithTimeOrCountOp {
      source: self.source.clone(),
      span: self.span,
      count: self.count,
      scheduler: self.scheduler.clone(),
    }
  }
}

struct Current<T> {
  window: Subject<T>,
  seen: usize,
  id: u64,
}

struct CountWindows<T> {
  current: Mutex<Current<T>>,
  span: Duration,
  count: usize,
  observer: SharedObserver<BoxObservable<T>>,
  leases: RefCountDisposable,
  timer: SerialDisposable,
  scheduler: SchedulerRef,
}

impl<T: Value> CountWindows<T> {
  /// Swap in a fresh window; returns the closed one and the new id.
  fn roll(current: &mut Current<T>) -> (Subject<T>, Subject<T>, u64) {
    let fresh = Subject::new();
    let closed = std::mem::replace(&mut current.window, fresh.clone());
    current.seen = 0;
    current.id += 1;
    (closed, fresh, current.id)
  }

  fn emit(&self, closed: Subject<T>, fresh: Subject<T>) {
    closed.complete();
    self.observer.clone().next(Leased::boxed(fresh, self.leases.clone()));
  }

  fn create_timer(self: &Arc<Self>, id: u64) {
    let slot = SingleAssignmentDisposable::new();
    self.timer.set(Subscription::new(slot.clone()));
    let this = self.clone();
    let _ = slot.set(self.scheduler.schedule_relative_fn(self.span, move |_| {
      let rolled = {
        let mut current = this.current.lock();
        if current.id != id {
          return;
        }
        Self::roll(&mut current)
      };
      let (closed, fresh, next_id) = rolled;
      this.emit(closed, fresh);
      this.create_timer(next_id);
    }));
  }
}

impl<S: Observable> Observable for WindowWithTimeOrCountOp<S> {
  type Item = BoxObservable<S::Item>;

  fn actual_subscribe(
    &self, observer: BoxObserver<BoxObservable<S::Item>>, scheduler: Option<SchedulerRef>,
  ) -> Subscription {
    let mut observer = observer;
    if self.count == 0 {
      observer.error(RxError::out_of_range("window count must be positive"));
      return Subscription::empty();
    }
    if self.span.is_zero() {
      observer.error(RxError::out_of_range("window span must be positive"));
      return Subscription::empty();
    }
    let timer = SerialDisposable::new();
    let group = CompositeDisposable::from_iter([Subscription::new(timer.clone())]);
    let first = Subject::new();
    let windows = Arc::new(CountWindows {
      current: Mutex::new(Current { window: first.clone(), seen: 0, id: 0 }),
      span: self.span,
      count: self.count,
      observer: SharedObserver::from_box(observer),
      leases: RefCountDisposable::new(Subscription::new(group.clone())),
      timer,
      scheduler: timed_or(&self.scheduler, &scheduler),
    });
    windows.observer.clone().next(Leased::boxed(first, windows.leases.clone()));
    windows.create_timer(0);
    let upstream = self.source.actual_subscribe(Box::new(CountWindowObserver(windows.clone())), scheduler);
    group.add(upstream);
    Subscription::new(windows.leases.clone())
  }
}

struct CountWindowObserver<T>(Arc<CountWindows<T>>);

impl<T: Value> Observer<T> for CountWindowObserver<T> {
  fn next(&mut self, value: T) {
    let (window, rolled) = {
      let mut current = self.0.current.lock();
      let window = current.window.clone();
      current.seen += 1;
      let rolled = (current.seen == self.0.count).then(|| CountWindows::roll(&mut current));
      (window, rolled)
    };
    window.next(value);
    if let Some((closed, fresh, id)) = rolled {
      self.0.emit(closed, fresh);
      self.0.create_timer(id);
    }
  }

  fn error(&mut self, err: RxError) {
    let window = self.0.current.lock().window.clone();
    window.error(err.clone());
    self.0.observer.clone().error(err);
  }

  fn complete(&mut self) {
    let window = self.0.current.lock().window.clone();
    window.complete();
    self.0.observer.clone().complete();
  }

  fn is_finished(&self) -> bool { self.0.observer.is_finished() }
}
