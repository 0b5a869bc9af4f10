//! Sequential composition: `concat`, `catch` over a list of sources,
//! `on_error_resume_next`, and the `repeat`/`retry` family built on them.
//!
//! The step to the next source always goes through the current-thread
//! trampoline, so a long chain of synchronously completing sources runs in
//! a loop instead of nesting subscribe calls.

use crate::{
  error::RxError,
  observable::{BoxObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  scheduler::{CurrentThreadScheduler, SchedulerExt, SchedulerRef},
  subscription::{BooleanDisposable, CompositeDisposable, Disposable, SerialDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// What ends the current source and moves on to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatMode {
  /// Completion moves on; an error stops.
  Concat,
  /// An error moves on; completion stops. Running out of sources reports
  /// the last error.
  Catch,
  /// Both move on.
  ResumeNext,
}

#[derive(Clone)]
enum Sources<T> {
  List(Vec<BoxObservable<T>>),
  Repeat(BoxObservable<T>, Option<usize>),
}

impl<T> Sources<T> {
  fn get(&self, i: usize) -> Option<BoxObservable<T>> {
    match self {
      Sources::List(list) => list.get(i).cloned(),
      Sources::Repeat(source, times) => times.map_or(true, |n| i < n).then(|| source.clone()),
    }
  }
}

/// Subscribe to `sources` one after another, each once the previous
/// completes.
pub fn concat<T: Value>(sources: Vec<BoxObservable<T>>) -> ConcatOp<T> {
  ConcatOp { sources: Sources::List(sources), mode: ConcatMode::Concat }
}

/// Subscribe to the next source whenever the current one errors.
pub fn catch<T: Value>(sources: Vec<BoxObservable<T>>) -> ConcatOp<T> {
  ConcatOp { sources: Sources::List(sources), mode: ConcatMode::Catch }
}

/// Subscribe to the next source whenever the current one terminates.
pub fn on_error_resume_next<T: Value>(sources: Vec<BoxObservable<T>>) -> ConcatOp<T> {
  ConcatOp { sources: Sources::List(sources), mode: ConcatMode::ResumeNext }
}

#[derive(Clone)]
pub struct ConcatOp<T> {
  sources: Sources<T>,
  mode: ConcatMode,
}

impl<T: Value> ConcatOp<T> {
  /// `source` subscribed up to `times` times, forever when `None`.
  pub fn repeated(source: BoxObservable<T>, times: Option<usize>, mode: ConcatMode) -> Self {
    ConcatOp { sources: Sources::Repeat(source, times), mode }
  }
}

struct Chain<T> {
  sources: Sources<T>,
  mode: ConcatMode,
  index: Mutex<usize>,
  last_error: Mutex<Option<RxError>>,
  observer: SharedObserver<T>,
  current: SerialDisposable,
  pending: SerialDisposable,
  disposed: BooleanDisposable,
  scheduler: Option<SchedulerRef>,
}

impl<T: Value> Chain<T> {
  fn schedule_next(self: &Arc<Self>) {
    let this = self.clone();
    self.pending.set(CurrentThreadScheduler.schedule_fn(move |_| this.subscribe_next()));
  }

  fn subscribe_next(self: &Arc<Self>) {
    if self.disposed.is_disposed() {
      return;
    }
    let next = {
      let mut index = self.index.lock();
      let next = self.sources.get(*index);
      *index += 1;
      next
    };
    match next {
      Some(source) => {
        let link = Link { chain: self.clone() };
        self.current.set(source.actual_subscribe(Box::new(link), self.scheduler.clone()));
      }
      None => {
        let last = self.last_error.lock().take();
        let mut observer = self.observer.clone();
        match last {
          Some(e) => observer.error(e),
          None => observer.complete(),
        }
      }
    }
  }
}

impl<T: Value> Observable for ConcatOp<T> {
  type Item = T;

  fn actual_subscribe(&self, observer: BoxObserver<T>, scheduler: Option<SchedulerRef>) -> Subscription {
    let chain = Arc::new(Chain {
      sources: self.sources.clone(),
      mode: self.mode,
      index: Mutex::new(0),
      last_error: Mutex::new(None),
      observer: SharedObserver::from_box(observer),
      current: SerialDisposable::new(),
      pending: SerialDisposable::new(),
      disposed: BooleanDisposable::new(),
      scheduler,
    });
    chain.schedule_next();
    let (current, pending) = (chain.current.clone(), chain.pending.clone());
    Subscription::new(CompositeDisposable::from_iter([
      Subscription::from_fn(move || chain.disposed.dispose()),
      Subscription::new(current),
      Subscription::new(pending),
    ]))
  }
}

struct Link<T> {
  chain: Arc<Chain<T>>,
}

impl<T: Value> Observer<T> for Link<T> {
  fn next(&mut self, value: T) { self.chain.observer.clone().next(value) }

  fn error(&mut self, err: RxError) {
    match self.chain.mode {
      ConcatMode::Concat => self.chain.observer.clone().error(err),
      ConcatMode::Catch => {
        *self.chain.last_error.lock() = Some(err);
        self.chain.schedule_next();
      }
      ConcatMode::ResumeNext => self.chain.schedule_next(),
    }
  }

  fn complete(&mut self) {
    match self.chain.mode {
      ConcatMode::Catch => self.chain.observer.clone().complete(),
      ConcatMode::Concat | ConcatMode::ResumeNext => self.chain.schedule_next(),
    }
  }

  fn is_finished(&self) -> bool { self.chain.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::*};
  use parking_lot::Mutex;
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  #[rxrt_macro::test]
  fn concat_subscribes_in_turn() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_cold_observable(vec![on_next(10, 1), on_completed(30)]);
    let ys = scheduler.create_cold_observable(vec![on_next(10, 2), on_completed(20)]);
    let (a, b) = (xs.clone(), ys.clone());
    let results = scheduler.start_with_create(move || a.concat_with(b));
    assert_eq!(results.messages(), vec![on_next(210, 1), on_next(240, 2), on_completed(250)]);
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 230)]);
    assert_eq!(ys.subscriptions(), vec![subscribe(230, 250)]);
  }

  #[rxrt_macro::test]
  fn concat_stops_at_an_error() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_cold_observable(vec![on_next(10, 1), on_error(20, "boom")]);
    let ys = scheduler.create_cold_observable(vec![on_next(10, 2), on_completed(20)]);
    let other = ys.clone();
    let results = scheduler.start_with_create(move || xs.concat_with(other));
    assert_eq!(results.messages(), vec![on_next(210, 1), on_error(220, "boom")]);
    assert!(ys.subscriptions().is_empty());
  }

  #[rxrt_macro::test]
  fn retry_n_resubscribes_then_gives_up() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_cold_observable(vec![on_next(5, 1), on_next(10, 2), on_error(20, "boom")]);
    let source = xs.clone();
    let results = scheduler.start_with_create(move || source.retry_n(3));
    assert_eq!(
      results.messages(),
      vec![
        on_next(205, 1),
        on_next(210, 2),
        on_next(225, 1),
        on_next(230, 2),
        on_next(245, 1),
        on_next(250, 2),
        on_error(260, "boom"),
      ]
    );
    assert_eq!(xs.subscriptions(), vec![subscribe(200, 220), subscribe(220, 240), subscribe(240, 260)]);
  }

  #[rxrt_macro::test]
  fn retry_until_success() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let flaky = defer(move || {
      if counter.fetch_add(1, Ordering::SeqCst) < 2 {
        throw::<i32>("flaky").box_it()
      } else {
        of([7]).box_it()
      }
    });
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    flaky.retry().subscribe(move |v| s.lock().push(v));
    assert_eq!(*seen.lock(), vec![7]);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
  }

  #[rxrt_macro::test]
  fn repeat_n_runs_again_on_completion() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_cold_observable(vec![on_next(10, 1), on_completed(20)]);
    let results = scheduler.start_with_create(move || xs.repeat_n(2));
    assert_eq!(results.messages(), vec![on_next(210, 1), on_next(230, 1), on_completed(240)]);
  }

  #[rxrt_macro::test]
  fn catch_list_reports_the_last_error() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_cold_observable(vec![on_next(10, 1), on_error(20, "first")]);
    let ys = scheduler.create_cold_observable(vec![on_next(10, 2), on_error(20, "second")]);
    let results = scheduler.start_with_create(move || catch(vec![xs.box_it(), ys.box_it()]));
    assert_eq!(results.messages(), vec![on_next(210, 1), on_next(230, 2), on_error(240, "second")]);
  }

  #[rxrt_macro::test]
  fn resume_next_ignores_how_sources_end() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_cold_observable(vec![on_next(10, 1), on_error(20, "boom")]);
    let b = scheduler.create_cold_observable(vec![on_next(10, 2), on_completed(20)]);
    let c = scheduler.create_cold_observable(vec![on_next(10, 3), on_completed(20)]);
    let results =
      scheduler.start_with_create(move || on_error_resume_next(vec![a.box_it(), b.box_it(), c.box_it()]));
    assert_eq!(
      results.messages(),
      vec![on_next(210, 1), on_next(230, 2), on_next(250, 3), on_completed(260)]
    );
  }

  #[rxrt_macro::test]
  fn long_synchronous_chains_do_not_nest() {
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    of([1]).repeat_n(10_000).count().subscribe(move |v| s.lock().push(v));
    assert_eq!(*seen.lock(), vec![10_000]);
  }

  #[rxrt_macro::test]
  fn start_with_prepends() {
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    of([3, 4]).start_with(vec![1, 2]).subscribe(move |v| s.lock().push(v));
    assert_eq!(*seen.lock(), vec![1, 2, 3, 4]);
  }

  #[rxrt_macro::test]
  fn bench() { do_bench(); }

  bencher::benchmark_group!(do_bench, bench_repeat);

  fn bench_repeat(b: &mut bencher::Bencher) { b.iter(long_synchronous_chains_do_not_nest); }
}
