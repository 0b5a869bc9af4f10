//! Operator implementations.
//!
//! Each operator is a struct wrapping its upstream; the matching method lives
//! on [`ObservableExt`](crate::observable::ObservableExt). Operators that run
//! user code guard every call: a panic becomes an `error` notification and
//! the operator stops forwarding.

pub mod amb;
pub mod catch;
pub mod combine_latest;
pub mod concat;
pub mod debounce;
pub mod delay;
pub mod delay_with_mapper;
pub mod distinct;
pub mod expand;
pub mod filter;
pub mod finalize;
pub mod first;
pub mod group_by;
pub mod group_join;
pub mod join;
pub mod last;
pub mod map;
pub mod materialize;
pub mod merge;
pub mod multicast;
pub mod observe_on;
pub mod reduce;
pub mod sample;
pub mod scan;
pub mod sequence_equal;
pub mod single;
pub mod skip;
pub mod subscribe_on;
pub mod switch_latest;
pub mod take;
pub mod take_until;
pub mod take_while;
pub mod tap;
pub mod throttle_first;
pub mod timeout;
pub mod to_future;
pub mod to_list;
pub mod to_marbles;
pub mod window;
pub mod window_count;
pub mod window_time;
pub mod with_latest_from;
pub mod zip;

pub use amb::AmbOp;
pub use catch::CatchOp;
pub use combine_latest::CombineLatestOp;
pub use concat::{ConcatMode, ConcatOp};
pub use debounce::{DebounceOp, ThrottleWithMapperOp};
pub use delay::{DelayOp, DelaySubscriptionOp};
pub use delay_with_mapper::DelayWithMapperOp;
pub use distinct::{DistinctOp, DistinctUntilChangedOp, SelfKey};
pub use expand::ExpandOp;
pub use filter::FilterOp;
pub use finalize::FinalizeOp;
pub use first::FirstOp;
pub use group_by::GroupByOp;
pub use group_join::GroupJoinOp;
pub use join::JoinOp;
pub use last::LastOp;
pub use map::{MapOp, TryMapOp};
pub use materialize::{DematerializeOp, MaterializeOp};
pub use merge::MergeOp;
pub use multicast::MulticastSelectorOp;
pub use observe_on::ObserveOnOp;
pub use reduce::ReduceOp;
pub use sample::SampleOp;
pub use scan::ScanOp;
pub use sequence_equal::SequenceEqualOp;
pub use single::SingleOp;
pub use skip::SkipOp;
pub use subscribe_on::SubscribeOnOp;
pub use switch_latest::SwitchLatestOp;
pub use take::TakeOp;
pub use take_until::TakeUntilOp;
pub use take_while::TakeWhileOp;
pub use tap::TapOp;
pub use throttle_first::ThrottleFirstOp;
pub use timeout::{TimeoutOp, TimeoutWithMapperOp};
pub use to_future::ToFuture;
pub use to_list::ToListOp;
pub use to_marbles::ToMarblesOp;
pub use window::{WindowOp, WindowWhenOp};
pub use window_count::WindowWithCountOp;
pub use window_time::{WindowWithTimeOp, WindowWithTimeOrCountOp};
pub use with_latest_from::WithLatestFromOp;
pub use zip::ZipOp;

use crate::{
  error::RxError,
  observable::{subscribe_detached, BoxObservable, Observable},
  observer::{BoxObserver, Observer},
  scheduler::{CurrentThreadScheduler, Duration, Instant, SchedulerRef, TimeoutScheduler},
  subject::Subject,
  subscription::{CompositeDisposable, Disposable, RefCountDisposable, SingleAssignmentDisposable, Subscription},
  Value,
};
use std::{
  panic::{catch_unwind, AssertUnwindSafe},
  sync::Arc,
};

pub type CountOp<S> = ReduceOp<S, usize, fn(usize, <S as crate::observable::Observable>::Item) -> usize>;

pub(crate) fn count_step<T>(n: usize, _: T) -> usize { n + 1 }

/// Maps a value to an observable whose first notification ends a duration.
pub type DurationFn<T> = Arc<dyn Fn(&T) -> BoxObservable<()> + Send + Sync>;

/// Relative or absolute due time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Due {
  Relative(Duration),
  Absolute(Instant),
}

/// Tags values of two differently typed sources merged into one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Either<A, B> {
  Left(A),
  Right(B),
}

impl<A, B> Either<A, B> {
  /// Split a `[Left, Right]` pair as produced by `zip` or `combine_latest`
  /// over exactly two tagged sources.
  pub(crate) fn split_pair(pair: Vec<Either<A, B>>) -> Result<(A, B), RxError> {
    let mut it = pair.into_iter();
    match (it.next(), it.next()) {
      (Some(Either::Left(a)), Some(Either::Right(b))) => Ok((a, b)),
      _ => Err(RxError::msg("expected a left and a right value")),
    }
  }
}

/// Run user code, turning a panic into an error.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, RxError> {
  catch_unwind(AssertUnwindSafe(f)).map_err(|p| RxError::from_panic(p.as_ref()))
}

/// Scheduler for work that should happen as soon as possible: the
/// operator's own, else the subscription's, else the current thread.
pub(crate) fn current_or(own: &Option<SchedulerRef>, subscribed: &Option<SchedulerRef>) -> SchedulerRef {
  own
    .clone()
    .or_else(|| subscribed.clone())
    .unwrap_or_else(|| Arc::new(CurrentThreadScheduler))
}

/// Scheduler for timed work: the operator's own, else the subscription's,
/// else the shared timeout scheduler.
pub(crate) fn timed_or(own: &Option<SchedulerRef>, subscribed: &Option<SchedulerRef>) -> SchedulerRef {
  own.clone().or_else(|| subscribed.clone()).unwrap_or_else(|| Arc::new(TimeoutScheduler))
}

type EndFn = Box<dyn FnOnce(Option<RxError>) + Send>;

/// Watches a duration observable: its first `next` or its `complete` ends
/// the duration with `None`, an `error` ends it with the error. Ending also
/// releases the watch subscription.
struct DurationObserver {
  end: Option<EndFn>,
  slot: SingleAssignmentDisposable,
}

impl DurationObserver {
  fn finish(&mut self, err: Option<RxError>) {
    if let Some(end) = self.end.take() {
      self.slot.dispose();
      end(err)
    }
  }
}

impl<T> Observer<T> for DurationObserver {
  fn next(&mut self, _: T) { self.finish(None) }

  fn error(&mut self, err: RxError) { self.finish(Some(err)) }

  fn complete(&mut self) { self.finish(None) }

  fn is_finished(&self) -> bool { self.end.is_none() }
}

/// Subscribe to `duration` and call `on_end` once it ends.
pub(crate) fn watch_duration<O, F>(duration: &O, scheduler: Option<SchedulerRef>, on_end: F) -> Subscription
where
  O: Observable + ?Sized,
  F: FnOnce(Option<RxError>) + Send + 'static,
{
  let slot = SingleAssignmentDisposable::new();
  let watcher = DurationObserver { end: Some(Box::new(on_end)), slot: slot.clone() };
  let sub = subscribe_detached(duration, Box::new(watcher), scheduler);
  // A duration that ended while subscribing finds the slot pre-disposed.
  let _ = slot.set(sub.clone());
  sub
}

/// [`watch_duration`] with the watch held in `group` until the duration
/// ends, then dropped from it.
pub(crate) fn watch_in<F>(
  group: &CompositeDisposable, duration: &BoxObservable<()>, scheduler: Option<SchedulerRef>, on_end: F,
) where
  F: FnOnce(Option<RxError>) + Send + 'static,
{
  let slot = SingleAssignmentDisposable::new();
  let handle = Subscription::new(slot.clone());
  group.add(handle.clone());
  let members = group.clone();
  let _ = slot.set(watch_duration(duration, scheduler, move |err| {
    on_end(err);
    members.remove(&handle);
  }));
}

/// A subject handed downstream as a window or group. Each subscription to
/// it holds a lease on the operator's upstream subscription, so the source
/// stays subscribed while someone still listens to an emitted window.
pub(crate) struct Leased<T> {
  subject: Subject<T>,
  leases: RefCountDisposable,
}

impl<T: Value> Leased<T> {
  pub(crate) fn boxed(subject: Subject<T>, leases: RefCountDisposable) -> BoxObservable<T> {
    BoxObservable::new(Leased { subject, leases })
  }
}

impl<T: Value> Observable for Leased<T> {
  type Item = T;

  fn actual_subscribe(&self, observer: BoxObserver<T>, scheduler: Option<SchedulerRef>) -> Subscription {
    let lease = self.leases.lease();
    let inner = self.subject.actual_subscribe(observer, scheduler);
    Subscription::from_fn(move || {
      inner.dispose();
      lease.dispose();
    })
  }
}

macro_rules! impl_with_scheduler {
  ($($name:ident<$($g:ident),*>),* $(,)?) => {
    $(
      impl<$($g),*> $name<$($g),*> {
        /// Run this operator's scheduled work on `scheduler`.
        pub fn with_scheduler(mut self, scheduler: crate::scheduler::SchedulerRef) -> Self {
          self.scheduler = Some(scheduler);
          self
        }
      }
    )*
  };
}
pub(crate) use impl_with_scheduler;

impl_with_scheduler!(
  DebounceOp<S>,
  DelayOp<S>,
  DelaySubscriptionOp<S>,
  TimeoutOp<S, T>,
  ThrottleFirstOp<S>,
  WindowWithTimeOp<S>,
  WindowWithTimeOrCountOp<S>,
  ToMarblesOp<S>,
);
