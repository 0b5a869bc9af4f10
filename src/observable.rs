//! Observables and the subscribe path.
//!
//! An [`Observable`] is a cold factory: every subscription runs the producer
//! again unless a subject or a multicasting operator sits in between.
//! Operators live on [`ObservableExt`] and consume `self`, returning a new
//! observable that wraps the old one.

use crate::{
  error::{RxError, RxResult},
  notification::Notification,
  observer::{AutoDetachObserver, BoxObserver, FnObserver, Observer},
  ops::*,
  scheduler::{trampoline, Duration, Instant, SchedulerRef},
  subject::{BehaviorSubject, ReplaySubject, Subject, SubjectLike},
  subscription::{SingleAssignmentDisposable, Subscription},
  Value,
};
use std::sync::Arc;

mod boxed;
mod connectable;
mod create;
mod from_iter;
mod generate;
mod grouped;
mod marbles;
mod timer;

pub use boxed::BoxObservable;
pub use connectable::{AutoConnectOp, ConnectableObservable, RefCountOp};
pub use create::{create, defer, using, CreateObservable, DeferObservable, Emitter, UsingObservable};
pub use from_iter::{
  empty, from_iter, from_iterable, never, of, range, throw, throw_exception, EmptyObservable,
  FromIterObservable, NeverObservable, ThrowObservable,
};
pub use generate::{generate, generate_with_relative_time, GenerateObservable, GenerateWithTimeObservable};
pub use grouped::GroupedObservable;
pub use marbles::{from_marbles, hot, MarbleObservable};
pub use timer::{interval, timer, timer_at, timer_periodic, TimerObservable};

pub use crate::ops::{
  amb::amb,
  combine_latest::combine_latest,
  concat::{catch, concat, on_error_resume_next},
  merge::merge,
  zip::zip,
};

pub trait Observable: Send + Sync + 'static {
  type Item: Value;

  /// Wire `observer` into this source. `scheduler` is the scheduler given at
  /// subscribe time; sources and timed operators use it when they were not
  /// given one of their own.
  fn actual_subscribe(&self, observer: BoxObserver<Self::Item>, scheduler: Option<SchedulerRef>) -> Subscription;
}

impl<O: Observable + ?Sized> Observable for Arc<O> {
  type Item = O::Item;

  fn actual_subscribe(&self, observer: BoxObserver<Self::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    (**self).actual_subscribe(observer, scheduler)
  }
}

/// The body of [`ObservableExt::subscribe_with`] for a borrowed source.
pub(crate) fn subscribe_detached<S>(
  source: &S, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>,
) -> Subscription
where
  S: Observable + ?Sized,
{
  let detach = SingleAssignmentDisposable::new();
  let auto = AutoDetachObserver::new(observer, detach.clone());
  let handle = Subscription::new(detach.clone());
  trampoline::run(move || {
    let upstream = source.actual_subscribe(Box::new(auto), scheduler);
    // Only a second assignment fails; `detach` is assigned exactly here.
    let _ = detach.set(upstream);
  });
  handle
}

fn log_unhandled(err: RxError) {
  tracing::error!(error = %err, kind = err.as_label(), "unhandled error notification");
}

pub trait ObservableExt: Observable + Sized {
  // ==================== Subscribe ====================

  /// Subscribe with a `next` callback. Errors are logged.
  fn subscribe<N>(self, next: N) -> Subscription
  where
    N: FnMut(Self::Item) + Send + 'static,
  {
    self.subscribe_all(next, log_unhandled, || {})
  }

  fn subscribe_err<N, E>(self, next: N, error: E) -> Subscription
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(RxError) + Send + 'static,
  {
    self.subscribe_all(next, error, || {})
  }

  fn subscribe_all<N, E, C>(self, next: N, error: E, complete: C) -> Subscription
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(RxError) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.subscribe_with(FnObserver::new(next, error, complete), None)
  }

  fn subscribe_observer<O>(self, observer: O) -> Subscription
  where
    O: Observer<Self::Item> + 'static,
  {
    self.subscribe_with(observer, None)
  }

  /// Subscribe `observer`, handing `scheduler` to every source and timed
  /// operator in the chain that has none of its own.
  ///
  /// The observer is wrapped in an [`AutoDetachObserver`] and the
  /// subscription runs inside the current-thread trampoline, so synchronous
  /// sources have finished emitting when this returns.
  fn subscribe_with<O>(self, observer: O, scheduler: Option<SchedulerRef>) -> Subscription
  where
    O: Observer<Self::Item> + 'static,
  {
    subscribe_detached(&self, Box::new(observer), scheduler)
  }

  fn box_it(self) -> BoxObservable<Self::Item> { BoxObservable::new(self) }

  // ==================== Transform ====================

  fn map<U, F>(self, f: F) -> MapOp<Self, F>
  where
    F: Fn(Self::Item) -> U + Send + Sync + 'static,
    U: Value,
  {
    MapOp { source: self, func: Arc::new(f) }
  }

  /// Alias of [`ObservableExt::map`].
  fn select<U, F>(self, f: F) -> MapOp<Self, F>
  where
    F: Fn(Self::Item) -> U + Send + Sync + 'static,
    U: Value,
  {
    self.map(f)
  }

  /// Map with a fallible function; an `Err` terminates the stream.
  fn try_map<U, F>(self, f: F) -> TryMapOp<Self, F>
  where
    F: Fn(Self::Item) -> RxResult<U> + Send + Sync + 'static,
    U: Value,
  {
    TryMapOp { source: self, func: Arc::new(f) }
  }

  fn filter<F>(self, predicate: F) -> FilterOp<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    FilterOp { source: self, predicate: Arc::new(predicate) }
  }

  /// Alias of [`ObservableExt::filter`].
  fn where_<F>(self, predicate: F) -> FilterOp<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    self.filter(predicate)
  }

  /// Split into the values that pass `predicate` and those that fail it.
  /// Both halves share one subscription to the source.
  fn partition<F>(self, predicate: F) -> (BoxObservable<Self::Item>, BoxObservable<Self::Item>)
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    let published = self.share().box_it();
    let passes = Arc::new(predicate);
    let fails = passes.clone();
    (published.clone().filter(move |v| passes(v)).box_it(), published.filter(move |v| !fails(v)).box_it())
  }

  fn distinct(self) -> DistinctOp<Self, SelfKey<Self::Item>>
  where
    Self::Item: Eq + std::hash::Hash,
  {
    DistinctOp { source: self, key: Arc::new(<Self::Item as Clone>::clone as SelfKey<Self::Item>) }
  }

  /// Emit only values whose key was not seen before.
  fn distinct_by<K, F>(self, key: F) -> DistinctOp<Self, F>
  where
    K: Eq + std::hash::Hash + Send + 'static,
    F: Fn(&Self::Item) -> K + Send + Sync + 'static,
  {
    DistinctOp { source: self, key: Arc::new(key) }
  }

  fn distinct_until_changed(self) -> DistinctUntilChangedOp<Self, SelfKey<Self::Item>>
  where
    Self::Item: PartialEq,
  {
    DistinctUntilChangedOp { source: self, key: Arc::new(<Self::Item as Clone>::clone as SelfKey<Self::Item>) }
  }

  /// Drop values whose key equals the key of the previous emitted value.
  fn distinct_until_changed_by<K, F>(self, key: F) -> DistinctUntilChangedOp<Self, F>
  where
    K: PartialEq + Send + 'static,
    F: Fn(&Self::Item) -> K + Send + Sync + 'static,
  {
    DistinctUntilChangedOp { source: self, key: Arc::new(key) }
  }

  fn take(self, count: usize) -> TakeOp<Self> { TakeOp { source: self, count } }

  /// Emit values while `predicate` holds; `inclusive` also emits the first
  /// value that fails it.
  fn take_while<F>(self, predicate: F, inclusive: bool) -> TakeWhileOp<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    TakeWhileOp { source: self, predicate: Arc::new(predicate), inclusive }
  }

  fn skip(self, count: usize) -> SkipOp<Self> { SkipOp { source: self, count } }

  /// Mirror the source until `notifier` emits a value.
  fn take_until<N: Observable>(self, notifier: N) -> TakeUntilOp<Self, N> {
    TakeUntilOp { source: self, notifier }
  }

  fn scan<Acc, F>(self, seed: Acc, f: F) -> ScanOp<Self, Acc, F>
  where
    Acc: Value,
    F: Fn(Acc, Self::Item) -> Acc + Send + Sync + 'static,
  {
    ScanOp { source: self, seed, func: Arc::new(f) }
  }

  /// Fold the whole stream; emits the seed for an empty source.
  fn reduce<Acc, F>(self, seed: Acc, f: F) -> ReduceOp<Self, Acc, F>
  where
    Acc: Value,
    F: Fn(Acc, Self::Item) -> Acc + Send + Sync + 'static,
  {
    ReduceOp { source: self, seed, func: Arc::new(f) }
  }

  fn count(self) -> CountOp<Self> {
    ReduceOp { source: self, seed: 0, func: Arc::new(count_step::<Self::Item> as fn(usize, Self::Item) -> usize) }
  }

  fn to_list(self) -> ToListOp<Self> { ToListOp { source: self } }

  /// First value, or [`RxError::SequenceContainsNoElements`].
  fn first(self) -> FirstOp<Self> { FirstOp { source: self, default: None } }

  /// First value, or `default` for an empty source.
  fn first_or_default(self, default: Self::Item) -> FirstOp<Self> { FirstOp { source: self, default: Some(default) } }

  /// Last value, or [`RxError::SequenceContainsNoElements`].
  fn last(self) -> LastOp<Self> { LastOp { source: self } }

  /// The only value, emitted on completion. A second value errors with
  /// [`RxError::SequenceContainsMoreThanOneElement`], an empty source with
  /// [`RxError::SequenceContainsNoElements`].
  fn single(self) -> SingleOp<Self> { SingleOp { source: self, default: None } }

  /// [`ObservableExt::single`] with `default` standing in for an empty
  /// source.
  fn single_or_default(self, default: Self::Item) -> SingleOp<Self> {
    SingleOp { source: self, default: Some(default) }
  }

  /// `true` when both sequences hold equal values in the same order.
  fn sequence_equal<O>(self, other: O) -> SequenceEqualOp<Self, O>
  where
    O: Observable<Item = Self::Item>,
    Self::Item: PartialEq,
  {
    SequenceEqualOp { source: self, other, comparer: Arc::new(|a: &Self::Item, b: &Self::Item| a == b) }
  }

  fn sequence_equal_by<O, F>(self, other: O, comparer: F) -> SequenceEqualOp<Self, O>
  where
    O: Observable<Item = Self::Item>,
    F: Fn(&Self::Item, &Self::Item) -> bool + Send + Sync + 'static,
  {
    SequenceEqualOp { source: self, other, comparer: Arc::new(comparer) }
  }

  /// Emit every value and recursively the values of the observable `f`
  /// returns for it.
  fn expand<N, F>(self, f: F) -> ExpandOp<Self>
  where
    N: Observable<Item = Self::Item>,
    F: Fn(&Self::Item) -> N + Send + Sync + 'static,
  {
    ExpandOp { source: Arc::new(self), mapper: Arc::new(move |v: &Self::Item| f(v).box_it()) }
  }

  /// Observe values without changing them.
  fn tap<F>(self, f: F) -> TapOp<Self, F>
  where
    F: Fn(&Self::Item) + Send + Sync + 'static,
  {
    TapOp { source: self, func: Arc::new(f) }
  }

  /// Run `f` once the subscription terminates or is disposed.
  fn finalize<F>(self, f: F) -> FinalizeOp<Self, F>
  where
    F: Fn() + Send + Sync + 'static,
  {
    FinalizeOp { source: self, func: Arc::new(f) }
  }

  fn materialize(self) -> MaterializeOp<Self> { MaterializeOp { source: self } }

  fn dematerialize<T>(self) -> DematerializeOp<Self>
  where
    Self: Observable<Item = Notification<T>>,
    T: Value,
  {
    DematerializeOp { source: self }
  }

  fn start_with(self, values: Vec<Self::Item>) -> ConcatOp<Self::Item> {
    concat(vec![from_iter(values).box_it(), self.box_it()])
  }

  // ==================== Scheduling ====================

  /// Deliver notifications through `scheduler`.
  fn observe_on(self, scheduler: SchedulerRef) -> ObserveOnOp<Self> { ObserveOnOp { source: self, scheduler } }

  /// Perform the upstream subscription and its disposal on `scheduler`.
  fn subscribe_on(self, scheduler: SchedulerRef) -> SubscribeOnOp<Self> {
    SubscribeOnOp { source: Arc::new(self), scheduler }
  }

  // ==================== Time ====================

  /// Emit a value only after `due` has passed without another value.
  fn debounce(self, due: Duration) -> DebounceOp<Self> { DebounceOp { source: self, due, scheduler: None } }

  /// Alias of [`ObservableExt::debounce`].
  fn throttle_with_timeout(self, due: Duration) -> DebounceOp<Self> { self.debounce(due) }

  /// Debounce where each value's quiet period is the observable `f` returns
  /// for it.
  fn throttle_with_mapper<N, F>(self, f: F) -> ThrottleWithMapperOp<Self, F>
  where
    F: Fn(&Self::Item) -> N + Send + Sync + 'static,
    N: Observable,
  {
    ThrottleWithMapperOp { source: self, mapper: Arc::new(f) }
  }

  /// Alias of [`ObservableExt::throttle_with_mapper`].
  fn debounce_with_selector<N, F>(self, f: F) -> ThrottleWithMapperOp<Self, F>
  where
    F: Fn(&Self::Item) -> N + Send + Sync + 'static,
    N: Observable,
  {
    self.throttle_with_mapper(f)
  }

  /// Shift every notification later by `due`, errors excepted.
  fn delay(self, due: Duration) -> DelayOp<Self> { DelayOp { source: self, due, scheduler: None } }

  /// Postpone the subscription to the source by `due`.
  fn delay_subscription(self, due: Duration) -> DelaySubscriptionOp<Self> {
    DelaySubscriptionOp { source: Arc::new(self), due, scheduler: None }
  }

  /// Hold each value until the observable `f` returns for it emits or
  /// completes.
  fn delay_with_mapper<N, F>(self, f: F) -> DelayWithMapperOp<Self>
  where
    N: Observable,
    F: Fn(&Self::Item) -> N + Send + Sync + 'static,
  {
    DelayWithMapperOp {
      source: Arc::new(self),
      subscription_delay: None,
      mapper: Arc::new(move |v: &Self::Item| f(v).map(|_| ()).box_it()),
    }
  }

  /// [`ObservableExt::delay_with_mapper`], subscribing to the source only
  /// once `subscription_delay` emits or completes.
  fn delay_subscription_with_mapper<D, N, F>(self, subscription_delay: D, f: F) -> DelayWithMapperOp<Self>
  where
    D: Observable,
    N: Observable,
    F: Fn(&Self::Item) -> N + Send + Sync + 'static,
  {
    DelayWithMapperOp {
      source: Arc::new(self),
      subscription_delay: Some(subscription_delay.map(|_| ()).box_it()),
      mapper: Arc::new(move |v: &Self::Item| f(v).map(|_| ()).box_it()),
    }
  }

  /// Emit the latest value every `period`, if one arrived since the last tick.
  fn sample(self, period: Duration) -> SampleOp<Self, TimerObservable> { self.sample_with(interval(period)) }

  fn sample_with<N: Observable>(self, sampler: N) -> SampleOp<Self, N> { SampleOp { source: self, sampler } }

  /// Error with [`RxError::Timeout`] when `due` passes without a
  /// notification.
  fn timeout(self, due: Duration) -> TimeoutOp<Self, Self::Item> {
    TimeoutOp { source: self, due: Due::Relative(due), other: None, scheduler: None }
  }

  /// Switch to `other` when `due` passes without a notification.
  fn timeout_or<O>(self, due: Duration, other: O) -> TimeoutOp<Self, Self::Item>
  where
    O: Observable<Item = Self::Item>,
  {
    TimeoutOp { source: self, due: Due::Relative(due), other: Some(other.box_it()), scheduler: None }
  }

  /// Error with [`RxError::Timeout`] when the source has not terminated by
  /// the absolute time `at`.
  fn timeout_at(self, at: Instant) -> TimeoutOp<Self, Self::Item> {
    TimeoutOp { source: self, due: Due::Absolute(at), other: None, scheduler: None }
  }

  /// Timeout driven by observables: `first` bounds the wait for the first
  /// value, `mapper` gives the bound after each value. When a bound fires
  /// first the stream switches to `other`, or errors with
  /// [`RxError::Timeout`].
  fn timeout_with_mapper<N, M, F>(
    self, first: N, mapper: F, other: Option<BoxObservable<Self::Item>>,
  ) -> TimeoutWithMapperOp<Self, N>
  where
    N: Observable,
    M: Observable,
    F: Fn(&Self::Item) -> M + Send + Sync + 'static,
  {
    TimeoutWithMapperOp {
      source: self,
      first: Arc::new(first),
      mapper: Arc::new(move |v: &Self::Item| mapper(v).map(|_| ()).box_it()),
      other,
    }
  }

  /// Emit a value, then ignore values for `window`.
  fn throttle_first(self, window: Duration) -> ThrottleFirstOp<Self> {
    ThrottleFirstOp { source: self, window, scheduler: None }
  }

  /// Windows opened every `shift` (default `span`) and closed after `span`.
  fn window_with_time(self, span: Duration, shift: Option<Duration>) -> WindowWithTimeOp<Self> {
    WindowWithTimeOp { source: self, span, shift: shift.unwrap_or(span), scheduler: None }
  }

  /// Windows closed after `span` or after `count` values, whichever comes
  /// first.
  fn window_with_time_or_count(self, span: Duration, count: usize) -> WindowWithTimeOrCountOp<Self> {
    WindowWithTimeOrCountOp { source: self, span, count, scheduler: None }
  }

  /// Windows of `count` values, a new one every `skip` (default `count`)
  /// values.
  fn window_with_count(self, count: usize, skip: Option<usize>) -> WindowWithCountOp<Self> {
    WindowWithCountOp { source: self, count, skip: skip.unwrap_or(count) }
  }

  fn buffer_with_count(self, count: usize, skip: Option<usize>) -> BoxObservable<Vec<Self::Item>> {
    self
      .window_with_count(count, skip)
      .flat_map(|w| w.to_list())
      .filter(|v: &Vec<Self::Item>| !v.is_empty())
      .box_it()
  }

  fn buffer_with_time(self, span: Duration, shift: Option<Duration>) -> BoxObservable<Vec<Self::Item>> {
    self.window_with_time(span, shift).flat_map(|w| w.to_list()).box_it()
  }

  fn buffer_with_time_or_count(self, span: Duration, count: usize) -> BoxObservable<Vec<Self::Item>> {
    self.window_with_time_or_count(span, count).flat_map(|w| w.to_list()).box_it()
  }

  /// Windows cut whenever `boundaries` emits.
  fn window<B: Observable>(self, boundaries: B) -> WindowOp<Self, B> { WindowOp { source: self, boundaries } }

  /// Windows each closed by the first value or the completion of a fresh
  /// observable from `closing`.
  fn window_when<N, F>(self, closing: F) -> WindowWhenOp<Self>
  where
    N: Observable,
    F: Fn() -> N + Send + Sync + 'static,
  {
    WindowWhenOp { source: self, closing: Arc::new(move || closing().map(|_| ()).box_it()) }
  }

  /// A window opens at every value of `openings` and closes when the
  /// observable `closing` returns for that value emits or completes.
  /// Windows may overlap.
  fn window_toggle<O, N, F>(self, openings: O, closing: F) -> BoxObservable<BoxObservable<Self::Item>>
  where
    O: Observable,
    N: Observable,
    F: Fn(&O::Item) -> N + Send + Sync + 'static,
  {
    let keep_window = |_: O::Item, window: BoxObservable<Self::Item>| window;
    openings.group_join(self, closing, |_: &Self::Item| empty::<()>(), keep_window).box_it()
  }

  fn buffer<B: Observable>(self, boundaries: B) -> BoxObservable<Vec<Self::Item>> {
    self.window(boundaries).flat_map(|w| w.to_list()).box_it()
  }

  fn buffer_when<N, F>(self, closing: F) -> BoxObservable<Vec<Self::Item>>
  where
    N: Observable,
    F: Fn() -> N + Send + Sync + 'static,
  {
    self.window_when(closing).flat_map(|w| w.to_list()).box_it()
  }

  fn buffer_toggle<O, N, F>(self, openings: O, closing: F) -> BoxObservable<Vec<Self::Item>>
  where
    O: Observable,
    N: Observable,
    F: Fn(&O::Item) -> N + Send + Sync + 'static,
  {
    self.window_toggle(openings, closing).flat_map(|w| w.to_list()).box_it()
  }

  // ==================== Combine ====================

  /// Flatten an observable of observables, at most `max_concurrent` inner
  /// subscriptions at a time.
  fn merge_max(self, max_concurrent: usize) -> MergeOp<Self>
  where
    Self::Item: Observable,
  {
    MergeOp { source: self, max_concurrent: Some(max_concurrent.max(1)) }
  }

  fn merge_all(self) -> MergeOp<Self>
  where
    Self::Item: Observable,
  {
    MergeOp { source: self, max_concurrent: None }
  }

  fn merge_with<O>(self, other: O) -> MergeOp<FromIterObservable<Vec<BoxObservable<Self::Item>>>>
  where
    O: Observable<Item = Self::Item>,
  {
    merge(vec![self.box_it(), other.box_it()])
  }

  fn flat_map<N, F>(self, f: F) -> MergeOp<MapOp<Self, F>>
  where
    F: Fn(Self::Item) -> N + Send + Sync + 'static,
    N: Observable + Value,
  {
    self.map(f).merge_all()
  }

  /// Subscribe to inner observables one after another.
  fn concat_all(self) -> MergeOp<Self>
  where
    Self::Item: Observable,
  {
    self.merge_max(1)
  }

  fn concat_map<N, F>(self, f: F) -> MergeOp<MapOp<Self, F>>
  where
    F: Fn(Self::Item) -> N + Send + Sync + 'static,
    N: Observable + Value,
  {
    self.map(f).concat_all()
  }

  fn concat_with<O>(self, other: O) -> ConcatOp<Self::Item>
  where
    O: Observable<Item = Self::Item>,
  {
    concat(vec![self.box_it(), other.box_it()])
  }

  /// Mirror only the most recent inner observable.
  fn switch_latest(self) -> SwitchLatestOp<Self>
  where
    Self::Item: Observable,
  {
    SwitchLatestOp { source: self }
  }

  fn switch_map<N, F>(self, f: F) -> SwitchLatestOp<MapOp<Self, F>>
  where
    F: Fn(Self::Item) -> N + Send + Sync + 'static,
    N: Observable + Value,
  {
    self.map(f).switch_latest()
  }

  fn combine_latest_with<O, U, F>(self, other: O, f: F) -> BoxObservable<U>
  where
    O: Observable,
    U: Value,
    F: Fn(Self::Item, O::Item) -> U + Send + Sync + 'static,
  {
    combine_latest(vec![self.map(Either::Left).box_it(), other.map(Either::Right).box_it()])
      .try_map(move |pair| {
        let (a, b) = Either::split_pair(pair)?;
        Ok(f(a, b))
      })
      .box_it()
  }

  fn zip_with<O, U, F>(self, other: O, f: F) -> BoxObservable<U>
  where
    O: Observable,
    U: Value,
    F: Fn(Self::Item, O::Item) -> U + Send + Sync + 'static,
  {
    zip(vec![self.map(Either::Left).box_it(), other.map(Either::Right).box_it()])
      .try_map(move |pair| {
        let (a, b) = Either::split_pair(pair)?;
        Ok(f(a, b))
      })
      .box_it()
  }

  /// Combine each source value with the latest value of `other`; nothing is
  /// emitted until `other` has produced a value.
  fn with_latest_from<O, U, F>(self, other: O, f: F) -> WithLatestFromOp<Self, O, F>
  where
    O: Observable,
    U: Value,
    F: Fn(Self::Item, O::Item) -> U + Send + Sync + 'static,
  {
    WithLatestFromOp { source: self, other, func: Arc::new(f) }
  }

  fn amb_with<O>(self, other: O) -> AmbOp<Self::Item>
  where
    O: Observable<Item = Self::Item>,
  {
    amb(vec![self.box_it(), other.box_it()])
  }

  // ==================== Grouping and joins ====================

  fn group_by<K, KF>(self, key: KF) -> GroupByOp<Self, K, Self::Item>
  where
    K: Value + Eq + std::hash::Hash,
    KF: Fn(&Self::Item) -> K + Send + Sync + 'static,
  {
    GroupByOp::new(self, Arc::new(key), Arc::new(|v: Self::Item| v), None)
  }

  fn group_by_with<K, V, KF, EF>(self, key: KF, element: EF) -> GroupByOp<Self, K, V>
  where
    K: Value + Eq + std::hash::Hash,
    V: Value,
    KF: Fn(&Self::Item) -> K + Send + Sync + 'static,
    EF: Fn(Self::Item) -> V + Send + Sync + 'static,
  {
    GroupByOp::new(self, Arc::new(key), Arc::new(element), None)
  }

  /// Group values; a group closes when the observable `duration` returns for
  /// it emits or completes, and a later value with the same key opens a new
  /// group.
  fn group_by_until<K, V, N, KF, EF, DF>(self, key: KF, element: EF, duration: DF) -> GroupByOp<Self, K, V>
  where
    K: Value + Eq + std::hash::Hash,
    V: Value,
    N: Observable,
    KF: Fn(&Self::Item) -> K + Send + Sync + 'static,
    EF: Fn(Self::Item) -> V + Send + Sync + 'static,
    DF: Fn(&GroupedObservable<K, V>) -> N + Send + Sync + 'static,
  {
    let duration: DurationFn<GroupedObservable<K, V>> =
      Arc::new(move |g: &GroupedObservable<K, V>| duration(g).map(|_| ()).box_it());
    GroupByOp::new(self, Arc::new(key), Arc::new(element), Some(duration))
  }

  /// Correlate values of two sources by overlapping durations; every left
  /// value is paired with an observable of the right values it overlaps.
  fn group_join<R, LN, RN, U, LD, RD, F>(
    self, right: R, left_duration: LD, right_duration: RD, result: F,
  ) -> GroupJoinOp<Self, R, U>
  where
    R: Observable,
    LN: Observable,
    RN: Observable,
    U: Value,
    LD: Fn(&Self::Item) -> LN + Send + Sync + 'static,
    RD: Fn(&R::Item) -> RN + Send + Sync + 'static,
    F: Fn(Self::Item, BoxObservable<R::Item>) -> U + Send + Sync + 'static,
  {
    GroupJoinOp {
      left: self,
      right,
      left_duration: Arc::new(move |v: &Self::Item| left_duration(v).map(|_| ()).box_it()),
      right_duration: Arc::new(move |v: &R::Item| right_duration(v).map(|_| ()).box_it()),
      result: Arc::new(result),
    }
  }

  /// Pair every left value with every right value whose durations overlap.
  fn join<R, LN, RN, U, LD, RD, F>(self, right: R, left_duration: LD, right_duration: RD, result: F) -> JoinOp<Self, R, U>
  where
    R: Observable,
    LN: Observable,
    RN: Observable,
    U: Value,
    LD: Fn(&Self::Item) -> LN + Send + Sync + 'static,
    RD: Fn(&R::Item) -> RN + Send + Sync + 'static,
    F: Fn(Self::Item, R::Item) -> U + Send + Sync + 'static,
  {
    JoinOp {
      left: self,
      right,
      left_duration: Arc::new(move |v: &Self::Item| left_duration(v).map(|_| ()).box_it()),
      right_duration: Arc::new(move |v: &R::Item| right_duration(v).map(|_| ()).box_it()),
      result: Arc::new(result),
    }
  }

  // ==================== Resilience ====================

  /// On error, continue with the observable `handler` returns for it.
  fn catch<O, F>(self, handler: F) -> CatchOp<Self>
  where
    O: Observable<Item = Self::Item>,
    F: Fn(RxError) -> O + Send + Sync + 'static,
  {
    CatchOp { source: self, handler: Arc::new(move |e| handler(e).box_it()) }
  }

  /// On error, continue with `other`.
  fn catch_with<O>(self, other: O) -> CatchOp<Self>
  where
    O: Observable<Item = Self::Item>,
  {
    let other = other.box_it();
    CatchOp { source: self, handler: Arc::new(move |_| other.clone()) }
  }

  /// Resubscribe on every error.
  fn retry(self) -> ConcatOp<Self::Item> { ConcatOp::repeated(self.box_it(), None, ConcatMode::Catch) }

  /// Subscribe at most `attempts` times; the last error is propagated.
  fn retry_n(self, attempts: usize) -> ConcatOp<Self::Item> {
    ConcatOp::repeated(self.box_it(), Some(attempts), ConcatMode::Catch)
  }

  /// Resubscribe on every completion.
  fn repeat(self) -> ConcatOp<Self::Item> { ConcatOp::repeated(self.box_it(), None, ConcatMode::Concat) }

  fn repeat_n(self, times: usize) -> ConcatOp<Self::Item> {
    ConcatOp::repeated(self.box_it(), Some(times), ConcatMode::Concat)
  }

  /// Continue with `other` after the source terminates, error or not.
  fn on_error_resume_next<O>(self, other: O) -> ConcatOp<Self::Item>
  where
    O: Observable<Item = Self::Item>,
  {
    on_error_resume_next(vec![self.box_it(), other.box_it()])
  }

  // ==================== Multicast ====================

  /// Share one subscription to the source through `subject`, once
  /// [`ConnectableObservable::connect`] is called.
  fn multicast<Subj>(self, subject: Subj) -> ConnectableObservable<Self, Subj>
  where
    Subj: SubjectLike<Self::Item>,
  {
    ConnectableObservable::new(self, subject)
  }

  /// Per subscription: make a subject with `factory`, build the downstream
  /// pipeline with `selector` over the connectable, subscribe, connect.
  fn multicast_with<Subj, SF, N, F>(self, factory: SF, selector: F) -> MulticastSelectorOp<Self, Subj, N>
  where
    Subj: SubjectLike<Self::Item>,
    SF: Fn() -> Subj + Send + Sync + 'static,
    N: Observable,
    F: Fn(ConnectableObservable<Arc<Self>, Subj>) -> N + Send + Sync + 'static,
  {
    MulticastSelectorOp { source: Arc::new(self), factory: Arc::new(factory), selector: Arc::new(selector) }
  }

  fn publish(self) -> ConnectableObservable<Self, Subject<Self::Item>> { self.multicast(Subject::new()) }

  fn publish_value(self, initial: Self::Item) -> ConnectableObservable<Self, BehaviorSubject<Self::Item>> {
    self.multicast(BehaviorSubject::new(initial))
  }

  fn replay(
    self, buffer_size: Option<usize>, window: Option<Duration>,
  ) -> ConnectableObservable<Self, ReplaySubject<Self::Item>> {
    self.multicast(ReplaySubject::new(buffer_size, window))
  }

  /// `publish().ref_count()`.
  fn share(self) -> RefCountOp<Self, Subject<Self::Item>> { self.publish().ref_count() }

  // ==================== Conversion ====================

  /// Render the stream as a marble diagram, emitted once on termination.
  fn to_marbles(self) -> ToMarblesOp<Self> { ToMarblesOp { source: self, scheduler: None } }

  /// Future resolving to the last value; empty streams and errors reject.
  fn to_future(self) -> ToFuture<Self::Item> { ToFuture::new(self) }
}

impl<T: Observable> ObservableExt for T {}
