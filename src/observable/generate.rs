//! Loop-shaped sources: `generate` and `generate_with_relative_time`.

use super::Observable;
use crate::{
  error::RxResult,
  observer::{BoxObserver, Observer},
  ops::{current_or, guarded, impl_with_scheduler, timed_or},
  scheduler::{Duration, SchedulerExt, SchedulerRef},
  subscription::Subscription,
  Value,
};
use std::sync::Arc;

struct Loop<S, C, I> {
  initial: S,
  condition: Arc<C>,
  iterate: Arc<I>,
}

impl<S: Clone, C, I> Clone for Loop<S, C, I> {
  fn clone(&self) -> Self {
    Loop { initial: self.initial.clone(), condition: self.condition.clone(), iterate: self.iterate.clone() }
  }
}

impl<S, C, I> Loop<S, C, I>
where
  S: Value,
  C: Fn(&S) -> bool + Send + Sync + 'static,
  I: Fn(S) -> RxResult<S> + Send + Sync + 'static,
{
  /// Advance past `state` (unless `first`) and test the condition.
  fn step(&self, state: &mut Option<S>, first: &mut bool) -> RxResult<Option<S>> {
    let current = match state.take() {
      Some(s) if !*first => guarded(|| (self.iterate)(s))??,
      Some(s) => s,
      None => return Ok(None),
    };
    *first = false;
    let keep = guarded(|| (self.condition)(&current))?;
    *state = Some(current.clone());
    Ok(keep.then_some(current))
  }
}

/// `for (s = initial; condition(s); s = iterate(s)) emit(s)`, one scheduled
/// step per value.
pub struct GenerateObservable<S, C, I> {
  looped: Loop<S, C, I>,
  scheduler: Option<SchedulerRef>,
}

impl<S: Clone, C, I> Clone for GenerateObservable<S, C, I> {
  fn clone(&self) -> Self { GenerateObservable { looped: self.looped.clone(), scheduler: self.scheduler.clone() } }
}

/// Emit `initial`, then `iterate(initial)` and so on while `condition`
/// holds. An `Err` from `iterate` or a panic in either callback terminates
/// the stream with that error.
pub fn generate<S, C, I>(initial: S, condition: C, iterate: I) -> GenerateObservable<S, C, I>
where
  S: Value,
  C: Fn(&S) -> bool + Send + Sync + 'static,
  I: Fn(S) -> RxResult<S> + Send + Sync + 'static,
{
  GenerateObservable {
    looped: Loop { initial, condition: Arc::new(condition), iterate: Arc::new(iterate) },
    scheduler: None,
  }
}

impl<S, C, I> Observable for GenerateObservable<S, C, I>
where
  S: Value,
  C: Fn(&S) -> bool + Send + Sync + 'static,
  I: Fn(S) -> RxResult<S> + Send + Sync + 'static,
{
  type Item = S;

  fn actual_subscribe(&self, mut observer: BoxObserver<S>, scheduler: Option<SchedulerRef>) -> Subscription {
    let looped = self.looped.clone();
    let mut state = Some(looped.initial.clone());
    let mut first = true;
    current_or(&self.scheduler, &scheduler).schedule_recursive(move |_, recurse| {
      if observer.is_finished() {
        return;
      }
      match looped.step(&mut state, &mut first) {
        Ok(Some(v)) => {
          observer.next(v);
          recurse.again();
        }
        Ok(None) => observer.complete(),
        Err(e) => observer.error(e),
      }
    })
  }
}

/// [`generate`] where each value is delayed by a per-state time.
pub struct GenerateWithTimeObservable<S, C, I, T> {
  looped: Loop<S, C, I>,
  time: Arc<T>,
  scheduler: Option<SchedulerRef>,
}

impl<S: Clone, C, I, T> Clone for GenerateWithTimeObservable<S, C, I, T> {
  fn clone(&self) -> Self {
    GenerateWithTimeObservable {
      looped: self.looped.clone(),
      time: self.time.clone(),
      scheduler: self.scheduler.clone(),
    }
  }
}

/// Like [`generate`], but each value is emitted `time(state)` after the
/// previous step.
pub fn generate_with_relative_time<S, C, I, T>(
  initial: S, condition: C, iterate: I, time: T,
) -> GenerateWithTimeObservable<S, C, I, T>
where
  S: Value,
  C: Fn(&S) -> bool + Send + Sync + 'static,
  I: Fn(S) -> RxResult<S> + Send + Sync + 'static,
  T: Fn(&S) -> Duration + Send + Sync + 'static,
{
  GenerateWithTimeObservable {
    looped: Loop { initial, condition: Arc::new(condition), iterate: Arc::new(iterate) },
    time: Arc::new(time),
    scheduler: None,
  }
}

impl<S, C, I, T> Observable for GenerateWithTimeObservable<S, C, I, T>
where
  S: Value,
  C: Fn(&S) -> bool + Send + Sync + 'static,
  I: Fn(S) -> RxResult<S> + Send + Sync + 'static,
  T: Fn(&S) -> Duration + Send + Sync + 'static,
{
  type Item = S;

  fn actual_subscribe(&self, mut observer: BoxObserver<S>, scheduler: Option<SchedulerRef>) -> Subscription {
    let (looped, time) = (self.looped.clone(), self.time.clone());
    let mut state = Some(looped.initial.clone());
    let mut first = true;
    let mut pending: Option<S> = None;
    timed_or(&self.scheduler, &scheduler).schedule_recursive_relative(Duration::ZERO, move |_, recurse| {
      if let Some(v) = pending.take() {
        observer.next(v);
      }
      if observer.is_finished() {
        return;
      }
      let due = looped
        .step(&mut state, &mut first)
        .and_then(|next| next.map(|v| guarded(|| time(&v)).map(|d| (v, d))).transpose());
      match due {
        Ok(Some((v, d))) => {
          pending = Some(v);
          recurse.again_after(d);
        }
        Ok(None) => observer.complete(),
        Err(e) => observer.error(e),
      }
    })
  }
}

impl_with_scheduler!(GenerateObservable<S, C, I>, GenerateWithTimeObservable<S, C, I, T>);
