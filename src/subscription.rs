//! Disposables: the lifetime algebra of every subscription graph.
//!
//! A [`Disposable`] is an idempotent one-shot release. [`Subscription`] is the
//! clonable, type-erased handle returned from every `subscribe` call and from
//! every scheduling call. The concrete variants compose into trees whose root
//! releases the whole pipeline.

use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

mod boolean;
mod composite;
mod ref_count;
mod scheduled;
mod serial;
mod single_assignment;

pub use boolean::{AnonymousDisposable, BooleanDisposable};
pub use composite::CompositeDisposable;
pub use ref_count::RefCountDisposable;
pub use scheduled::ScheduledDisposable;
pub use serial::SerialDisposable;
pub use single_assignment::SingleAssignmentDisposable;

pub trait Disposable: Send + Sync {
  /// Release the resource. Calling it more than once is a no-op.
  fn dispose(&self);

  fn is_disposed(&self) -> bool;
}

/// Type-erased, clonable disposable handle.
///
/// Two handles compare equal when they point at the same underlying
/// disposable.
#[derive(Clone)]
pub struct Subscription(Arc<dyn Disposable>);

impl Subscription {
  pub fn new<D: Disposable + 'static>(d: D) -> Self { Subscription(Arc::new(d)) }

  /// A subscription with nothing to release; it still records disposal.
  pub fn empty() -> Self { Subscription::new(BooleanDisposable::new()) }

  pub fn from_fn<F>(f: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    Subscription::new(AnonymousDisposable::new(f))
  }

  #[inline]
  pub fn dispose(&self) { self.0.dispose() }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.0.is_disposed() }

  /// Alias of [`Subscription::dispose`].
  #[inline]
  pub fn unsubscribe(&self) { self.0.dispose() }

  /// Activates "RAII" behavior for this subscription: `dispose()` is called
  /// automatically when the returned guard goes out of scope.
  #[must_use]
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard { SubscriptionGuard(Some(self)) }

  fn addr(&self) -> *const () { Arc::as_ptr(&self.0) as *const () }
}

impl Disposable for Subscription {
  #[inline]
  fn dispose(&self) { self.0.dispose() }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.is_disposed() }
}

impl PartialEq for Subscription {
  fn eq(&self, other: &Self) -> bool { std::ptr::eq(self.addr(), other.addr()) }
}

impl Eq for Subscription {}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("is_disposed", &self.is_disposed())
      .finish()
  }
}

impl Default for Subscription {
  fn default() -> Self { Subscription::empty() }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be disposed.
///
/// This structure is created by the [`Subscription::unsubscribe_when_dropped`]
/// method.
#[must_use]
#[derive(Debug)]
pub struct SubscriptionGuard(Option<Subscription>);

impl SubscriptionGuard {
  /// Give the subscription back without disposing it.
  pub fn into_inner(mut self) -> Subscription { self.0.take().unwrap_or_default() }
}

impl Drop for SubscriptionGuard {
  #[inline]
  fn drop(&mut self) {
    if let Some(sub) = self.0.take() {
      sub.dispose()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[rxrt_macro::test]
  fn from_fn_runs_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c = hits.clone();
    let sub = Subscription::from_fn(move || {
      c.fetch_add(1, Ordering::SeqCst);
    });
    assert!(!sub.is_disposed());
    sub.dispose();
    sub.clone().dispose();
    assert!(sub.is_disposed());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[rxrt_macro::test]
  fn identity_equality() {
    let a = Subscription::empty();
    let b = Subscription::empty();
    assert_eq!(a, a.clone());
    assert_ne!(a, b);
  }

  #[rxrt_macro::test]
  fn guard_disposes_on_drop() {
    let sub = Subscription::empty();
    {
      let _guard = sub.clone().unsubscribe_when_dropped();
    }
    assert!(sub.is_disposed());

    let kept = Subscription::empty();
    let inner = kept.clone().unsubscribe_when_dropped().into_inner();
    assert!(!inner.is_disposed());
  }
}
