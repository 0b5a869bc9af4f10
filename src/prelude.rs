//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Errors and notifications
pub use crate::{
  error::{RxError, RxResult},
  notification::Notification,
  Value,
};
// Observable trait, operators and factories
pub use crate::observable::*;
// Observer trait and wrappers
pub use crate::observer::{BoxObserver, FnObserver, Observer, SharedObserver};
// Schedulers
pub use crate::scheduler::{
  CatchScheduler, CurrentThreadScheduler, Duration, EventLoopScheduler, ImmediateScheduler, Instant,
  NewThreadScheduler, Recurse, Scheduler, SchedulerExt, SchedulerRef, TestScheduler, TimeoutScheduler,
  VirtualTimeScheduler,
};
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
// Subjects
pub use crate::subject::{AsyncSubject, BehaviorSubject, ReplaySubject, Subject, SubjectLike};
// Subscriptions
pub use crate::subscription::{
  CompositeDisposable, Disposable, SerialDisposable, SingleAssignmentDisposable, Subscription,
  SubscriptionGuard,
};
