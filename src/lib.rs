//! # rxrt: a reactive streams runtime
//!
//! Observables, observers, subjects, schedulers and the operator algebra of
//! [Reactive Extensions](http://reactivex.io/), with a virtual-time test
//! scheduler for asserting time-based behaviour tick by tick.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxrt::prelude::*;
//!
//! let mut seen = vec![];
//! let (tx, rx) = std::sync::mpsc::channel();
//! from_iter(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(move |v| tx.send(v).unwrap());
//! seen.extend(rx.try_iter());
//! assert_eq!(seen, vec![0, 4, 8, 12, 16]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Cold source of `next* (error \| complete)?` |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` |
//! | [`Subject`] | Both at once; multicasts to its observers |
//! | [`Scheduler`] | Decides when and where work runs |
//! | [`Subscription`] | Handle to cancel an active subscription |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): `ThreadPoolScheduler` on the
//!   `futures` thread pool
//! - **`tokio-scheduler`**: `TokioScheduler` on a tokio runtime handle
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subject`]: subject::Subject
//! [`Scheduler`]: scheduler::Scheduler
//! [`Subscription`]: subscription::Subscription

pub mod error;
pub mod notification;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod subject;
pub mod subscription;
pub mod testing;

/// Bound on every value that flows through a stream.
///
/// Values cross threads when a scheduler hops, and subjects hand one value
/// to many observers, hence `Clone + Send + Sync`.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}
