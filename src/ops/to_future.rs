//! Bridge from a stream to a [`Future`].
//!
//! The source is subscribed as soon as the future is created, not when it is
//! first polled, so a hot source does not lose values while the future waits
//! for an executor. Dropping the future disposes the subscription.
//!
//! ```rust
//! use rxrt::prelude::*;
//!
//! let last = futures::executor::block_on(of([1, 2, 3]).to_future());
//! assert_eq!(last, Ok(3));
//! ```

use crate::{
  error::{RxError, RxResult},
  observable::{Observable, ObservableExt},
  observer::Observer,
  subscription::Subscription,
};
use futures::channel::oneshot;
use pin_project_lite::pin_project;
use std::{
  future::Future,
  pin::Pin,
  task::{Context, Poll},
};

pin_project! {
  /// Resolves to the last value of the stream, or its error.
  /// An empty stream resolves to [`RxError::SequenceContainsNoElements`].
  pub struct ToFuture<T> {
    #[pin]
    outcome: oneshot::Receiver<RxResult<T>>,
    subscription: Subscription,
  }

  impl<T> PinnedDrop for ToFuture<T> {
    fn drop(this: Pin<&mut Self>) {
      this.project().subscription.dispose();
    }
  }
}

impl<T: Send + 'static> ToFuture<T> {
  pub(crate) fn new<S: Observable<Item = T>>(source: S) -> Self {
    let (tx, outcome) = oneshot::channel();
    let subscription = source.subscribe_observer(LastValue { last: None, tx: Some(tx) });
    ToFuture { outcome, subscription }
  }
}

impl<T> Future for ToFuture<T> {
  type Output = RxResult<T>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    // A dropped sender means the stream was torn down without terminating.
    self.project().outcome.poll(cx).map(|r| r.unwrap_or(Err(RxError::Disposed)))
  }
}

struct LastValue<T> {
  last: Option<T>,
  tx: Option<oneshot::Sender<RxResult<T>>>,
}

impl<T> LastValue<T> {
  fn resolve(&mut self, outcome: RxResult<T>) {
    if let Some(tx) = self.tx.take() {
      let _ = tx.send(outcome);
    }
  }
}

impl<T: Send + 'static> Observer<T> for LastValue<T> {
  fn next(&mut self, value: T) { self.last = Some(value) }

  fn error(&mut self, err: RxError) { self.resolve(Err(err)) }

  fn complete(&mut self) {
    let outcome = self.last.take().ok_or(RxError::SequenceContainsNoElements);
    self.resolve(outcome)
  }

  fn is_finished(&self) -> bool { self.tx.is_none() }
}
