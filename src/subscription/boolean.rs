use super::Disposable;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Records whether it has been disposed, nothing more.
#[derive(Debug, Default)]
pub struct BooleanDisposable(AtomicBool);

impl BooleanDisposable {
  pub fn new() -> Self { Self::default() }
}

impl Disposable for BooleanDisposable {
  #[inline]
  fn dispose(&self) { self.0.store(true, Ordering::Release) }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.load(Ordering::Acquire) }
}

/// Runs a closure the first time it is disposed.
pub struct AnonymousDisposable {
  action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
  disposed: AtomicBool,
}

impl AnonymousDisposable {
  pub fn new<F>(f: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    AnonymousDisposable {
      action: Mutex::new(Some(Box::new(f))),
      disposed: AtomicBool::new(false),
    }
  }
}

impl Disposable for AnonymousDisposable {
  fn dispose(&self) {
    if self.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    let action = self.action.lock().take();
    if let Some(action) = action {
      action()
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}
