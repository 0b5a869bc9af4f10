use super::{Disposable, Subscription};
use parking_lot::Mutex;
use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

struct State {
  underlying: Option<Subscription>,
  count: usize,
  primary_disposed: bool,
}

/// Shares one underlying disposable between its owner and any number of
/// leases.
///
/// The underlying disposable is released only once the owner has called
/// `dispose` and every lease handed out by [`RefCountDisposable::lease`] has
/// been returned, in either order.
#[derive(Clone)]
pub struct RefCountDisposable(Arc<Mutex<State>>);

impl RefCountDisposable {
  pub fn new(underlying: Subscription) -> Self {
    RefCountDisposable(Arc::new(Mutex::new(State {
      underlying: Some(underlying),
      count: 0,
      primary_disposed: false,
    })))
  }

  /// Hand out a new lease that keeps the underlying disposable alive.
  pub fn lease(&self) -> Subscription {
    let mut st = self.0.lock();
    if st.underlying.is_none() {
      return Subscription::empty();
    }
    st.count += 1;
    Subscription::new(Lease { parent: self.clone(), released: AtomicBool::new(false) })
  }

  fn release(&self) {
    let underlying = {
      let mut st = self.0.lock();
      if st.underlying.is_none() {
        return;
      }
      st.count = st.count.saturating_sub(1);
      if st.primary_disposed && st.count == 0 {
        st.underlying.take()
      } else {
        None
      }
    };
    if let Some(d) = underlying {
      d.dispose();
    }
  }
}

impl Disposable for RefCountDisposable {
  fn dispose(&self) {
    let underlying = {
      let mut st = self.0.lock();
      if st.underlying.is_none() || st.primary_disposed {
        return;
      }
      st.primary_disposed = true;
      if st.count == 0 {
        st.underlying.take()
      } else {
        None
      }
    };
    if let Some(d) = underlying {
      d.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.0.lock().underlying.is_none() }
}

struct Lease {
  parent: RefCountDisposable,
  released: AtomicBool,
}

impl Disposable for Lease {
  fn dispose(&self) {
    if !self.released.swap(true, Ordering::AcqRel) {
      self.parent.release();
    }
  }

  fn is_disposed(&self) -> bool { self.released.load(Ordering::Acquire) }
}
