use super::{Disposable, Subscription};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct State {
  current: Option<Subscription>,
  disposed: bool,
}

/// Holds one replaceable disposable; replacing it disposes the previous one.
#[derive(Clone, Default)]
pub struct SerialDisposable(Arc<Mutex<State>>);

impl SerialDisposable {
  pub fn new() -> Self { Self::default() }

  pub fn set(&self, d: Subscription) {
    let old = {
      let mut st = self.0.lock();
      if st.disposed {
        None
      } else {
        Some(st.current.replace(d.clone()))
      }
    };
    match old {
      // Disposed already, so is the newcomer.
      None => d.dispose(),
      Some(Some(old)) if old != d => old.dispose(),
      Some(_) => {}
    }
  }

  pub fn get(&self) -> Option<Subscription> { self.0.lock().current.clone() }
}

impl Disposable for SerialDisposable {
  fn dispose(&self) {
    let old = {
      let mut st = self.0.lock();
      if st.disposed {
        return;
      }
      st.disposed = true;
      st.current.take()
    };
    if let Some(old) = old {
      old.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.0.lock().disposed }
}
