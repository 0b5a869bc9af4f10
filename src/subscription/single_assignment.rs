use super::{Disposable, Subscription};
use crate::error::RxError;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct State {
  current: Option<Subscription>,
  assigned: bool,
  disposed: bool,
}

/// Holds at most one disposable, assigned exactly once.
///
/// Disposing before the assignment arms a pending dispose, so the eventual
/// assignee is released on arrival.
#[derive(Clone, Default)]
pub struct SingleAssignmentDisposable(Arc<Mutex<State>>);

impl SingleAssignmentDisposable {
  pub fn new() -> Self { Self::default() }

  /// Assign the held disposable. Fails when one was already assigned.
  pub fn set(&self, d: Subscription) -> Result<(), RxError> {
    let should_dispose = {
      let mut st = self.0.lock();
      if st.assigned && !st.disposed {
        return Err(RxError::AlreadyAssigned);
      }
      st.assigned = true;
      if !st.disposed {
        st.current = Some(d.clone());
      }
      st.disposed
    };
    if should_dispose {
      d.dispose();
    }
    Ok(())
  }

  pub fn get(&self) -> Option<Subscription> { self.0.lock().current.clone() }
}

impl Disposable for SingleAssignmentDisposable {
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
