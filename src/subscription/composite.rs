use super::{Disposable, Subscription};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;

#[derive(Default)]
struct State {
  children: SmallVec<[Subscription; 2]>,
  disposed: bool,
}

/// An ordered group of disposables released together.
#[derive(Clone, Default)]
pub struct CompositeDisposable(Arc<Mutex<State>>);

impl CompositeDisposable {
  pub fn new() -> Self { Self::default() }

  pub fn from_iter<I: IntoIterator<Item = Subscription>>(iter: I) -> Self {
    let this = Self::new();
    this.0.lock().children.extend(iter);
    this
  }

  /// Add `d`; if this group is already disposed, `d` is disposed instead.
  pub fn add(&self, d: Subscription) {
    let rejected = {
      let mut st = self.0.lock();
      if st.disposed {
        true
      } else {
        st.children.retain(|c| !c.is_disposed());
        st.children.push(d.clone());
        false
      }
    };
    if rejected {
      d.dispose();
    }
  }

  /// Remove and dispose `d`. Returns whether it was found.
  pub fn remove(&self, d: &Subscription) -> bool {
    let found = {
      let mut st = self.0.lock();
      match st.children.iter().position(|c| c == d) {
        Some(idx) => {
          st.children.remove(idx);
          true
        }
        None => false,
      }
    };
    if found {
      d.dispose();
    }
    found
  }

  /// Dispose every child but keep accepting new ones.
  pub fn clear(&self) {
    let children = std::mem::take(&mut self.0.lock().children);
    children.iter().for_each(Subscription::dispose);
  }

  pub fn contains(&self, d: &Subscription) -> bool { self.0.lock().children.iter().any(|c| c == d) }

  pub fn len(&self) -> usize { self.0.lock().children.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Disposable for CompositeDisposable {
  fn dispose(&self) {
    let children = {
      let mut st = self.0.lock();
      if st.disposed {
        return;
      }
      st.disposed = true;
      std::mem::take(&mut st.children)
    };
    children.iter().for_each(Subscription::dispose);
  }

  fn is_disposed(&self) -> bool { self.0.lock().disposed }
}
