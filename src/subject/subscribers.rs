use crate::observer::Observer;

/// The observers of a subject, keyed by subscription id.
///
/// Subjects snapshot this list under their lock and notify the snapshot
/// after releasing it.
pub(crate) struct Subscribers<O> {
  list: Vec<(u64, O)>,
  next_id: u64,
}

impl<O> Default for Subscribers<O> {
  fn default() -> Self { Subscribers { list: vec![], next_id: 0 } }
}

impl<O: Clone> Subscribers<O> {
  /// Add an observer and return its id.
  pub(crate) fn add(&mut self, observer: O) -> u64 {
    let id = self.next_id;
    self.next_id += 1;
    self.list.push((id, observer));
    id
  }

  pub(crate) fn remove(&mut self, id: u64) -> Option<O> {
    let pos = self.list.iter().position(|(i, _)| *i == id)?;
    Some(self.list.remove(pos).1)
  }

  pub(crate) fn snapshot(&self) -> Vec<O> { self.list.iter().map(|(_, o)| o.clone()).collect() }

  /// Empty the list, returning what it held.
  pub(crate) fn take_all(&mut self) -> Vec<O> { std::mem::take(&mut self.list).into_iter().map(|(_, o)| o).collect() }

  pub(crate) fn is_empty(&self) -> bool { self.list.is_empty() }
}

/// Send `value` to every observer; the last one gets it moved instead of
/// cloned.
pub(crate) fn broadcast_next<T: Clone, O: Observer<T>>(observers: Vec<O>, value: T) {
  let mut iter = observers.into_iter().peekable();
  while let Some(mut observer) = iter.next() {
    if iter.peek().is_some() {
      observer.next(value.clone());
    } else {
      observer.next(value);
      break;
    }
  }
}
