use crate::{error::RxError, observer::Observer};

/// Normal form of everything travelling downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<T> {
  Next(T),
  Error(RxError),
  Completed,
}

impl<T> Notification<T> {
  /// Deliver this notification to `observer`.
  pub fn accept<O>(self, observer: &mut O)
  where
    O: Observer<T> + ?Sized,
  {
    match self {
      Notification::Next(v) => observer.next(v),
      Notification::Error(e) => observer.error(e),
      Notification::Completed => observer.complete(),
    }
  }

  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Notification::Next(_)) }

  /// Single letter kind, `N`, `E` or `C`.
  pub fn kind(&self) -> char {
    match self {
      Notification::Next(_) => 'N',
      Notification::Error(_) => 'E',
      Notification::Completed => 'C',
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Notification<U> {
    match self {
      Notification::Next(v) => Notification::Next(f(v)),
      Notification::Error(e) => Notification::Error(e),
      Notification::Completed => Notification::Completed,
    }
  }

  pub fn value(&self) -> Option<&T> {
    match self {
      Notification::Next(v) => Some(v),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxrt_macro::test]
  fn accept_dispatches_by_kind() {
    let mut seen = vec![];
    let mut observer = crate::observer::FnObserver::new(
      |v: i32| seen.push(Notification::Next(v)),
      |_| {},
      || {},
    );
    Notification::Next(3).accept(&mut observer);
    drop(observer);
    assert_eq!(seen, vec![Notification::Next(3)]);
    assert!(Notification::<i32>::Completed.is_terminal());
    assert_eq!(Notification::<i32>::Error(RxError::Timeout).kind(), 'E');
    assert_eq!(Notification::Next(2).map(|v| v * 2), Notification::Next(4));
  }
}
