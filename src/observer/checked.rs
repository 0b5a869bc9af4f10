use super::{BoxObserver, Observer};
use crate::error::{GrammarViolation, RxError, RxResult};
use parking_lot::Mutex;
use std::sync::{
  atomic::{AtomicU8, Ordering},
  Arc,
};

const IDLE: u8 = 0;
const BUSY: u8 = 1;
const DONE: u8 = 2;

/// Enforces the observer grammar and reports every violation.
///
/// The `try_*` methods return the violation as an [`RxError::Grammar`]; the
/// [`Observer`] implementation logs it instead. A call that arrives while
/// another call into the same observer is still running is rejected as
/// [`GrammarViolation::Reentrant`].
pub struct CheckedObserver<Item> {
  state: Arc<AtomicU8>,
  observer: Arc<Mutex<BoxObserver<Item>>>,
}

impl<Item> Clone for CheckedObserver<Item> {
  fn clone(&self) -> Self { CheckedObserver { state: self.state.clone(), observer: self.observer.clone() } }
}

struct Exit<'a> {
  state: &'a AtomicU8,
  to: u8,
}

impl Drop for Exit<'_> {
  fn drop(&mut self) { self.state.store(self.to, Ordering::Release) }
}

impl<Item: 'static> CheckedObserver<Item> {
  pub fn new<O: Observer<Item> + 'static>(observer: O) -> Self {
    CheckedObserver {
      state: Arc::new(AtomicU8::new(IDLE)),
      observer: Arc::new(Mutex::new(Box::new(observer))),
    }
  }

  fn enter(&self, terminal: bool) -> RxResult<Exit<'_>> {
    match self.state.compare_exchange(IDLE, BUSY, Ordering::AcqRel, Ordering::Acquire) {
      Ok(_) => Ok(Exit { state: &self.state, to: if terminal { DONE } else { IDLE } }),
      Err(BUSY) => Err(GrammarViolation::Reentrant.into()),
      Err(_) if terminal => Err(GrammarViolation::SecondTerminal.into()),
      Err(_) => Err(GrammarViolation::AfterTerminal.into()),
    }
  }

  pub fn try_next(&self, value: Item) -> RxResult<()> {
    let _exit = self.enter(false)?;
    self.observer.lock().next(value);
    Ok(())
  }

  pub fn try_error(&self, err: RxError) -> RxResult<()> {
    let _exit = self.enter(true)?;
    self.observer.lock().error(err);
    Ok(())
  }

  pub fn try_complete(&self) -> RxResult<()> {
    let _exit = self.enter(true)?;
    self.observer.lock().complete();
    Ok(())
  }
}

fn report(result: RxResult<()>) {
  if let Err(err) = result {
    tracing::warn!(error = %err, "observer grammar violation");
  }
}

impl<Item: 'static> Observer<Item> for CheckedObserver<Item> {
  fn next(&mut self, value: Item) { report(self.try_next(value)) }

  fn error(&mut self, err: RxError) { report(self.try_error(err)) }

  fn complete(&mut self) { report(self.try_complete()) }

  fn is_finished(&self) -> bool { self.state.load(Ordering::Acquire) == DONE }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observer::FnObserver;

  #[rxrt_macro::test]
  fn detects_terminal_violations() {
    let checked = CheckedObserver::new(FnObserver::new(|_: i32| {}, |_| {}, || {}));
    assert!(checked.try_next(1).is_ok());
    assert!(checked.try_complete().is_ok());
    assert_eq!(checked.try_next(2), Err(RxError::Grammar(GrammarViolation::AfterTerminal)));
    assert_eq!(
      checked.try_error(RxError::Timeout),
      Err(RxError::Grammar(GrammarViolation::SecondTerminal))
    );
  }

  #[rxrt_macro::test]
  fn detects_reentrant_calls() {
    let slot: Arc<Mutex<Option<CheckedObserver<i32>>>> = Arc::default();
    let seen: Arc<Mutex<Vec<RxResult<()>>>> = Arc::default();
    let (s, r) = (slot.clone(), seen.clone());
    let checked = CheckedObserver::new(FnObserver::new(
      move |v: i32| {
        let me = s.lock().clone();
        if let (Some(me), true) = (me, v == 1) {
          r.lock().push(me.try_next(2));
        }
      },
      |_| {},
      || {},
    ));
    *slot.lock() = Some(checked.clone());
    assert!(checked.try_next(1).is_ok());
    assert_eq!(*seen.lock(), vec![Err(RxError::Grammar(GrammarViolation::Reentrant))]);
    assert!(checked.try_next(3).is_ok());
  }
}
