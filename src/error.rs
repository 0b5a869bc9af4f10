//! Error type carried by every `error` notification.

use std::{any::Any, fmt};
use thiserror::Error;

/// Result alias for fallible user callbacks.
pub type RxResult<T> = Result<T, RxError>;

/// The ways an observer's grammar `next* (error | complete)?` can be broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarViolation {
  /// A second `error`/`complete` after the stream already terminated.
  SecondTerminal,
  /// A `next` after the stream already terminated.
  AfterTerminal,
  /// A notification delivered from inside the observer's own callback.
  Reentrant,
}

impl fmt::Display for GrammarViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      GrammarViolation::SecondTerminal => "terminal notification after termination",
      GrammarViolation::AfterTerminal => "next notification after termination",
      GrammarViolation::Reentrant => "reentrant notification",
    };
    f.write_str(s)
  }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RxError {
  /// Error raised by a producer or a user supplied callback.
  #[error("{0}")]
  Message(String),

  /// `first`, `last` and friends on an empty sequence.
  #[error("sequence contains no elements")]
  SequenceContainsNoElements,

  /// `single` on a sequence with a second element.
  #[error("sequence contains more than one element")]
  SequenceContainsMoreThanOneElement,

  /// Non-positive counts, windows or malformed arguments.
  #[error("argument out of range: {0}")]
  ArgumentOutOfRange(String),

  /// Default fallback of the `timeout` operator.
  #[error("timeout")]
  Timeout,

  /// Subject or disposable used after it was disposed.
  #[error("object has been disposed")]
  Disposed,

  /// Second assignment of a single-assignment disposable.
  #[error("disposable has already been assigned")]
  AlreadyAssigned,

  #[error("observer grammar violated: {0}")]
  Grammar(GrammarViolation),

  /// A callback panicked; the payload message is kept.
  #[error("callback panicked: {0}")]
  Panic(String),
}

impl RxError {
  pub fn msg(msg: impl Into<String>) -> Self { RxError::Message(msg.into()) }

  pub fn out_of_range(what: impl Into<String>) -> Self {
    RxError::ArgumentOutOfRange(what.into())
  }

  /// Stable label suitable for structured log fields.
  pub fn as_label(&self) -> &'static str {
    match self {
      RxError::Message(_) => "message",
      RxError::SequenceContainsNoElements => "sequence_contains_no_elements",
      RxError::SequenceContainsMoreThanOneElement => "sequence_contains_more_than_one_element",
      RxError::ArgumentOutOfRange(_) => "argument_out_of_range",
      RxError::Timeout => "timeout",
      RxError::Disposed => "disposed",
      RxError::AlreadyAssigned => "already_assigned",
      RxError::Grammar(_) => "grammar",
      RxError::Panic(_) => "panic",
    }
  }

  pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
    RxError::Panic(panic_message(payload))
  }
}

impl From<&str> for RxError {
  fn from(s: &str) -> Self { RxError::Message(s.to_owned()) }
}

impl From<String> for RxError {
  fn from(s: String) -> Self { RxError::Message(s) }
}

impl From<GrammarViolation> for RxError {
  fn from(v: GrammarViolation) -> Self { RxError::Grammar(v) }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&'static str>() {
    (*s).to_owned()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic payload".to_owned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxrt_macro::test]
  fn labels_and_display() {
    assert_eq!(RxError::Timeout.as_label(), "timeout");
    assert_eq!(RxError::msg("boom").to_string(), "boom");
    assert_eq!(
      RxError::Grammar(GrammarViolation::SecondTerminal).to_string(),
      "observer grammar violated: terminal notification after termination"
    );
    assert_eq!(RxError::from("ex"), RxError::Message("ex".into()));
  }

  #[rxrt_macro::test]
  fn panic_payloads() {
    let payload: Box<dyn Any + Send> = Box::new("static");
    assert_eq!(RxError::from_panic(payload.as_ref()), RxError::Panic("static".into()));
    let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
    assert_eq!(RxError::from_panic(payload.as_ref()), RxError::Panic("owned".into()));
  }
}
