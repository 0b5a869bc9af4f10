//! Marble diagrams.
//!
//! Every character except a space is one frame of [`MARBLE_FRAME`] ticks.
//!
//! | Marble | Meaning |
//! |--------|---------|
//! | `-` | one frame passes |
//! | `\|` | completion |
//! | `#`, `x`, `X` | error, see [`marble_error`] |
//! | `^` | subscription point of a hot diagram |
//! | `(ab)` | `a` and `b` in the frame of `(` |
//! | anything else | a `next` carrying that character |

use super::Recorded;
use crate::{error::RxError, notification::Notification};

/// Ticks per marble character.
pub const MARBLE_FRAME: u64 = 100;

/// The error raised by `#`, `x` and `X`.
pub fn marble_error() -> RxError { RxError::msg("error") }

struct Parsed {
  events: Vec<(u64, Notification<char>)>,
  caret: Option<u64>,
}

fn parse_frames(diagram: &str) -> Result<Parsed, RxError> {
  let mut events = vec![];
  let mut caret = None;
  let mut group: Option<u64> = None;
  for (frame, c) in diagram.chars().filter(|c| !c.is_whitespace()).enumerate() {
    let frame = frame as u64;
    let at = group.unwrap_or(frame);
    match c {
      '-' => {}
      '(' => {
        if group.is_some() {
          return Err(RxError::out_of_range(format!("nested group in marble diagram {diagram:?}")));
        }
        group = Some(frame);
      }
      ')' => {
        if group.take().is_none() {
          return Err(RxError::out_of_range(format!("unmatched ')' in marble diagram {diagram:?}")));
        }
      }
      '^' => {
        if caret.replace(frame).is_some() {
          return Err(RxError::out_of_range(format!("more than one '^' in marble diagram {diagram:?}")));
        }
      }
      '|' => events.push((at, Notification::Completed)),
      '#' | 'x' | 'X' => events.push((at, Notification::Error(marble_error()))),
      v => events.push((at, Notification::Next(v))),
    }
  }
  if group.is_some() {
    return Err(RxError::out_of_range(format!("unclosed group in marble diagram {diagram:?}")));
  }
  Ok(Parsed { events, caret })
}

/// Parse a cold diagram; frame `n` happens at tick `n * MARBLE_FRAME`.
pub fn parse(diagram: &str) -> Result<Vec<Recorded<char>>, RxError> {
  let parsed = parse_frames(diagram)?;
  if parsed.caret.is_some() {
    return Err(RxError::out_of_range(format!("'^' is only allowed in hot diagrams: {diagram:?}")));
  }
  Ok(parsed.events.into_iter().map(|(f, n)| Recorded::new(f * MARBLE_FRAME, n)).collect())
}

/// Parse a hot diagram. With a `^`, its frame lands on `subscribed` and
/// events before tick 0 are dropped; without one, frame 0 is tick 0.
pub fn parse_hot(diagram: &str, subscribed: u64) -> Result<Vec<Recorded<char>>, RxError> {
  let parsed = parse_frames(diagram)?;
  let events = parsed.events.into_iter();
  let recorded = match parsed.caret {
    None => events.map(|(f, n)| Recorded::new(f * MARBLE_FRAME, n)).collect(),
    Some(caret) => events
      .filter_map(|(f, n)| {
        let offset = (f as i64 - caret as i64) * MARBLE_FRAME as i64;
        let time = subscribed as i64 + offset;
        (time >= 0).then(|| Recorded::new(time as u64, n))
      })
      .collect(),
  };
  Ok(recorded)
}
