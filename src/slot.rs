//! Time-slot validation: whole-hour alignment and the not-in-past rule.

use chrono::{NaiveDateTime, Timelike};

use crate::model::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    /// Begin is not on `HH:00:00` or end is not on `HH:59:00`.
    Misaligned,
    /// End does not come after begin.
    Inverted,
}

impl std::fmt::Display for SlotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotError::Misaligned => {
                write!(f, "slot must begin at HH:00:00 and end at HH:59:00")
            }
            SlotError::Inverted => write!(f, "slot end must be after its begin"),
        }
    }
}

impl std::error::Error for SlotError {}

fn on_the_minute(t: NaiveDateTime) -> bool {
    t.second() == 0 && t.nanosecond() == 0
}

/// Check a requested `[begin, end)` pair and turn it into a `Span`.
///
/// `10:00:00`–`10:59:00` is one slot, `10:00:00`–`12:59:00` three.
pub fn validate(begin: NaiveDateTime, end: NaiveDateTime) -> Result<Span, SlotError> {
    let aligned = begin.minute() == 0
        && on_the_minute(begin)
        && end.minute() == 59
        && on_the_minute(end);
    if !aligned {
        return Err(SlotError::Misaligned);
    }
    Span::try_new(begin, end).ok_or(SlotError::Inverted)
}

/// True when the slot starts at or after `now`.
pub fn is_not_past(span: &Span, now: NaiveDateTime) -> bool {
    span.start >= now
}

/// Source of "now" in alley-local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
