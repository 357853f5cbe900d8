use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};

pub type ReservationId = i64;
pub type LaneId = i64;
pub type AlleyId = i64;

/// Opaque caller identity handed over by the identity provider.
pub type OwnerId = String;

/// Half-open interval `[start, end)` of alley-local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Span {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// `None` when `start` is not strictly before `end`.
    pub fn try_new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub lane_id: LaneId,
    pub owner_id: OwnerId,
    pub span: Span,
}

impl Reservation {
    pub fn begin_time(&self) -> NaiveDateTime {
        self.span.start
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.span.end
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

// ── Catalog records ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneId,
    pub number: u32,
    pub alley_id: AlleyId,
}

/// Opening window of a single day, `[open, close)`.
///
/// A `close` at or before `open` falls on the following day, so `16:00`–`00:00`
/// is open until midnight and `18:00`–`02:00` until two in the morning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl DayHours {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// The window opening on `date`. `None` only past the end of the calendar.
    pub fn on(&self, date: NaiveDate) -> Option<Span> {
        let close_date = if self.close <= self.open {
            date.succ_opt()?
        } else {
            date
        };
        Span::try_new(date.and_time(self.open), close_date.and_time(self.close))
    }
}

/// Weekly opening calendar with per-date overrides.
///
/// A weekday missing from `weekly` is a closed day. An override of `None`
/// closes that date regardless of the weekly entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default)]
    pub weekly: HashMap<Weekday, DayHours>,
    #[serde(default)]
    pub overrides: BTreeMap<NaiveDate, Option<DayHours>>,
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl OpeningHours {
    /// Same window every day of the week.
    pub fn daily(open: NaiveTime, close: NaiveTime) -> Self {
        Self {
            weekly: WEEK.iter().map(|d| (*d, DayHours::new(open, close))).collect(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, date: NaiveDate, hours: Option<DayHours>) -> Self {
        self.overrides.insert(date, hours);
        self
    }

    pub fn window_for(&self, date: NaiveDate) -> Option<DayHours> {
        match self.overrides.get(&date) {
            Some(hours) => *hours,
            None => self.weekly.get(&date.weekday()).copied(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alley {
    pub id: AlleyId,
    pub name: String,
    pub city: String,
    pub address: String,
    #[serde(default)]
    pub opening_hours: OpeningHours,
}

// ── Per-lane schedule ────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LaneState {
    pub lane_id: LaneId,
    /// Reservations on this lane, sorted by `span.start`.
    pub reservations: Vec<Reservation>,
}

impl LaneState {
    pub fn new(lane_id: LaneId) -> Self {
        Self {
            lane_id,
            reservations: Vec::new(),
        }
    }

    /// Insert reservation maintaining sort order by span.start.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.span.start, |r| r.span.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    pub fn remove_reservation(&mut self, id: ReservationId) -> Option<Reservation> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }

    pub fn get(&self, id: ReservationId) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    /// Return only reservations whose span overlaps the query window.
    /// Uses binary search to skip reservations starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.span.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.span.end > query.start)
    }
}

/// The event types, flat with no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationCreated {
        id: ReservationId,
        lane_id: LaneId,
        owner_id: OwnerId,
        span: Span,
    },
    ReservationRescheduled {
        id: ReservationId,
        lane_id: LaneId,
        span: Span,
    },
    ReservationDeleted {
        id: ReservationId,
        lane_id: LaneId,
    },
    /// Id watermark written by compaction so deleted ids are never handed out again.
    SequenceAdvanced {
        next_id: ReservationId,
    },
}

impl Event {
    pub fn lane_id(&self) -> Option<LaneId> {
        match self {
            Event::ReservationCreated { lane_id, .. }
            | Event::ReservationRescheduled { lane_id, .. }
            | Event::ReservationDeleted { lane_id, .. } => Some(*lane_id),
            Event::SequenceAdvanced { .. } => None,
        }
    }
}
