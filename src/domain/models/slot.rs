use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Half-open `[start, end)` range in the business's local wall-clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Calendar event id or booking id the interval came from.
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayHours {
    Closed,
    Open(TimeWindow),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerKind {
    Closed,
    SpecialHours { open: NaiveTime, close: NaiveTime },
}

/// A calendar event that signals closures or special hours instead of an appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemMarker {
    pub event_id: String,
    pub summary: String,
    pub kind: MarkerKind,
}

/// Free time kept before and after every booking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Buffers {
    pub before: Duration,
    pub after: Duration,
}
