use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use tracing::debug;

use crate::domain::models::business::Business;
use crate::domain::models::calendar::CalendarEvent;
use crate::domain::models::slot::{BusyInterval, DayHours, MarkerKind, SystemMarker, TimeWindow};
use crate::error::AppError;

const CLOSED_KEYWORDS: &[&str] = &["CLOSED", "CHIUSO", "FERIE", "VACATION", "HOLIDAY"];
const HOURS_KEYWORDS: &[&str] = &["ORARI", "HOURS", "WORKING_HOURS", "APERTO", "OPEN"];

/// Provider events for one day, split into system markers and busy intervals.
#[derive(Debug, Default)]
pub struct ClassifiedEvents {
    pub markers: Vec<SystemMarker>,
    pub busy: Vec<BusyInterval>,
}

fn summary_tokens(summary: &str) -> impl Iterator<Item = String> + '_ {
    summary
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_uppercase())
}

fn parse_clock(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H.%M"))
        .ok()
}

/// Finds an explicit `HH:MM-HH:MM` range inside a marker summary.
pub fn parse_hours_range(summary: &str) -> Option<(NaiveTime, NaiveTime)> {
    summary.split_whitespace().find_map(|word| {
        let word = word.trim_matches(|c: char| !c.is_ascii_digit());
        let (open, close) = word.split_once('-')?;
        let open = parse_clock(open.trim())?;
        let close = parse_clock(close.trim())?;
        (open < close).then_some((open, close))
    })
}

fn classify_marker(event: &CalendarEvent, tz: Tz) -> Option<MarkerKind> {
    let mut is_closed = false;
    let mut is_hours = false;
    for token in summary_tokens(&event.summary) {
        if CLOSED_KEYWORDS.contains(&token.as_str()) {
            is_closed = true;
        } else if HOURS_KEYWORDS.contains(&token.as_str()) {
            is_hours = true;
        }
    }

    if is_closed {
        return Some(MarkerKind::Closed);
    }
    if !is_hours {
        return None;
    }

    if let Some((open, close)) = parse_hours_range(&event.summary) {
        return Some(MarkerKind::SpecialHours { open, close });
    }
    if event.all_day {
        // An hours marker without a usable range carries no window.
        return None;
    }
    let open = event.start.with_timezone(&tz).time();
    let close = event.end.with_timezone(&tz).time();
    (open < close).then_some(MarkerKind::SpecialHours { open, close })
}

fn is_marker_summary(summary: &str) -> bool {
    summary_tokens(summary).any(|t| CLOSED_KEYWORDS.contains(&t.as_str()) || HOURS_KEYWORDS.contains(&t.as_str()))
}

/// Splits provider events, in provider order, into markers and busy intervals.
/// Cancelled events are dropped; markers never count as busy.
pub fn classify_events(events: &[CalendarEvent], tz: Tz) -> ClassifiedEvents {
    let mut classified = ClassifiedEvents::default();

    for event in events {
        if event.is_cancelled() {
            continue;
        }

        if is_marker_summary(&event.summary) {
            if let Some(kind) = classify_marker(event, tz) {
                classified.markers.push(SystemMarker {
                    event_id: event.id.clone(),
                    summary: event.summary.clone(),
                    kind,
                });
            } else {
                debug!("Ignoring unusable marker event {} '{}'", event.id, event.summary);
            }
            continue;
        }

        if event.all_day {
            continue;
        }

        classified.busy.push(BusyInterval {
            start: event.start.with_timezone(&tz).naive_local(),
            end: event.end.with_timezone(&tz).naive_local(),
            reference: Some(event.id.clone()),
        });
    }

    classified
}

/// Effective opening window of `business` on `date`.
///
/// The first marker in provider order decides: `Closed` short-circuits, special
/// hours replace the default window. Without markers the default window applies.
pub fn resolve(business: &Business, date: NaiveDate, markers: &[SystemMarker]) -> Result<DayHours, AppError> {
    if let Some(marker) = markers.first() {
        return Ok(match marker.kind {
            MarkerKind::Closed => {
                debug!("{} closed on {} by marker '{}'", business.id, date, marker.summary);
                DayHours::Closed
            }
            MarkerKind::SpecialHours { open, close } => {
                debug!("{} special hours on {}: {}-{}", business.id, date, open, close);
                DayHours::Open(TimeWindow {
                    start: date.and_time(open),
                    end: date.and_time(close),
                })
            }
        });
    }

    Ok(DayHours::Open(business.default_window(date)?))
}
