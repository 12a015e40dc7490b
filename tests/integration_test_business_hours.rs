mod common;

use booking_assistant::domain::models::calendar::CalendarEvent;
use booking_assistant::domain::models::business::Business;
use booking_assistant::domain::models::slot::{DayHours, MarkerKind, TimeWindow};
use booking_assistant::domain::services::business_hours::{classify_events, parse_hours_range, resolve};
use chrono::{DateTime, Utc};
use common::{date, rome, salon_params, time, TestApp};

fn event(id: &str, summary: &str, start: DateTime<Utc>, end: DateTime<Utc>, all_day: bool) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        summary: summary.to_string(),
        description: String::new(),
        status: Some("confirmed".to_string()),
        start,
        end,
        all_day,
    }
}

fn all_day(id: &str, summary: &str) -> CalendarEvent {
    event(id, summary, rome("2030-03-11", "00:00"), rome("2030-03-12", "00:00"), true)
}

fn salon() -> Business {
    Business::new(salon_params())
}

#[test]
fn test_parse_hours_range() {
    assert_eq!(parse_hours_range("ORARI: 10:00-20:00"), Some((time("10:00"), time("20:00"))));
    assert_eq!(parse_hours_range("Open 8.30-12.00 only"), Some((time("08:30"), time("12:00"))));
    assert_eq!(parse_hours_range("ORARI (14:00-19:00)"), Some((time("14:00"), time("19:00"))));
    assert_eq!(parse_hours_range("ORARI 20:00-10:00"), None);
    assert_eq!(parse_hours_range("CHIUSO"), None);
}

#[test]
fn test_closed_markers_in_both_languages() {
    let tz = chrono_tz::Europe::Rome;
    for summary in ["CHIUSO", "Closed for inventory", "ferie estive", "VACATION", "Holiday"] {
        let classified = classify_events(&[all_day("m1", summary)], tz);
        assert_eq!(classified.markers.len(), 1, "{}", summary);
        assert_eq!(classified.markers[0].kind, MarkerKind::Closed);
        assert!(classified.busy.is_empty());
    }
}

#[test]
fn test_keywords_match_whole_words_only() {
    let tz = chrono_tz::Europe::Rome;
    let classified = classify_events(
        &[event("e1", "Disclosed results meeting", rome("2030-03-11", "10:00"), rome("2030-03-11", "11:00"), false)],
        tz,
    );
    assert!(classified.markers.is_empty());
    assert_eq!(classified.busy.len(), 1);
}

#[test]
fn test_special_hours_from_summary_range() {
    let classified = classify_events(&[all_day("m1", "ORARI: 10:00-20:00")], chrono_tz::Europe::Rome);
    assert_eq!(
        classified.markers[0].kind,
        MarkerKind::SpecialHours { open: time("10:00"), close: time("20:00") }
    );
}

#[test]
fn test_special_hours_from_timed_event_span() {
    let classified = classify_events(
        &[event("m1", "WORKING_HOURS", rome("2030-03-11", "14:00"), rome("2030-03-11", "21:00"), false)],
        chrono_tz::Europe::Rome,
    );
    assert_eq!(
        classified.markers[0].kind,
        MarkerKind::SpecialHours { open: time("14:00"), close: time("21:00") }
    );
    assert!(classified.busy.is_empty(), "markers never count as busy");
}

#[test]
fn test_cancelled_and_all_day_events_are_ignored() {
    let mut cancelled = all_day("m1", "CHIUSO");
    cancelled.status = Some("cancelled".to_string());
    let mut cancelled_busy = event("e1", "Mario", rome("2030-03-11", "10:00"), rome("2030-03-11", "11:00"), false);
    cancelled_busy.status = Some("cancelled".to_string());

    let classified = classify_events(&[cancelled, cancelled_busy, all_day("e2", "Staff birthday")], chrono_tz::Europe::Rome);
    assert!(classified.markers.is_empty());
    assert!(classified.busy.is_empty());
}

#[test]
fn test_busy_intervals_are_local_wall_clock() {
    let classified = classify_events(
        &[event("e1", "Haircut - Anna", rome("2030-03-11", "10:00"), rome("2030-03-11", "11:00"), false)],
        chrono_tz::Europe::Rome,
    );
    assert_eq!(classified.busy[0].start, date("2030-03-11").and_time(time("10:00")));
    assert_eq!(classified.busy[0].end, date("2030-03-11").and_time(time("11:00")));
    assert_eq!(classified.busy[0].reference.as_deref(), Some("e1"));
}

#[test]
fn test_resolve_defaults_without_markers() {
    let hours = resolve(&salon(), date("2030-03-11"), &[]).unwrap();
    assert_eq!(
        hours,
        DayHours::Open(TimeWindow {
            start: date("2030-03-11").and_time(time("09:00")),
            end: date("2030-03-11").and_time(time("18:00")),
        })
    );
}

#[test]
fn test_first_marker_wins() {
    let tz = chrono_tz::Europe::Rome;
    let closed_first = classify_events(&[all_day("m1", "CHIUSO"), all_day("m2", "ORARI 10:00-12:00")], tz);
    assert_eq!(resolve(&salon(), date("2030-03-11"), &closed_first.markers).unwrap(), DayHours::Closed);

    let hours_first = classify_events(&[all_day("m2", "ORARI 10:00-12:00"), all_day("m1", "CHIUSO")], tz);
    assert_eq!(
        resolve(&salon(), date("2030-03-11"), &hours_first.markers).unwrap(),
        DayHours::Open(TimeWindow {
            start: date("2030-03-11").and_time(time("10:00")),
            end: date("2030-03-11").and_time(time("12:00")),
        })
    );
}

#[test]
fn test_closed_marker_short_circuits_even_with_broken_hours() {
    let mut business = salon();
    business.open_hour = 20;
    business.close_hour = 8;
    let classified = classify_events(&[all_day("m1", "CHIUSO")], chrono_tz::Europe::Rome);

    assert_eq!(resolve(&business, date("2030-03-11"), &classified.markers).unwrap(), DayHours::Closed);
    assert!(resolve(&business, date("2030-03-11"), &[]).is_err());
}

#[tokio::test]
async fn test_quote_on_closed_day_is_empty() {
    let app = TestApp::new().await;
    app.calendar.insert("CHIUSO", rome("2030-03-11", "00:00"), rome("2030-03-12", "00:00"), true);

    let slots = app.state.bookings
        .quote(&app.business, "Haircut", date("2030-03-11"), rome("2030-03-01", "08:00"))
        .await
        .unwrap();
    assert!(slots.is_empty());

    let next_day = app.state.bookings
        .quote(&app.business, "Haircut", date("2030-03-12"), rome("2030-03-01", "08:00"))
        .await
        .unwrap();
    assert_eq!(next_day.len(), 17);
}

#[tokio::test]
async fn test_quote_uses_special_hours() {
    let app = TestApp::new().await;
    app.calendar.insert("ORARI: 14:00-16:00", rome("2030-03-11", "00:00"), rome("2030-03-12", "00:00"), true);

    let slots = app.state.bookings
        .quote(&app.business, "Haircut", date("2030-03-11"), rome("2030-03-01", "08:00"))
        .await
        .unwrap();
    let starts: Vec<String> = slots.iter().map(|s| s.start.format("%H:%M").to_string()).collect();
    assert_eq!(starts, vec!["14:00", "14:30", "15:00"]);
}

#[tokio::test]
async fn test_quote_falls_back_to_default_hours_when_calendar_is_down() {
    let app = TestApp::new().await;
    app.calendar.insert("CHIUSO", rome("2030-03-11", "00:00"), rome("2030-03-12", "00:00"), true);
    app.calendar.set_fail_lists(true);

    let slots = app.state.bookings
        .quote(&app.business, "Haircut", date("2030-03-11"), rome("2030-03-01", "08:00"))
        .await
        .unwrap();
    assert_eq!(slots.len(), 17);
}
