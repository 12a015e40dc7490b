mod common;

use booking_assistant::background::{run_sweep, SweepReport};
use booking_assistant::domain::models::booking::BookingStatus;
use booking_assistant::domain::services::booking_lifecycle::BookingRequest;
use booking_assistant::error::AppError;
use chrono::{DateTime, Duration, Utc};
use common::{date, rome, time, TestApp};

fn now() -> DateTime<Utc> {
    rome("2030-03-01", "08:00")
}

fn request(customer: &str, at: &str) -> BookingRequest {
    BookingRequest {
        customer_id: customer.to_string(),
        customer_name: None,
        service: "Haircut".to_string(),
        date: date("2030-03-11"),
        time: time(at),
    }
}

#[tokio::test]
async fn test_hold_then_confirm() {
    let app = TestApp::new().await;
    let held = app.state.bookings.hold(&app.business, &request("alice", "09:00"), now()).await.unwrap();

    assert_eq!(held.status, BookingStatus::Pending);
    assert_eq!(held.expires_at, Some(now() + Duration::minutes(20)));
    assert!(held.external_calendar_ref.is_none());
    assert!(app.calendar.events().is_empty());

    let confirmed = app.state.bookings
        .confirm_hold(&app.business, "alice", now() + Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(confirmed.id, held.id);
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert!(confirmed.expires_at.is_none());
    assert!(app.calendar.has_event(confirmed.external_calendar_ref.as_deref().unwrap()));
}

#[tokio::test]
async fn test_expired_hold_cannot_be_confirmed() {
    let app = TestApp::new().await;
    app.state.bookings.hold(&app.business, &request("alice", "09:00"), now()).await.unwrap();

    let err = app.state.bookings
        .confirm_hold(&app.business, "alice", now() + Duration::minutes(21))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_hold_is_dropped_when_calendar_fills_the_slot() {
    let app = TestApp::new().await;
    let held = app.state.bookings.hold(&app.business, &request("alice", "09:00"), now()).await.unwrap();
    app.calendar.insert("Walk-in", rome("2030-03-11", "09:00"), rome("2030-03-11", "10:00"), false);

    let err = app.state.bookings.confirm_hold(&app.business, "alice", now()).await.unwrap_err();
    assert!(matches!(err, AppError::SlotUnavailable(_)));

    let stored = app.state.booking_repo.find_by_id(&held.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_held_slot_is_busy_for_other_customers() {
    let app = TestApp::new().await;
    let held = app.state.bookings.hold(&app.business, &request("alice", "10:00"), now()).await.unwrap();

    let slots = app.state.bookings.quote(&app.business, "Haircut", date("2030-03-11"), now()).await.unwrap();
    assert!(slots.iter().all(|s| s.start != date("2030-03-11").and_time(time("10:00"))));

    let err = app.state.bookings.book(&app.business, &request("bob", "10:00"), now()).await.unwrap_err();
    assert!(matches!(err, AppError::SlotUnavailable(_)), "{:?}", err);

    let confirmed = app.state.bookings.confirm_hold(&app.business, "alice", now()).await.unwrap();
    assert_eq!(confirmed.id, held.id);
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_expired_hold_frees_the_slot() {
    let app = TestApp::new().await;
    app.state.bookings.hold(&app.business, &request("alice", "10:00"), now()).await.unwrap();

    let later = now() + Duration::minutes(21);
    let booked = app.state.bookings.book(&app.business, &request("bob", "10:00"), later).await.unwrap();
    assert_eq!(booked.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_sweep_expires_only_overdue_pending_bookings() {
    let app = TestApp::new().await;
    let stale = app.state.bookings.hold(&app.business, &request("alice", "09:00"), now()).await.unwrap();
    let fresh = app.state.bookings
        .hold(&app.business, &request("bob", "12:00"), now() + Duration::minutes(15))
        .await
        .unwrap();
    let confirmed = app.state.bookings
        .book(&app.business, &request("carol", "15:00"), now())
        .await
        .unwrap();

    let report = run_sweep(&app.state, now() + Duration::minutes(25)).await.unwrap();
    assert_eq!(report, SweepReport { expired: 1, released: 0 });

    let repo = &app.state.booking_repo;
    assert_eq!(repo.find_by_id(&stale.id).await.unwrap().unwrap().status, BookingStatus::Cancelled);
    assert_eq!(repo.find_by_id(&fresh.id).await.unwrap().unwrap().status, BookingStatus::Pending);
    assert_eq!(repo.find_by_id(&confirmed.id).await.unwrap().unwrap().status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_sweep_retries_failed_calendar_releases() {
    let app = TestApp::new().await;
    let first = app.state.bookings.book(&app.business, &request("alice", "09:00"), now()).await.unwrap();
    let first_ref = first.external_calendar_ref.clone().unwrap();

    app.calendar.set_fail_deletes(true);
    app.state.bookings.book(&app.business, &request("alice", "14:00"), now()).await.unwrap();

    let superseded = app.state.booking_repo.find_by_id(&first.id).await.unwrap().unwrap();
    assert_eq!(superseded.status, BookingStatus::Superseded);
    assert_eq!(superseded.external_calendar_ref.as_deref(), Some(first_ref.as_str()));
    assert!(app.calendar.has_event(&first_ref));

    let report = run_sweep(&app.state, now()).await.unwrap();
    assert_eq!(report.released, 0);

    app.calendar.set_fail_deletes(false);
    let report = run_sweep(&app.state, now()).await.unwrap();
    assert_eq!(report.released, 1);
    assert!(!app.calendar.has_event(&first_ref));
    let released = app.state.booking_repo.find_by_id(&first.id).await.unwrap().unwrap();
    assert!(released.external_calendar_ref.is_none());
}
