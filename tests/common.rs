#![allow(dead_code)]

use booking_assistant::{
    api::router::create_router,
    config::Config,
    domain::models::business::{Business, NewBusinessParams},
    domain::models::calendar::{CalendarEvent, NewCalendarEvent},
    domain::ports::{CalendarProvider, CalendarRegistry},
    error::AppError,
    infra::factory::build_state,
    infra::repositories::{sqlite_booking_repo::SqliteBookingRepo, sqlite_business_repo::SqliteBusinessRepo},
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const BUSINESS_ADDRESS: &str = "+390000000001";
pub const CALENDAR_ID: &str = "cal-main";
pub const PROVIDER_TIMEOUT_MS: u64 = 300;

/// In-memory calendar with scriptable failures and latency.
#[derive(Default)]
pub struct FakeCalendar {
    events: Mutex<Vec<CalendarEvent>>,
    next_id: AtomicU64,
    fail_creates: AtomicUsize,
    fail_lists: AtomicBool,
    fail_deletes: AtomicBool,
    delay_ms: AtomicU64,
    stall_after_create_ms: AtomicU64,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl FakeCalendar {
    pub fn events(&self) -> Vec<CalendarEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn has_event(&self, id: &str) -> bool {
        self.events.lock().unwrap().iter().any(|e| e.id == id)
    }

    /// Adds an event as if someone created it in the calendar directly.
    pub fn insert(&self, summary: &str, start: DateTime<Utc>, end: DateTime<Utc>, all_day: bool) -> String {
        self.push(summary, "", start, end, all_day)
    }

    fn push(&self, summary: &str, description: &str, start: DateTime<Utc>, end: DateTime<Utc>, all_day: bool) -> String {
        let id = format!("ext-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.events.lock().unwrap().push(CalendarEvent {
            id: id.clone(),
            summary: summary.to_string(),
            description: description.to_string(),
            status: Some("confirmed".to_string()),
            start,
            end,
            all_day,
        });
        id
    }

    pub fn cancel_event(&self, id: &str) {
        if let Some(event) = self.events.lock().unwrap().iter_mut().find(|e| e.id == id) {
            event.status = Some("cancelled".to_string());
        }
    }

    pub fn fail_next_creates(&self, n: usize) {
        self.fail_creates.store(n, Ordering::SeqCst);
    }

    pub fn set_fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Creates land in the calendar, then the call hangs for `stall`.
    pub fn stall_after_create(&self, stall: Duration) {
        self.stall_after_create_ms.store(stall.as_millis() as u64, Ordering::SeqCst);
    }

    async fn maybe_sleep(&self) {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

#[async_trait]
impl CalendarProvider for FakeCalendar {
    async fn list_events(&self, time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Result<Vec<CalendarEvent>, AppError> {
        self.maybe_sleep().await;
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(AppError::ProviderWriteFailed("calendar unreachable".into()));
        }
        Ok(self.events.lock().unwrap()
            .iter()
            .filter(|e| e.start < time_max && e.end > time_min)
            .cloned()
            .collect())
    }

    async fn create_event(&self, event: &NewCalendarEvent) -> Result<String, AppError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_sleep().await;
        let remaining = self.fail_creates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_creates.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::ProviderWriteFailed("calendar rejected the event".into()));
        }
        let id = self.push(&event.summary, &event.description, event.start, event.end, false);
        let stall = self.stall_after_create_ms.load(Ordering::SeqCst);
        if stall > 0 {
            tokio::time::sleep(Duration::from_millis(stall)).await;
        }
        Ok(id)
    }

    async fn delete_event(&self, external_id: &str) -> Result<(), AppError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_sleep().await;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::ProviderWriteFailed("calendar delete failed".into()));
        }
        self.events.lock().unwrap().retain(|e| e.id != external_id);
        Ok(())
    }
}

pub struct FakeRegistry {
    pub calendar: Arc<FakeCalendar>,
}

impl CalendarRegistry for FakeRegistry {
    fn for_business(&self, business: &Business) -> Result<Arc<dyn CalendarProvider>, AppError> {
        match business.calendar_id {
            Some(_) => Ok(self.calendar.clone()),
            None => Err(AppError::Configuration(format!("Business {} has no calendar configured", business.id))),
        }
    }
}

pub fn test_config(db_url: &str) -> Config {
    Config {
        database_url: db_url.to_string(),
        port: 0,
        calendar_service_url: "http://localhost".to_string(),
        calendar_service_token: "token".to_string(),
        provider_timeout_ms: PROVIDER_TIMEOUT_MS,
        slot_step_minutes: 30,
        buffer_before_minutes: 0,
        buffer_after_minutes: 10,
        min_booking_lead_minutes: 15,
        pending_ttl_minutes: 20,
        janitor_interval_secs: 60,
        retry_max_attempts: 2,
        retry_max_total_ms: 3000,
    }
}

pub fn salon_params() -> NewBusinessParams {
    NewBusinessParams {
        messaging_address: BUSINESS_ADDRESS.to_string(),
        name: "Salone Aurora".to_string(),
        address: Some("Via Roma 1, Milano".to_string()),
        phone: Some("+39 02 1234567".to_string()),
        email: None,
        description: Some("Hair salon".to_string()),
        timezone: "Europe/Rome".to_string(),
        open_hour: 9,
        close_hour: 18,
        calendar_id: Some(CALENDAR_ID.to_string()),
        booking_enabled: true,
        services: vec![("Haircut".to_string(), 60), ("Beard Trim".to_string(), 30)],
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

/// A UTC instant from Europe/Rome wall-clock.
pub fn rome(date_str: &str, time_str: &str) -> DateTime<Utc> {
    chrono_tz::Europe::Rome
        .from_local_datetime(&date(date_str).and_time(time(time_str)))
        .unwrap()
        .with_timezone(&Utc)
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub calendar: Arc<FakeCalendar>,
    pub business: Business,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_business(salon_params()).await
    }

    pub async fn with_business(params: NewBusinessParams) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let calendar = Arc::new(FakeCalendar::default());
        let business_repo = Arc::new(SqliteBusinessRepo::new(pool.clone()));
        let state = Arc::new(build_state(
            &test_config(&db_url),
            business_repo.clone(),
            Arc::new(SqliteBookingRepo::new(pool.clone())),
            Arc::new(FakeRegistry { calendar: calendar.clone() }),
        ));

        let business = state.business_repo.create(&Business::new(params)).await
            .expect("Failed to seed business");

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            calendar,
            business,
        }
    }

    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, json)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}
