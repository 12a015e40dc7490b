use crate::domain::models::{
    booking::Booking, business::Business,
    calendar::{CalendarEvent, NewCalendarEvent},
    slot::Buffers,
};
use crate::domain::services::intent::Intent;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

#[async_trait]
pub trait BusinessRepository: Send + Sync {
    /// Inserts the business together with its services.
    async fn create(&self, business: &Business) -> Result<Business, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Business>, AppError>;
    async fn find_by_messaging_address(&self, address: &str) -> Result<Option<Business>, AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn list_for_customer(&self, business_id: &str, customer_id: &str) -> Result<Vec<Booking>, AppError>;
    /// Confirmed bookings of one customer, most recently confirmed first.
    async fn list_confirmed_for_customer(&self, business_id: &str, customer_id: &str) -> Result<Vec<Booking>, AppError>;
    async fn find_latest_pending(&self, business_id: &str, customer_id: &str, now: DateTime<Utc>) -> Result<Option<Booking>, AppError>;
    /// Confirmed bookings and unexpired holds overlapping `[start, end)`.
    async fn list_active_in_range(&self, business_id: &str, start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
    /// Moves every confirmed booking of the customer to `superseded` and returns them.
    async fn supersede_confirmed(&self, business_id: &str, customer_id: &str, now: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
    async fn supersede(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Booking>, AppError>;
    /// `pending -> confirmed`. Rejects when the row is no longer pending, or when a
    /// confirmed booking or an older unexpired hold of another customer lies within
    /// `buffers` of the slot.
    async fn confirm(&self, id: &str, calendar_ref: &str, buffers: Buffers, now: DateTime<Utc>) -> Result<Booking, AppError>;
    /// Atomically supersedes `old_id` and confirms `new_id`.
    async fn replace_confirmed(&self, old_id: &str, new_id: &str, calendar_ref: &str, buffers: Buffers, now: DateTime<Utc>) -> Result<Booking, AppError>;
    /// `pending|confirmed -> cancelled`. `None` when the row was already terminal.
    async fn cancel(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Booking>, AppError>;
    async fn release_calendar_ref(&self, id: &str) -> Result<(), AppError>;
    async fn expire_pending(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
    /// Terminal bookings still holding a calendar reference.
    async fn list_stale_calendar_refs(&self, limit: i64) -> Result<Vec<Booking>, AppError>;
}

/// One calendar of the external provider.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn list_events(&self, time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Result<Vec<CalendarEvent>, AppError>;
    async fn create_event(&self, event: &NewCalendarEvent) -> Result<String, AppError>;
    /// Deleting an already missing event succeeds.
    async fn delete_event(&self, external_id: &str) -> Result<(), AppError>;
}

/// Hands out a provider client scoped to a business.
pub trait CalendarRegistry: Send + Sync {
    fn for_business(&self, business: &Business) -> Result<Arc<dyn CalendarProvider>, AppError>;
}

#[async_trait]
pub trait IntentRouter: Send + Sync {
    async fn route(&self, business: &Business, text: &str, today: NaiveDate) -> Intent;
}
