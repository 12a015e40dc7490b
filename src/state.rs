use std::sync::Arc;
use crate::domain::ports::{BookingRepository, BusinessRepository, CalendarRegistry};
use crate::domain::services::assistant::Assistant;
use crate::domain::services::booking_lifecycle::BookingManager;
use crate::domain::services::retry::RetryPolicy;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub business_repo: Arc<dyn BusinessRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub calendars: Arc<dyn CalendarRegistry>,
    pub bookings: Arc<BookingManager>,
    pub assistant: Arc<Assistant>,
    pub retry: RetryPolicy,
}
