use std::env;
use std::time::Duration;

use crate::domain::models::slot::Buffers;
use crate::domain::services::retry::RetryPolicy;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub calendar_service_url: String,
    pub calendar_service_token: String,
    pub provider_timeout_ms: u64,
    pub slot_step_minutes: i64,
    pub buffer_before_minutes: i64,
    pub buffer_after_minutes: i64,
    pub min_booking_lead_minutes: i64,
    pub pending_ttl_minutes: i64,
    pub janitor_interval_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_max_total_ms: u64,
}

/// Knobs of the availability and commit rules, detached from the env layer.
#[derive(Debug, Clone, Copy)]
pub struct BookingPolicy {
    pub step_minutes: i64,
    pub buffer_before_minutes: i64,
    pub buffer_after_minutes: i64,
    pub min_lead_minutes: i64,
    pub pending_ttl_minutes: i64,
    pub provider_timeout: Duration,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            step_minutes: 30,
            buffer_before_minutes: 0,
            buffer_after_minutes: 10,
            min_lead_minutes: 15,
            pending_ttl_minutes: 20,
            provider_timeout: Duration::from_secs(5),
        }
    }
}

impl BookingPolicy {
    pub fn buffers(&self) -> Buffers {
        Buffers {
            before: chrono::Duration::minutes(self.buffer_before_minutes.max(0)),
            after: chrono::Duration::minutes(self.buffer_after_minutes.max(0)),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| panic!("{} must be a number", key)),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env_or("PORT", 3000),
            calendar_service_url: env::var("CALENDAR_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8100/api/v1".to_string()),
            calendar_service_token: env::var("CALENDAR_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            provider_timeout_ms: env_or("PROVIDER_TIMEOUT_MS", 5000),
            slot_step_minutes: env_or("SLOT_STEP_MINUTES", 30),
            buffer_before_minutes: env_or("BUFFER_BEFORE_MINUTES", 0),
            buffer_after_minutes: env_or("BUFFER_AFTER_MINUTES", 10),
            min_booking_lead_minutes: env_or("MIN_BOOKING_LEAD_MINUTES", 15),
            pending_ttl_minutes: env_or("PENDING_TTL_MINUTES", 20),
            janitor_interval_secs: env_or("JANITOR_INTERVAL_SECS", 60),
            retry_max_attempts: env_or("RETRY_MAX_ATTEMPTS", 2),
            retry_max_total_ms: env_or("RETRY_MAX_TOTAL_MS", 15000),
        }
    }

    pub fn booking_policy(&self) -> BookingPolicy {
        BookingPolicy {
            step_minutes: self.slot_step_minutes,
            buffer_before_minutes: self.buffer_before_minutes,
            buffer_after_minutes: self.buffer_after_minutes,
            min_lead_minutes: self.min_booking_lead_minutes,
            pending_ttl_minutes: self.pending_ttl_minutes,
            provider_timeout: Duration::from_millis(self.provider_timeout_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_max_attempts, Duration::from_millis(self.retry_max_total_ms))
    }
}
