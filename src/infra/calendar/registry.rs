use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::domain::models::business::Business;
use crate::domain::ports::{CalendarProvider, CalendarRegistry};
use crate::error::AppError;
use crate::infra::calendar::http_calendar_provider::HttpCalendarProvider;

/// Builds a gateway client per business over one shared connection pool.
pub struct HttpCalendarRegistry {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpCalendarRegistry {
    pub fn new(base_url: String, token: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            token,
        }
    }
}

impl CalendarRegistry for HttpCalendarRegistry {
    fn for_business(&self, business: &Business) -> Result<Arc<dyn CalendarProvider>, AppError> {
        let calendar_id = business.calendar_id.clone().ok_or_else(|| {
            AppError::Configuration(format!("Business {} has no calendar configured", business.id))
        })?;

        Ok(Arc::new(HttpCalendarProvider::new(
            self.client.clone(),
            self.base_url.clone(),
            self.token.clone(),
            calendar_id,
        )))
    }
}
