use crate::domain::models::calendar::{CalendarEvent, NewCalendarEvent};
use crate::domain::ports::CalendarProvider;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, instrument};

/// One calendar behind the calendar gateway.
pub struct HttpCalendarProvider {
    client: Client,
    base_url: String,
    token: String,
    calendar_id: String,
}

#[derive(Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

#[derive(Deserialize)]
struct CreatedEvent {
    id: String,
}

fn transport_error(op: &str, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::ProviderTimeout(format!("Calendar {} timed out: {}", op, e))
    } else {
        let msg = format!("Calendar {} connection error: {}", op, e);
        error!("{}", msg);
        AppError::ProviderWriteFailed(msg)
    }
}

async fn status_error(op: &str, res: Response) -> AppError {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    let msg = format!("Calendar {} failed. Status: {}, Body: {}", op, status, text);
    error!("{}", msg);
    AppError::ProviderWriteFailed(msg)
}

impl HttpCalendarProvider {
    pub fn new(client: Client, base_url: String, token: String, calendar_id: String) -> Self {
        Self { client, base_url, token, calendar_id }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url.trim_end_matches('/'), self.calendar_id)
    }
}

#[async_trait]
impl CalendarProvider for HttpCalendarProvider {
    #[instrument(skip(self), fields(calendar_id = %self.calendar_id))]
    async fn list_events(&self, time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Result<Vec<CalendarEvent>, AppError> {
        let res = self.client.get(self.events_url())
            .bearer_auth(&self.token)
            .query(&[
                ("timeMin", time_min.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("timeMax", time_max.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ])
            .send()
            .await
            .map_err(|e| transport_error("list", e))?;

        if !res.status().is_success() {
            return Err(status_error("list", res).await);
        }

        let page: EventsPage = res.json().await.map_err(|e| {
            AppError::ProviderWriteFailed(format!("Calendar list returned malformed JSON: {}", e))
        })?;
        debug!("Fetched {} events", page.items.len());
        Ok(page.items)
    }

    async fn create_event(&self, event: &NewCalendarEvent) -> Result<String, AppError> {
        let res = self.client.post(self.events_url())
            .bearer_auth(&self.token)
            .json(event)
            .send()
            .await
            .map_err(|e| transport_error("create", e))?;

        if !res.status().is_success() {
            return Err(status_error("create", res).await);
        }

        let created: CreatedEvent = res.json().await.map_err(|e| {
            AppError::ProviderWriteFailed(format!("Calendar create returned malformed JSON: {}", e))
        })?;
        Ok(created.id)
    }

    async fn delete_event(&self, external_id: &str) -> Result<(), AppError> {
        let res = self.client.delete(format!("{}/{}", self.events_url(), external_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| transport_error("delete", e))?;

        match res.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                debug!("Calendar event {} already gone", external_id);
                Ok(())
            }
            _ => Err(status_error("delete", res).await),
        }
    }
}
