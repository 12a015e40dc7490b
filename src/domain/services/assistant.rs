use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info, info_span, warn, Instrument};

use crate::domain::models::business::Business;
use crate::domain::ports::{BusinessRepository, IntentRouter};
use crate::domain::services::booking_lifecycle::{BookingManager, BookingRequest, CancelOutcome};
use crate::domain::services::intent::Intent;
use crate::domain::services::retry::RetryPolicy;
use crate::error::AppError;

const HELP_REPLY: &str = "I can show free times, book, move or cancel an appointment, \
or tell you about us. Try \"free slots tomorrow\" or \"book 2024-03-10 at 14:30\".";

/// Chat front of the booking core: one inbound message in, one text reply out.
pub struct Assistant {
    businesses: Arc<dyn BusinessRepository>,
    router: Arc<dyn IntentRouter>,
    manager: Arc<BookingManager>,
    retry: RetryPolicy,
}

fn log_failure(op: &str, err: &AppError) {
    match err {
        AppError::SlotUnavailable(_) | AppError::Conflict(_) => info!("{} rejected: {}", op, err),
        e if e.is_transient() => warn!("{} failed after retries: {}", op, err),
        _ => error!("{} failed: {}", op, err),
    }
}

fn service_list(business: &Business) -> String {
    business.services.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ")
}

impl Assistant {
    pub fn new(
        businesses: Arc<dyn BusinessRepository>,
        router: Arc<dyn IntentRouter>,
        manager: Arc<BookingManager>,
        retry: RetryPolicy,
    ) -> Self {
        Self { businesses, router, manager, retry }
    }

    /// `None` when no business listens on `business_address`.
    pub async fn handle(
        &self,
        business_address: &str,
        customer_address: &str,
        customer_name: Option<&str>,
        text: &str,
    ) -> Option<String> {
        self.handle_at(business_address, customer_address, customer_name, text, Utc::now()).await
    }

    pub async fn handle_at(
        &self,
        business_address: &str,
        customer_address: &str,
        customer_name: Option<&str>,
        text: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let business = match self.businesses.find_by_messaging_address(business_address).await {
            Ok(Some(business)) => business,
            Ok(None) => {
                warn!("No business registered for address {}", business_address);
                return None;
            }
            Err(e) => {
                error!("Business lookup failed for {}: {}", business_address, e);
                return Some(e.user_message().to_string());
            }
        };

        let span = info_span!("chat_message", business_id = %business.id, customer = %customer_address);
        async move {
            let today = now.with_timezone(&business.tz()).date_naive();
            let intent = self.router.route(&business, text, today).await;
            info!("Routed message to {:?}", intent);
            Some(self.dispatch(&business, customer_address, customer_name, intent, now).await)
        }
        .instrument(span)
        .await
    }

    async fn dispatch(
        &self,
        business: &Business,
        customer_id: &str,
        customer_name: Option<&str>,
        intent: Intent,
        now: DateTime<Utc>,
    ) -> String {
        match intent {
            Intent::QueryAvailability { service, date } => {
                let Some(service) = service else {
                    return format!("Which service are you interested in? We offer: {}.", service_list(business));
                };
                let Some(date) = date else {
                    return "For which day? Please give a date like 2024-03-10 or \"tomorrow\".".to_string();
                };
                self.reply_availability(business, &service, date, now).await
            }
            Intent::Book { service, date, time } => {
                let Some(service) = service else {
                    return format!("Which service would you like to book? We offer: {}.", service_list(business));
                };
                let (Some(date), Some(time)) = (date, time) else {
                    return "Please tell me the day and time, for example \"2024-03-10 at 14:30\".".to_string();
                };
                let request = BookingRequest {
                    customer_id: customer_id.to_string(),
                    customer_name: customer_name.map(str::to_string),
                    service,
                    date,
                    time,
                };
                match self.retry.run("book", || self.manager.book(business, &request, now)).await {
                    Ok(booking) => format!(
                        "Booked: {} on {} at {}. See you then!",
                        booking.service_name, booking.date, booking.time.format("%H:%M")
                    ),
                    Err(e) => {
                        log_failure("book", &e);
                        e.user_message().to_string()
                    }
                }
            }
            Intent::Modify { date, time } => {
                let (Some(date), Some(time)) = (date, time) else {
                    return "To move your appointment, tell me the new day and time.".to_string();
                };
                match self.retry.run("modify", || self.manager.modify(business, customer_id, date, time, now)).await {
                    Ok(booking) => format!(
                        "Done, your {} is now on {} at {}.",
                        booking.service_name, booking.date, booking.time.format("%H:%M")
                    ),
                    Err(AppError::NotFound(_)) => "You have no active booking to move.".to_string(),
                    Err(e) => {
                        log_failure("modify", &e);
                        e.user_message().to_string()
                    }
                }
            }
            Intent::Cancel => match self.retry.run("cancel", || self.manager.cancel(business, customer_id, now)).await {
                Ok(CancelOutcome::Cancelled(booking)) => format!(
                    "Your {} on {} at {} has been cancelled.",
                    booking.service_name, booking.date, booking.time.format("%H:%M")
                ),
                Ok(CancelOutcome::NothingToCancel) => "You have no active booking to cancel.".to_string(),
                Err(e) => {
                    log_failure("cancel", &e);
                    e.user_message().to_string()
                }
            },
            Intent::Info => {
                let info = self.manager.business_info(business);
                let mut reply = format!("{}\nOpening hours: {} ({})", info.name, info.opening_hours, info.timezone);
                if let Some(address) = &info.address {
                    reply.push_str(&format!("\nAddress: {}", address));
                }
                if let Some(phone) = &info.phone {
                    reply.push_str(&format!("\nPhone: {}", phone));
                }
                let services: Vec<String> = info.services
                    .iter()
                    .map(|s| format!("{} ({} min)", s.name, s.duration_minutes))
                    .collect();
                if !services.is_empty() {
                    reply.push_str(&format!("\nServices: {}", services.join(", ")));
                }
                reply
            }
            Intent::Unknown => HELP_REPLY.to_string(),
        }
    }

    async fn reply_availability(&self, business: &Business, service: &str, date: NaiveDate, now: DateTime<Utc>) -> String {
        match self.retry.run("quote", || self.manager.quote(business, service, date, now)).await {
            Ok(slots) if slots.is_empty() => format!("Sorry, there are no free times for {} on {}.", service, date),
            Ok(slots) => {
                let times: Vec<String> = slots.iter().map(|s| s.start.format("%H:%M").to_string()).collect();
                format!("Free times for {} on {}: {}", service, date, times.join(", "))
            }
            Err(e) => {
                log_failure("quote", &e);
                e.user_message().to_string()
            }
        }
    }
}
