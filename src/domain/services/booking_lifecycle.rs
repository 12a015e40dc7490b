use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use crate::config::BookingPolicy;
use crate::domain::models::booking::{Booking, NewBookingParams};
use crate::domain::models::business::{Business, BusinessInfo, Service};
use crate::domain::models::calendar::{CalendarEvent, NewCalendarEvent};
use crate::domain::models::slot::{BusyInterval, DayHours, Slot};
use crate::domain::ports::{BookingRepository, CalendarProvider, CalendarRegistry};
use crate::domain::services::availability::{generate_slots, SlotRules};
use crate::domain::services::business_hours::{classify_events, resolve, ClassifiedEvents};
use crate::error::AppError;

/// Who wants which slot.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub service: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone)]
pub enum CancelOutcome {
    Cancelled(Booking),
    NothingToCancel,
}

/// UTC bounds of the local calendar day `date` in `tz`.
pub fn local_day_bounds(tz: Tz, date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let start = date.and_hms_opt(0, 0, 0).ok_or(AppError::Internal)?;
    let end = start + Duration::days(1);
    Ok((local_to_utc(tz, start)?, local_to_utc(tz, end)?))
}

fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, AppError> {
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AppError::Validation(format!("{} does not exist in {}", local, tz)))
}

pub struct BookingManager {
    bookings: Arc<dyn BookingRepository>,
    calendars: Arc<dyn CalendarRegistry>,
    policy: BookingPolicy,
}

impl BookingManager {
    pub fn new(bookings: Arc<dyn BookingRepository>, calendars: Arc<dyn CalendarRegistry>, policy: BookingPolicy) -> Self {
        Self { bookings, calendars, policy }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    async fn guarded<T>(&self, op_name: &str, fut: impl Future<Output = Result<T, AppError>>) -> Result<T, AppError> {
        match timeout(self.policy.provider_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::ProviderTimeout(format!(
                "{} took longer than {}ms", op_name, self.policy.provider_timeout.as_millis()
            ))),
        }
    }

    fn service<'a>(&self, business: &'a Business, name: &str) -> Result<&'a Service, AppError> {
        business.find_service(name).ok_or_else(|| {
            AppError::Configuration(format!("Service '{}' is not offered by business {}", name, business.id))
        })
    }

    fn ensure_bookable(&self, business: &Business) -> Result<(), AppError> {
        business.validate()?;
        if !business.booking_enabled {
            return Err(AppError::Configuration(format!("Booking is disabled for business {}", business.id)));
        }
        Ok(())
    }

    /// Free slots for `service` on `date`.
    ///
    /// Confirmed bookings and unexpired holds count as busy, except those of
    /// `own_customer`.
    /// With `degrade`, an unreachable provider falls back to the default window.
    async fn free_slots(
        &self,
        business: &Business,
        service: &Service,
        date: NaiveDate,
        own_customer: Option<&str>,
        degrade: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Slot>, AppError> {
        business.validate()?;
        let tz = business.tz();
        let (day_start, day_end) = local_day_bounds(tz, date)?;
        let provider = self.calendars.for_business(business)?;

        let local = self.bookings.list_active_in_range(&business.id, day_start, day_end, now).await?;
        let local_refs: HashSet<&str> = local
            .iter()
            .filter_map(|b| b.external_calendar_ref.as_deref())
            .collect();

        // Events written for local bookings are covered by `local`; their summaries
        // are never read as markers.
        let classified = match self.guarded("list_events", provider.list_events(day_start, day_end)).await {
            Ok(events) => {
                let foreign: Vec<CalendarEvent> = events
                    .into_iter()
                    .filter(|e| !local_refs.contains(e.id.as_str()))
                    .collect();
                classify_events(&foreign, tz)
            }
            Err(e) if degrade => {
                warn!("Calendar unavailable for {}, using default hours: {}", business.id, e);
                ClassifiedEvents::default()
            }
            Err(e) => return Err(e),
        };

        let window = match resolve(business, date, &classified.markers)? {
            DayHours::Closed => return Ok(Vec::new()),
            DayHours::Open(window) => window,
        };

        let mut busy = classified.busy;
        busy.extend(
            local
                .iter()
                .filter(|b| Some(b.customer_id.as_str()) != own_customer)
                .map(|b| BusyInterval {
                    start: b.start_at.with_timezone(&tz).naive_local(),
                    end: b.end_at.with_timezone(&tz).naive_local(),
                    reference: Some(b.id.clone()),
                }),
        );

        Ok(generate_slots(
            &window,
            service.duration_minutes as i64,
            &busy,
            &SlotRules::from(&self.policy),
            now.with_timezone(&tz).naive_local(),
        ))
    }

    async fn verify_slot(
        &self,
        business: &Business,
        service: &Service,
        date: NaiveDate,
        time: NaiveTime,
        customer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let wanted = date.and_time(time);
        let slots = self.free_slots(business, service, date, Some(customer_id), false, now).await?;
        if slots.iter().any(|s| s.start == wanted) {
            Ok(())
        } else {
            Err(AppError::SlotUnavailable(format!("{} {} is not free for '{}'", date, time.format("%H:%M"), service.name)))
        }
    }

    fn new_pending(&self, business: &Business, service: &Service, request: &BookingRequest, now: DateTime<Utc>) -> Result<Booking, AppError> {
        let start_at = local_to_utc(business.tz(), request.date.and_time(request.time))?;
        Ok(Booking::pending(
            NewBookingParams {
                customer_id: request.customer_id.clone(),
                customer_name: request.customer_name.clone(),
                business_id: business.id.clone(),
                service_id: service.id.clone(),
                service_name: service.name.clone(),
                date: request.date,
                time: request.time,
                duration_minutes: service.duration_minutes,
                start_at,
            },
            now,
            Duration::minutes(self.policy.pending_ttl_minutes),
        ))
    }

    /// Customer-supplied text goes to the description only, never the summary.
    fn calendar_event(&self, business: &Business, booking: &Booking) -> NewCalendarEvent {
        let who = booking.customer_name.as_deref().unwrap_or(&booking.customer_id);
        NewCalendarEvent {
            summary: format!("Appointment: {}", booking.service_name),
            description: format!("Booking {} for {} ({})", booking.id, who, booking.customer_id),
            start: booking.start_at,
            end: booking.end_at,
            timezone: business.timezone.clone(),
        }
    }

    async fn create_event(&self, provider: &dyn CalendarProvider, business: &Business, booking: &Booking) -> Result<String, AppError> {
        let event = self.calendar_event(business, booking);
        match self.guarded("create_event", provider.create_event(&event)).await {
            Ok(reference) => Ok(reference),
            Err(e @ AppError::ProviderTimeout(_)) => {
                self.withdraw_orphans(provider, booking).await;
                Err(e)
            }
            Err(e @ AppError::ProviderWriteFailed(_)) => Err(e),
            Err(e) => Err(AppError::ProviderWriteFailed(e.to_string())),
        }
    }

    /// A timed-out write may still have landed. Deletes every event in the slot
    /// whose description carries the booking id.
    async fn withdraw_orphans(&self, provider: &dyn CalendarProvider, booking: &Booking) {
        let events = match self.guarded("list_events", provider.list_events(booking.start_at, booking.end_at)).await {
            Ok(events) => events,
            Err(e) => {
                error!("Cannot check calendar for an orphaned event of booking {}: {}", booking.id, e);
                return;
            }
        };

        for event in events.iter().filter(|e| e.description.contains(&booking.id)) {
            match self.guarded("delete_event", provider.delete_event(&event.id)).await {
                Ok(()) => info!("Withdrew orphaned calendar event {} of booking {}", event.id, booking.id),
                Err(e) => error!("Orphaned calendar event {} of booking {} survives: {}", event.id, booking.id, e),
            }
        }
    }

    /// Deletes the event behind a terminal booking and clears the reference.
    /// Failures are left for the janitor.
    async fn release_ref(&self, provider: &dyn CalendarProvider, booking: &Booking) {
        let Some(reference) = booking.external_calendar_ref.as_deref() else {
            return;
        };
        match self.guarded("delete_event", provider.delete_event(reference)).await {
            Ok(()) => {
                if let Err(e) = self.bookings.release_calendar_ref(&booking.id).await {
                    warn!("Failed to clear calendar ref of booking {}: {}", booking.id, e);
                }
            }
            Err(e) => warn!("Could not delete calendar event {} of booking {}: {}", reference, booking.id, e),
        }
    }

    async fn discard_pending(&self, booking_id: &str, now: DateTime<Utc>) {
        if let Err(e) = self.bookings.cancel(booking_id, now).await {
            error!("Failed to cancel pending booking {}: {}", booking_id, e);
        }
    }

    /// The customer's confirmed booking. More than one is repaired (older ones
    /// superseded) and reported as `InvariantViolation`.
    async fn current_confirmed(&self, business: &Business, customer_id: &str, now: DateTime<Utc>) -> Result<Option<Booking>, AppError> {
        let mut confirmed = self.bookings.list_confirmed_for_customer(&business.id, customer_id).await?;
        if confirmed.len() <= 1 {
            return Ok(confirmed.pop());
        }

        error!(
            "INVARIANT VIOLATION: {} confirmed bookings for customer {} at business {}",
            confirmed.len(), customer_id, business.id
        );
        let provider = self.calendars.for_business(business)?;
        for stale in confirmed.iter().skip(1) {
            if let Some(superseded) = self.bookings.supersede(&stale.id, now).await? {
                self.release_ref(provider.as_ref(), &superseded).await;
            }
        }
        Err(AppError::InvariantViolation(format!(
            "customer {} had {} confirmed bookings at business {}; kept {}",
            customer_id, confirmed.len(), business.id, confirmed[0].id
        )))
    }

    /// Supersede, write the provider event, confirm. The pending row is cancelled on failure.
    async fn commit(&self, business: &Business, pending: Booking, now: DateTime<Utc>) -> Result<Booking, AppError> {
        let provider = self.calendars.for_business(business)?;

        let superseded = self.bookings.supersede_confirmed(&business.id, &pending.customer_id, now).await?;
        for old in &superseded {
            info!("Superseding booking {} of customer {}", old.id, old.customer_id);
            self.release_ref(provider.as_ref(), old).await;
        }

        let reference = match self.create_event(provider.as_ref(), business, &pending).await {
            Ok(reference) => reference,
            Err(e) => {
                warn!("Calendar write failed for booking {}: {}", pending.id, e);
                self.discard_pending(&pending.id, now).await;
                return Err(e);
            }
        };

        match self.bookings.confirm(&pending.id, &reference, self.policy.buffers(), now).await {
            Ok(booking) => {
                info!("Booking {} confirmed as {}", booking.id, reference);
                Ok(booking)
            }
            Err(e) => {
                warn!("Store rejected booking {}: {}", pending.id, e);
                if let Err(del) = self.guarded("delete_event", provider.delete_event(&reference)).await {
                    error!("Orphaned calendar event {} after rejected commit: {}", reference, del);
                }
                self.discard_pending(&pending.id, now).await;
                if e.is_unique_violation() {
                    return Err(AppError::Conflict("Another booking was confirmed concurrently".to_string()));
                }
                Err(e)
            }
        }
    }

    #[instrument(skip(self, business), fields(business_id = %business.id))]
    pub async fn quote(&self, business: &Business, service: &str, date: NaiveDate, now: DateTime<Utc>) -> Result<Vec<Slot>, AppError> {
        let service = self.service(business, service)?;
        self.free_slots(business, service, date, None, true, now).await
    }

    #[instrument(skip(self, business, request), fields(business_id = %business.id, customer_id = %request.customer_id))]
    pub async fn book(&self, business: &Business, request: &BookingRequest, now: DateTime<Utc>) -> Result<Booking, AppError> {
        self.ensure_bookable(business)?;
        let service = self.service(business, &request.service)?;
        self.verify_slot(business, service, request.date, request.time, &request.customer_id, now).await?;

        let pending = self.bookings.create(&self.new_pending(business, service, request, now)?).await?;
        self.commit(business, pending, now).await
    }

    /// Reserves a verified slot as `pending` until `confirm_hold` or expiry.
    /// Other customers see the slot as busy meanwhile.
    #[instrument(skip(self, business, request), fields(business_id = %business.id, customer_id = %request.customer_id))]
    pub async fn hold(&self, business: &Business, request: &BookingRequest, now: DateTime<Utc>) -> Result<Booking, AppError> {
        self.ensure_bookable(business)?;
        let service = self.service(business, &request.service)?;
        self.verify_slot(business, service, request.date, request.time, &request.customer_id, now).await?;

        let booking = self.bookings.create(&self.new_pending(business, service, request, now)?).await?;
        info!("Holding {} {} for customer {} until {:?}", booking.date, booking.time, booking.customer_id, booking.expires_at);
        Ok(booking)
    }

    #[instrument(skip(self, business), fields(business_id = %business.id))]
    pub async fn confirm_hold(&self, business: &Business, customer_id: &str, now: DateTime<Utc>) -> Result<Booking, AppError> {
        self.ensure_bookable(business)?;
        let pending = self.bookings.find_latest_pending(&business.id, customer_id, now).await?
            .ok_or_else(|| AppError::NotFound("No pending booking to confirm".to_string()))?;

        let service = business.find_service_by_id(&pending.service_id).ok_or_else(|| {
            AppError::Configuration(format!("Service {} no longer exists", pending.service_id))
        })?;

        if let Err(e) = self.verify_slot(business, service, pending.date, pending.time, customer_id, now).await {
            if matches!(e, AppError::SlotUnavailable(_)) {
                self.discard_pending(&pending.id, now).await;
            }
            return Err(e);
        }

        self.commit(business, pending, now).await
    }

    #[instrument(skip(self, business), fields(business_id = %business.id))]
    pub async fn cancel(&self, business: &Business, customer_id: &str, now: DateTime<Utc>) -> Result<CancelOutcome, AppError> {
        let Some(current) = self.current_confirmed(business, customer_id, now).await? else {
            return Ok(CancelOutcome::NothingToCancel);
        };

        if let Some(reference) = current.external_calendar_ref.as_deref() {
            let provider = self.calendars.for_business(business)?;
            self.guarded("delete_event", provider.delete_event(reference)).await?;
        }

        match self.bookings.cancel(&current.id, now).await? {
            Some(mut cancelled) => {
                self.bookings.release_calendar_ref(&cancelled.id).await?;
                cancelled.external_calendar_ref = None;
                info!("Booking {} cancelled", cancelled.id);
                Ok(CancelOutcome::Cancelled(cancelled))
            }
            None => Ok(CancelOutcome::NothingToCancel),
        }
    }

    /// Moves the customer's confirmed booking. The old one stays untouched
    /// unless the new one is confirmed.
    #[instrument(skip(self, business), fields(business_id = %business.id))]
    pub async fn modify(
        &self,
        business: &Business,
        customer_id: &str,
        date: NaiveDate,
        time: NaiveTime,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        self.ensure_bookable(business)?;
        let old = self.current_confirmed(business, customer_id, now).await?
            .ok_or_else(|| AppError::NotFound("No active booking to modify".to_string()))?;
        let service = business.find_service_by_id(&old.service_id).ok_or_else(|| {
            AppError::Configuration(format!("Service {} no longer exists", old.service_id))
        })?;

        self.verify_slot(business, service, date, time, customer_id, now).await?;

        let request = BookingRequest {
            customer_id: customer_id.to_string(),
            customer_name: old.customer_name.clone(),
            service: service.name.clone(),
            date,
            time,
        };
        let pending = self.bookings.create(&self.new_pending(business, service, &request, now)?).await?;
        let provider = self.calendars.for_business(business)?;

        let reference = match self.create_event(provider.as_ref(), business, &pending).await {
            Ok(reference) => reference,
            Err(e) => {
                self.discard_pending(&pending.id, now).await;
                return Err(e);
            }
        };

        let confirmed = match self.bookings.replace_confirmed(&old.id, &pending.id, &reference, self.policy.buffers(), now).await {
            Ok(booking) => booking,
            Err(e) => {
                warn!("Store rejected modification of {}: {}", old.id, e);
                if let Err(del) = self.guarded("delete_event", provider.delete_event(&reference)).await {
                    error!("Orphaned calendar event {} after rejected modify: {}", reference, del);
                }
                self.discard_pending(&pending.id, now).await;
                if e.is_unique_violation() {
                    return Err(AppError::Conflict("Another booking was confirmed concurrently".to_string()));
                }
                return Err(e);
            }
        };

        info!("Booking {} moved to {}", old.id, confirmed.id);
        self.release_ref(provider.as_ref(), &old).await;
        Ok(confirmed)
    }

    pub async fn list_for_customer(&self, business: &Business, customer_id: &str) -> Result<Vec<Booking>, AppError> {
        self.bookings.list_for_customer(&business.id, customer_id).await
    }

    pub fn business_info(&self, business: &Business) -> BusinessInfo {
        business.info()
    }
}
