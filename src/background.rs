use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::time::{sleep, timeout};
use tracing::{error, info, info_span, warn, Instrument};
use crate::error::AppError;
use crate::state::AppState;

const STALE_REF_BATCH: i64 = 50;

/// Counts of one janitor pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: u64,
    pub released: usize,
}

pub async fn start_janitor(state: Arc<AppState>) {
    info!("Starting booking janitor...");
    let interval = Duration::from_secs(state.config.janitor_interval_secs.max(1));

    loop {
        let span = info_span!("janitor_sweep");
        match run_sweep(&state, Utc::now()).instrument(span).await {
            Ok(report) if report.expired > 0 || report.released > 0 => {
                info!("Janitor expired {} pending bookings, released {} calendar refs", report.expired, report.released);
            }
            Ok(_) => {}
            Err(e) => error!("Janitor sweep failed: {:?}", e),
        }
        sleep(interval).await;
    }
}

/// Expires overdue `pending` bookings, then retries deleting calendar events
/// still referenced by terminal bookings.
pub async fn run_sweep(state: &AppState, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
    let expired = state.booking_repo.expire_pending(now).await?;
    let provider_timeout = state.bookings.policy().provider_timeout;

    let mut released = 0;
    for booking in state.booking_repo.list_stale_calendar_refs(STALE_REF_BATCH).await? {
        let Some(reference) = booking.external_calendar_ref.as_deref() else {
            continue;
        };
        let business = match state.business_repo.find_by_id(&booking.business_id).await? {
            Some(business) => business,
            None => {
                warn!("Booking {} references unknown business {}", booking.id, booking.business_id);
                continue;
            }
        };
        let provider = match state.calendars.for_business(&business) {
            Ok(provider) => provider,
            Err(e) => {
                warn!("No calendar for business {}: {}", business.id, e);
                continue;
            }
        };

        match timeout(provider_timeout, provider.delete_event(reference)).await {
            Ok(Ok(())) => {
                state.booking_repo.release_calendar_ref(&booking.id).await?;
                released += 1;
            }
            Ok(Err(e)) => warn!("Still cannot delete calendar event {} of booking {}: {}", reference, booking.id, e),
            Err(_) => warn!("Deleting calendar event {} of booking {} timed out", reference, booking.id),
        }
    }

    Ok(SweepReport { expired, released })
}
