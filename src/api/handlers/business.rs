use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use crate::api::dtos::requests::CreateBusinessRequest;
use crate::api::dtos::responses::BusinessCreatedResponse;
use crate::api::extractors::business::CurrentBusiness;
use crate::domain::models::business::{Business, NewBusinessParams};
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tracing::info;

const DEFAULT_BOOKING_HOURS: &str = "9-18";

/// Parses `"9-18"` into `(9, 18)`.
fn parse_booking_hours(raw: &str) -> Result<(i32, i32), AppError> {
    let malformed = || AppError::Configuration(format!("Malformed booking hours '{}'", raw));
    let (open, close) = raw.split_once('-').ok_or_else(malformed)?;
    let open = open.trim().parse::<i32>().map_err(|_| malformed())?;
    let close = close.trim().parse::<i32>().map_err(|_| malformed())?;
    Ok((open, close))
}

pub async fn create_business(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBusinessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (open_hour, close_hour) = parse_booking_hours(payload.booking_hours.as_deref().unwrap_or(DEFAULT_BOOKING_HOURS))?;

    let business = Business::new(NewBusinessParams {
        messaging_address: payload.messaging_address,
        name: payload.name,
        address: payload.address,
        phone: payload.phone,
        email: payload.email,
        description: payload.description,
        timezone: payload.timezone.unwrap_or_else(|| "UTC".to_string()),
        open_hour,
        close_hour,
        calendar_id: payload.calendar_id,
        booking_enabled: payload.booking_enabled.unwrap_or(true),
        services: payload.services.into_iter().map(|s| (s.name, s.duration_minutes)).collect(),
    });
    business.validate()?;

    let created = state.business_repo.create(&business).await?;
    info!("Registered business {} on {}", created.id, created.messaging_address);

    Ok((StatusCode::CREATED, Json(BusinessCreatedResponse { business_id: created.id })))
}

pub async fn get_business_info(
    State(state): State<Arc<AppState>>,
    CurrentBusiness(business): CurrentBusiness,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.bookings.business_info(&business)))
}
