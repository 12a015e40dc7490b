use axum::{extract::{Path, Query, State}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::business::CurrentBusiness;
use crate::api::dtos::requests::{BookRequest, CustomerRequest, ModifyRequest, SlotsQuery};
use crate::api::dtos::responses::{CancelResponse, SlotsResponse};
use crate::domain::services::booking_lifecycle::{BookingRequest, CancelOutcome};
use crate::error::AppError;
use std::sync::Arc;
use chrono::{NaiveDate, NaiveTime, Utc};

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format, expected YYYY-MM-DD".into()))
}

fn parse_time(raw: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| AppError::Validation("Invalid time format, expected HH:MM".into()))
}

impl TryFrom<BookRequest> for BookingRequest {
    type Error = AppError;

    fn try_from(payload: BookRequest) -> Result<Self, Self::Error> {
        Ok(BookingRequest {
            date: parse_date(&payload.date)?,
            time: parse_time(&payload.time)?,
            customer_id: payload.customer_id,
            customer_name: payload.customer_name,
            service: payload.service,
        })
    }
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    CurrentBusiness(business): CurrentBusiness,
    Query(query): Query<SlotsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = parse_date(&query.date)?;
    let now = Utc::now();
    let slots = state.retry.run("quote", || state.bookings.quote(&business, &query.service, date, now)).await?;

    Ok(Json(SlotsResponse {
        date: query.date,
        service: query.service,
        slots: slots.iter().map(|s| s.start.format("%H:%M").to_string()).collect(),
    }))
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    CurrentBusiness(business): CurrentBusiness,
    Json(payload): Json<BookRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = BookingRequest::try_from(payload)?;
    let now = Utc::now();
    let booking = state.retry.run("book", || state.bookings.book(&business, &request, now)).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn hold_booking(
    State(state): State<Arc<AppState>>,
    CurrentBusiness(business): CurrentBusiness,
    Json(payload): Json<BookRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = BookingRequest::try_from(payload)?;
    let booking = state.bookings.hold(&business, &request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    CurrentBusiness(business): CurrentBusiness,
    Json(payload): Json<CustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.bookings.confirm_hold(&business, &payload.customer_id, Utc::now()).await?;
    Ok(Json(booking))
}

pub async fn modify_booking(
    State(state): State<Arc<AppState>>,
    CurrentBusiness(business): CurrentBusiness,
    Json(payload): Json<ModifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let date = parse_date(&payload.date)?;
    let time = parse_time(&payload.time)?;
    let now = Utc::now();
    let booking = state.retry
        .run("modify", || state.bookings.modify(&business, &payload.customer_id, date, time, now))
        .await?;
    Ok(Json(booking))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    CurrentBusiness(business): CurrentBusiness,
    Json(payload): Json<CustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let outcome = state.retry
        .run("cancel", || state.bookings.cancel(&business, &payload.customer_id, now))
        .await?;

    let response = match outcome {
        CancelOutcome::Cancelled(booking) => CancelResponse { status: "cancelled", booking: Some(booking) },
        CancelOutcome::NothingToCancel => CancelResponse { status: "nothing_to_cancel", booking: None },
    };
    Ok(Json(response))
}

pub async fn list_customer_bookings(
    State(state): State<Arc<AppState>>,
    CurrentBusiness(business): CurrentBusiness,
    Path((_, customer_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.bookings.list_for_customer(&business, &customer_id).await?))
}
