use axum::{
    body::Body,
    extract::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{health, business, booking, webhook};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{debug, error, info, info_span, Span};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Chat transport
        .route("/api/v1/webhook/messages", post(webhook::receive_message))

        // Businesses
        .route("/api/v1/businesses", post(business::create_business))
        .route("/api/v1/businesses/{business_id}", get(business::get_business_info))

        // Availability & bookings
        .route("/api/v1/{business_id}/slots", get(booking::get_slots))
        .route("/api/v1/{business_id}/bookings", post(booking::create_booking))
        .route("/api/v1/{business_id}/bookings/hold", post(booking::hold_booking))
        .route("/api/v1/{business_id}/bookings/confirm", post(booking::confirm_booking))
        .route("/api/v1/{business_id}/bookings/modify", post(booking::modify_booking))
        .route("/api/v1/{business_id}/bookings/cancel", post(booking::cancel_booking))
        .route("/api/v1/{business_id}/customers/{customer_id}/bookings", get(booking::list_customer_bookings))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    debug!("received {} {}", request.method(), request.uri());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(status = response.status().as_u16(), latency_ms = latency.as_millis(), "responded");
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("server error: {}", error);
                })
        )
        .with_state(state)
}
