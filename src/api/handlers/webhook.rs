use axum::{extract::State, response::IntoResponse, Json};
use crate::api::dtos::requests::WebhookMessage;
use crate::api::dtos::responses::WebhookReply;
use crate::state::AppState;
use std::sync::Arc;

/// Inbound chat message from the messaging transport.
pub async fn receive_message(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookMessage>,
) -> impl IntoResponse {
    let reply = state.assistant.handle(
        &payload.business_address,
        &payload.customer_address,
        payload.customer_name.as_deref(),
        &payload.text,
    ).await;

    Json(WebhookReply { reply })
}
