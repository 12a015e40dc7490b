use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Calendar provider timed out: {0}")]
    ProviderTimeout(String),
    #[error("Calendar provider write failed: {0}")]
    ProviderWriteFailed(String),
    #[error("Booking invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl AppError {
    /// Errors worth one more attempt of the whole quote+book sequence.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::ProviderTimeout(_) | AppError::ProviderWriteFailed(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        if let AppError::Database(e) = self
            && let Some(db_err) = e.as_database_error()
        {
            let code = db_err.code().unwrap_or_default();
            // 2067 = SQLite Unique Constraint
            // 23505 = PostgreSQL Unique Violation
            return code == "2067" || code == "23505";
        }
        false
    }

    /// Sentence shown to the customer on the chat channel.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::SlotUnavailable(_) | AppError::Conflict(_) => {
                "Sorry, that time is no longer available. Please pick another time."
            }
            AppError::Configuration(_) | AppError::NotFound(_) => {
                "Sorry, I can't book that service here right now. Our staff has been notified."
            }
            AppError::Validation(_) => {
                "Sorry, I didn't understand the date or time. Please use a format like 2024-03-10 at 14:30."
            }
            _ => "Sorry, we're having technical difficulties. Please try again in a few minutes.",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_unique_violation() {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Resource already exists (duplicate entry)" }))
            ).into_response();
        }

        let (status, message) = match &self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Configuration(msg) => {
                error!("Configuration error: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::SlotUnavailable(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::ProviderTimeout(msg) => {
                warn!("Calendar provider timeout: {}", msg);
                (StatusCode::GATEWAY_TIMEOUT, "Calendar provider timed out".to_string())
            }
            AppError::ProviderWriteFailed(msg) => {
                warn!("Calendar provider write failed: {}", msg);
                (StatusCode::BAD_GATEWAY, "Calendar provider rejected the request".to_string())
            }
            AppError::InvariantViolation(msg) => {
                error!("Invariant violation: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string()),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
