use axum::{
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode},
};
use std::collections::HashMap;
use crate::domain::models::business::Business;
use crate::state::AppState;
use std::sync::Arc;
use tracing::error;

/// The business named by the `{business_id}` path segment, services included.
pub struct CurrentBusiness(pub Business);

impl FromRequestParts<Arc<AppState>> for CurrentBusiness {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let params: Path<HashMap<String, String>> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;

        let business_id = params.get("business_id").ok_or(StatusCode::BAD_REQUEST)?;

        match state.business_repo.find_by_id(business_id).await {
            Ok(Some(business)) => Ok(CurrentBusiness(business)),
            Ok(None) => Err(StatusCode::NOT_FOUND),
            Err(e) => {
                error!("Business lookup failed for {}: {:?}", business_id, e);
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}
