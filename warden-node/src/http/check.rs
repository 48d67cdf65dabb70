//! Blacklist check endpoint.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use warden_core::moderate;

use super::AppState;

/// `GET /api/check/{address}`
pub(super) async fn check_address(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Response {
    let result = moderate(&address, &state.blacklist);
    let status = if result.is_success() {
        tracing::info!(address = %address, blacklisted = result.is_blacklisted, "Checked address");
        StatusCode::OK
    } else {
        tracing::debug!(address = %address, "Rejected malformed address");
        StatusCode::BAD_REQUEST
    };
    (status, Json(result)).into_response()
}
