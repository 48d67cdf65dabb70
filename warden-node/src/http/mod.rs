//! HTTP API.
//!
//! Endpoints:
//! - POST /api/chat - Chat prompt, answered as a server-sent event stream
//! - GET /api/check/{address} - Blacklist check for one address
//! - GET /api/health - Agent id and bridge connection state

mod chat;
mod check;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use warden_core::BlacklistSet;
use warden_p2p::BridgeSender;

use crate::responder::ChatResponder;

pub use chat::ChatChunk;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Agent id, reported as the chat model name.
    pub agent_name: String,
    /// Addresses to flag.
    pub blacklist: Arc<BlacklistSet>,
    /// Chat reply generator.
    pub responder: Arc<dyn ChatResponder>,
    /// Bridge handle, used for connection state.
    pub bridge: BridgeSender,
}

/// HTTP error with an `{"error": {"message": ..}}` body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({
            "error": { "message": self.to_string() },
        });

        (status, Json(body)).into_response()
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/check/{address}", get(check::check_address))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "agentId": state.agent_name,
        "state": state.bridge.state().to_string(),
    }))
}
