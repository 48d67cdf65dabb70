//! Ollama-style chat endpoint.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{ApiError, AppState};

/// One streamed chat event.
#[derive(Debug, Clone, Serialize)]
pub struct ChatChunk {
    /// Agent name.
    pub model: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Reply text; empty on the final chunk.
    pub response: String,
    /// Set on the final chunk.
    pub done: bool,
}

impl ChatChunk {
    fn new(model: &str, response: String, done: bool) -> Self {
        Self {
            model: model.to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            response,
            done,
        }
    }
}

/// Content of the last message, or the matching 400.
fn last_content(body: &Value) -> Result<&str, ApiError> {
    let messages = body
        .get("messages")
        .and_then(Value::as_array)
        .filter(|messages| !messages.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Messages array is required".to_string()))?;

    messages
        .last()
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Invalid message format".to_string()))
}

/// `POST /api/chat`
pub(super) async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) =
        body.map_err(|_| ApiError::BadRequest("Messages array is required".to_string()))?;
    let content = last_content(&body)?;

    tracing::info!(content = %content, "Received chat message");

    let reply = state.responder.respond(content).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to handle chat message");
        ApiError::Internal("Failed to process message".to_string())
    })?;

    let chunks = [
        ChatChunk::new(&state.agent_name, reply, false),
        ChatChunk::new(&state.agent_name, String::new(), true),
    ];
    let mut events = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let event = Event::default()
            .json_data(chunk)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        events.push(Ok::<Event, Infallible>(event));
    }

    Ok(Sse::new(futures::stream::iter(events)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_last_content() {
        let body = json!({"messages": [{"content": "first"}, {"content": "last"}]});
        assert_eq!(last_content(&body).unwrap(), "last");
    }

    #[test]
    fn test_missing_messages() {
        for body in [json!({}), json!({"messages": []}), json!({"messages": "nope"})] {
            match last_content(&body) {
                Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Messages array is required"),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_invalid_last_message() {
        for body in [
            json!({"messages": [{"role": "user"}]}),
            json!({"messages": [{"content": ""}]}),
            json!({"messages": [{"content": "ok"}, null]}),
        ] {
            match last_content(&body) {
                Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Invalid message format"),
                other => panic!("unexpected {:?}", other),
            }
        }
    }
}
