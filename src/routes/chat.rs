use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use std::sync::Arc;
use tracing::error;

use crate::app::AppState;
use crate::models::api::{ErrorResponse, Message};
use crate::relay::{ChatError, RelayFrame};

const GENERIC_ERROR: &str = "An error occurred processing your request";

/// Chat routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/chat", post(chat))
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        match self {
            Self::EmptyConversation | Self::EmptyQuery => {
                error_json(StatusCode::BAD_REQUEST, &self.to_string())
            }
            Self::Upstream(e) => {
                error!("Error in chat relay: {e:#}");
                error_json(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR)
            }
        }
    }
}

/// POST /api/chat - Stream a retrieval-augmented reply to a conversation.
///
/// The body starts with `{"model": "<id>"}\n`, followed by raw content text.
async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<Message>>, JsonRejection>,
) -> Response {
    let Json(conversation) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return error_json(StatusCode::BAD_REQUEST, &rejection.body_text());
        }
    };

    let stream = match state.chat_relay.relay(conversation).await {
        Ok(stream) => stream,
        Err(e) => return e.into_response(),
    };

    let body = Body::from_stream(stream.map(|frame| frame.map(RelayFrame::into_bytes)));
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
