use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::app::AppState;
use crate::models::api::HealthResponse;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.settings.environment.clone(),
    })
}
