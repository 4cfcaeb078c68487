pub mod chat;
pub mod health;
pub mod upload;

use axum::Router;
use std::sync::Arc;

use crate::app::AppState;

/// Build all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(chat::routes())
        .merge(upload::routes())
        .merge(health::routes())
        .with_state(state)
}
