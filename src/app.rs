use crate::config::Settings;
use crate::ingest::Ingestor;
use crate::relay::ChatRelay;

/// Shared application state passed to all route handlers.
pub struct AppState {
    pub settings: Settings,
    pub chat_relay: ChatRelay,
    pub ingestor: Ingestor,
}
