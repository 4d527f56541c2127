//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::entities::SqliteStore;
use crate::relay::Relay;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Conversations and their messages.
    pub store: Arc<SqliteStore>,
    /// Chat-turn orchestrator; shares `store`.
    pub relay: Relay,
}

impl AppState {
    pub fn new(config: Config, store: SqliteStore) -> Result<Self, reqwest::Error> {
        let store = Arc::new(store);
        let relay = Relay::new(Arc::clone(&store), &config)?;
        Ok(Self {
            config: Arc::new(config),
            store,
            relay,
        })
    }
}
