//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional OpenAPI document (disable with `RELAY_ENABLE_API_DOCS=false`)
//! - Health / heartbeat route
//! - `/api` routes for chat turns, conversations and the caller's session

mod api;
pub mod doc;
mod health;

use axum::{Router, middleware};
use std::sync::Arc;
use tower::ServiceBuilder;

use crate::error::ServerError;
use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .nest("/api", api::router());

    if state.config.enable_api_docs {
        app = app.merge(doc::router());
    }

    app.fallback(not_found)
        // Outermost layers execute first on the way in.
        .layer(
            ServiceBuilder::new()
                .layer(cors::cors_layer(&state.config))
                .layer(middleware::from_fn(trace::trace_middleware)),
        )
        .with_state(state)
}

async fn not_found() -> ServerError {
    ServerError::NotFound("not_found")
}
