pub mod chat;
pub mod conversations;
pub mod session;

use crate::state::AppState;
use utoipa::OpenApi;

use axum::Router;
use std::sync::Arc;

/// Routes nested under `/api`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(chat::router())
        .merge(conversations::router())
        .merge(session::router())
}

#[derive(OpenApi)]
#[openapi()]
pub struct ApiRoutes;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut doc = ApiRoutes::openapi();
    doc.merge(chat::ChatApi::openapi());
    doc.merge(conversations::ConversationsApi::openapi());
    doc.merge(session::SessionApi::openapi());
    doc
}
