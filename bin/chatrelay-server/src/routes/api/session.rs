use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::middleware::AuthUser;
use crate::schemas::api::session::SessionInfo;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_session), components(schemas(SessionInfo)))]
pub struct SessionApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/session", get(get_session))
}

/// Report the caller's identity.  Never fails with 401.
#[utoipa::path(
    get,
    path = "/api/session",
    tag = "session",
    responses(
        (status = 200, description = "Current identity", body = SessionInfo)
    )
)]
pub async fn get_session(user: Option<AuthUser>) -> Json<SessionInfo> {
    Json(SessionInfo {
        authenticated: user.is_some(),
        user: user.map(|AuthUser(id)| id),
    })
}
