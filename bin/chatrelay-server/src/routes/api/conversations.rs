use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;

use crate::entities::{ConversationStore, MessageStore};
use crate::error::ServerError;
use crate::middleware::AuthUser;
use crate::schemas::api::conversation::{
    ConversationList, ConversationSummary, MessageList, MessageResponse, OkResponse,
    RenameRequest,
};
use crate::schemas::parse_json;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_conversations, get_messages, rename_conversation, delete_conversation, delete_conversation_post),
    components(schemas(
        ConversationList,
        ConversationSummary,
        MessageList,
        MessageResponse,
        RenameRequest,
        OkResponse
    ))
)]
pub struct ConversationsApi;

/// Register conversation management routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route("/conversations/{id}", get(get_messages).delete(delete_conversation))
        .route("/conversations/{id}/rename", post(rename_conversation))
        .route("/conversations/{id}/delete", post(delete_conversation_post))
}

#[utoipa::path(
    get,
    path = "/api/conversations",
    tag = "conversations",
    responses(
        (status = 200, description = "Caller's conversations, most recently active first", body = ConversationList),
        (status = 401, description = "auth_required"),
    )
)]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
) -> Result<Json<ConversationList>, ServerError> {
    let conversations = state.store.list_conversations(&owner).await?;
    Ok(Json(ConversationList {
        items: conversations.iter().map(|c| c.to_response()).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/conversations/{id}",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Messages in chronological order", body = MessageList),
        (status = 401, description = "auth_required"),
        (status = 404, description = "not_found"),
    )
)]
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageList>, ServerError> {
    let conversation = state
        .store
        .get_conversation(&owner, &id)
        .await?
        .ok_or(ServerError::NotFound("not_found"))?;
    let messages = state.store.list_messages(&owner, &conversation.id).await?;
    Ok(Json(MessageList {
        conversation: conversation.id,
        title: conversation.title,
        items: messages.iter().map(|m| m.to_response()).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}/rename",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Renamed; titles are capped at 120 characters", body = OkResponse),
        (status = 400, description = "invalid_json or empty_title"),
        (status = 401, description = "auth_required"),
        (status = 404, description = "not_found"),
    )
)]
pub async fn rename_conversation(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<OkResponse>, ServerError> {
    let req: RenameRequest = parse_json(&body)?;
    let title = req.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(ServerError::InvalidInput("empty_title"));
    }
    if !state.store.rename(&owner, &id, title).await? {
        return Err(ServerError::NotFound("not_found"));
    }
    info!(conversation_id = %id, owner = %owner, "conversation renamed");
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    delete,
    path = "/api/conversations/{id}",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Deleted with all of its messages", body = OkResponse),
        (status = 401, description = "auth_required"),
        (status = 404, description = "not_found"),
    )
)]
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ServerError> {
    if !state.store.delete_conversation(&owner, &id).await? {
        return Err(ServerError::NotFound("not_found"));
    }
    info!(conversation_id = %id, owner = %owner, "conversation deleted");
    Ok(Json(OkResponse::ok()))
}

/// Same as `DELETE /api/conversations/{id}`, for clients limited to POST.
#[utoipa::path(
    post,
    path = "/api/conversations/{id}/delete",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Deleted with all of its messages", body = OkResponse),
        (status = 401, description = "auth_required"),
        (status = 404, description = "not_found"),
    )
)]
pub async fn delete_conversation_post(
    state: State<Arc<AppState>>,
    user: AuthUser,
    id: Path<String>,
) -> Result<Json<OkResponse>, ServerError> {
    delete_conversation(state, user, id).await
}

// ── Tests ──────────────────────────────────────────────────────────────────────
