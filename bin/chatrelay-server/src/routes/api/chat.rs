use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use futures::StreamExt;
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::middleware::AuthUser;
use crate::schemas::api::chat::{ChatRequest, HistoryItem};
use crate::schemas::parse_json;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(chat), components(schemas(ChatRequest, HistoryItem)))]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// Run one chat turn and stream the reply as server-sent events.
///
/// Events, in order: `{"conversation_id": ...}`, any number of
/// `{"delta": ...}`, and at most one terminal `{"error": ...}`.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream"),
        (status = 400, description = "invalid_json or empty_message"),
        (status = 401, description = "auth_required"),
        (status = 404, description = "conversation_not_found"),
        (status = 503, description = "missing_llm_api_key"),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    body: Bytes,
) -> Result<Response, ServerError> {
    let req: ChatRequest = parse_json(&body)?;
    let turn = state
        .relay
        .handle_chat_turn(
            &owner,
            req.message.as_deref().unwrap_or_default(),
            req.history.as_deref().unwrap_or_default(),
            req.conversation_id.as_deref(),
        )
        .await?;
    info!(conversation_id = %turn.conversation.id, owner = %owner, "chat turn streaming");

    let events = turn.events.map(|event| event.to_sse());
    Ok(([(header::CACHE_CONTROL, "no-cache")], Sse::new(events)).into_response())
}

#[cfg(test)]
mod test {
    use crate::config::Config;
    use crate::entities::{ConversationStore, MessageStore};
    use crate::routes::test_support::*;
    use crate::testing;
    use axum::http::{StatusCode, header};
    use serde_json::Value;

    fn events(text: &str) -> Vec<Value> {
        text.split("\n\n")
            .filter(|frame| !frame.is_empty())
            .map(|frame| {
                let data = frame.strip_prefix("data:").expect("data frame");
                serde_json::from_str(data.trim()).unwrap()
            })
            .collect()
    }

    async fn chat_config(deltas: &[&str]) -> Config {
        let (base, _) =
            testing::spawn_upstream(testing::event_stream_router(testing::sse_body(deltas))).await;
        Config {
            chat: testing::chat_config(&base),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn streams_events_and_persists_turn() {
        let (app, state) = app_with(chat_config(&["Hi", "!"]).await).await;
        let res = send(
            &app,
            request("POST", "/api/chat", Some("alice"), r#"{"message":"Hello there, how are you?"}"#),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(
            res.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );
        assert_eq!(res.headers()[header::CACHE_CONTROL], "no-cache");

        let got = events(&body_text(res).await);
        assert_eq!(got.len(), 3);
        let id = got[0]["conversation_id"].as_str().unwrap().to_owned();
        assert_eq!(got[1], serde_json::json!({ "delta": "Hi" }));
        assert_eq!(got[2], serde_json::json!({ "delta": "!" }));

        let conversation = state.store.get_conversation("alice", &id).await.unwrap().unwrap();
        assert_eq!(conversation.title, "Hello th");
        let messages = state.store.list_messages("alice", &id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "Hi!");
    }

    #[tokio::test]
    async fn odd_history_items_are_dropped_not_rejected() {
        let (base, recorder) =
            testing::spawn_upstream(testing::event_stream_router(testing::sse_body(&["ok"]))).await;
        let config = Config { chat: testing::chat_config(&base), ..Config::default() };
        let (app, state) = app_with(config).await;

        let body = serde_json::json!({
            "message": "hi",
            "history": [
                { "role": "user", "content": "a" },
                { "role": "assistant", "content": [{ "type": "text", "text": "b" }] },
                { "role": "tool", "content": 5 }
            ]
        })
        .to_string();
        let res = send(&app, request("POST", "/api/chat", Some("alice"), &body)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(events(&body_text(res).await).len(), 2);

        assert_eq!(
            recorder.last().await.body["messages"],
            serde_json::json!([
                { "role": "user", "content": "a" },
                { "role": "user", "content": "hi" }
            ])
        );
        assert_eq!(state.store.list_conversations("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upstream_error_is_a_terminal_event() {
        let (base, _) = testing::spawn_upstream(testing::status_router(
            StatusCode::TOO_MANY_REQUESTS,
            "slow down",
        ))
        .await;
        let config = Config { chat: testing::chat_config(&base), ..Config::default() };
        let (app, _) = app_with(config).await;

        let res = send(&app, request("POST", "/api/chat", Some("alice"), r#"{"message":"hi"}"#)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let got = events(&body_text(res).await);
        assert_eq!(got.len(), 2);
        assert_eq!(got[1], serde_json::json!({ "error": "llm_http_error", "detail": "slow down" }));
    }

    #[tokio::test]
    async fn requires_identity() {
        let (app, state) = app_with(chat_config(&["x"]).await).await;
        let res = send(&app, request("POST", "/api/chat", None, r#"{"message":"hi"}"#)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await["error"], "auth_required");
        assert!(state.store.list_conversations("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_bodies() {
        let (app, _) = app_with(chat_config(&["x"]).await).await;

        let res = send(&app, request("POST", "/api/chat", Some("alice"), "{oops")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], "invalid_json");

        let res = send(&app, request("POST", "/api/chat", Some("alice"), "")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], "empty_message");

        let res = send(&app, request("POST", "/api/chat", Some("alice"), r#"{"message":"   "}"#)).await;
        assert_eq!(body_json(res).await["error"], "empty_message");
    }

    #[tokio::test]
    async fn foreign_conversation_is_not_found() {
        let (app, state) = app_with(chat_config(&["x"]).await).await;
        let (bobs, _) = state
            .store
            .resolve_or_create("bob", None, "bob")
            .await
            .unwrap()
            .unwrap();

        let body = serde_json::json!({ "message": "hi", "conversation_id": bobs.id }).to_string();
        let res = send(&app, request("POST", "/api/chat", Some("alice"), &body)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await["error"], "conversation_not_found");
    }

    #[tokio::test]
    async fn missing_api_key_is_503_after_persisting() {
        let (app, state) = app_with(Config::default()).await;
        let res = send(&app, request("POST", "/api/chat", Some("alice"), r#"{"message":"hi"}"#)).await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(res).await["error"], "missing_llm_api_key");
        assert_eq!(state.store.list_conversations("alice").await.unwrap().len(), 1);
    }
}
