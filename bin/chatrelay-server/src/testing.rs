//! Fake upstream LLM endpoints and fixtures shared by the test modules.
//!
//! Each fake is a real axum server on `127.0.0.1:0`, so the clients under
//! test go through reqwest, hyper and the byte-level decoder exactly as in
//! production.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::config::{ChatConfig, LlmEndpoint, SummaryConfig};

/// One request seen by a fake upstream.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Recorded>>>);

impl Recorder {
    async fn record(&self, uri: &Uri, headers: &HeaderMap, body: Value) {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        self.0.lock().await.push(Recorded {
            path: uri.path().to_owned(),
            authorization,
            body,
        });
    }

    pub async fn count(&self) -> usize {
        self.0.lock().await.len()
    }

    pub async fn last(&self) -> Recorded {
        self.0
            .lock()
            .await
            .last()
            .cloned()
            .expect("upstream received no request")
    }
}

/// Serve `router` on an ephemeral port; returns its base URL (no `/v1`).
pub async fn spawn_upstream(router: Router<Recorder>) -> (String, Recorder) {
    let recorder = Recorder::default();
    let app = router.with_state(recorder.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), recorder)
}

/// Base URL of a port nobody listens on.
pub async fn unreachable_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn sse_delta(text: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({ "choices": [{ "index": 0, "delta": { "content": text } }] })
    )
}

/// Upstream body streaming `deltas` then the end sentinel.
pub fn sse_body(deltas: &[&str]) -> String {
    let mut body: String = deltas.iter().map(|d| sse_delta(d)).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

const COMPLETIONS: &str = "/v1/chat/completions";

/// Answers every completion request with `body` as an event stream.
pub fn event_stream_router(body: String) -> Router<Recorder> {
    Router::new().route(
        COMPLETIONS,
        post(
            move |State(rec): State<Recorder>, uri: Uri, headers: HeaderMap, Json(req): Json<Value>| {
                let body = body.clone();
                async move {
                    rec.record(&uri, &headers, req).await;
                    ([(header::CONTENT_TYPE, "text/event-stream")], body)
                }
            },
        ),
    )
}

/// Sends `prefix`, then aborts the response body mid-stream.
pub fn broken_stream_router(prefix: String) -> Router<Recorder> {
    Router::new().route(
        COMPLETIONS,
        post(
            move |State(rec): State<Recorder>, uri: Uri, headers: HeaderMap, Json(req): Json<Value>| {
                let prefix = prefix.clone();
                async move {
                    rec.record(&uri, &headers, req).await;
                    let chunks = futures::stream::iter(vec![
                        Ok::<Bytes, std::io::Error>(Bytes::from(prefix)),
                        Err(std::io::Error::other("upstream crashed")),
                    ]);
                    Response::builder()
                        .header(header::CONTENT_TYPE, "text/event-stream")
                        .body(Body::from_stream(chunks))
                        .unwrap()
                }
            },
        ),
    )
}

/// Sends `prefix`, then keeps the response open without sending anything.
pub fn stalled_stream_router(prefix: String) -> Router<Recorder> {
    Router::new().route(
        COMPLETIONS,
        post(
            move |State(rec): State<Recorder>, uri: Uri, headers: HeaderMap, Json(req): Json<Value>| {
                let prefix = prefix.clone();
                async move {
                    rec.record(&uri, &headers, req).await;
                    let chunks = futures::stream::iter(vec![Ok::<Bytes, std::io::Error>(
                        Bytes::from(prefix),
                    )])
                    .chain(futures::stream::pending());
                    Response::builder()
                        .header(header::CONTENT_TYPE, "text/event-stream")
                        .body(Body::from_stream(chunks))
                        .unwrap()
                }
            },
        ),
    )
}

/// Answers every completion request with `status` and a plain-text body.
pub fn status_router(status: StatusCode, body: &'static str) -> Router<Recorder> {
    Router::new().route(
        COMPLETIONS,
        post(
            move |State(rec): State<Recorder>, uri: Uri, headers: HeaderMap, Json(req): Json<Value>| async move {
                rec.record(&uri, &headers, req).await;
                (status, body)
            },
        ),
    )
}

/// Answers every completion request with `value` after `delay`.
pub fn json_router(value: Value, delay: Duration) -> Router<Recorder> {
    Router::new().route(
        COMPLETIONS,
        post(
            move |State(rec): State<Recorder>, uri: Uri, headers: HeaderMap, Json(req): Json<Value>| {
                let value = value.clone();
                async move {
                    rec.record(&uri, &headers, req).await;
                    tokio::time::sleep(delay).await;
                    Json(value)
                }
            },
        ),
    )
}

/// Non-streaming completion body whose first choice says `content`.
pub fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

pub fn chat_config(base: &str) -> ChatConfig {
    ChatConfig {
        endpoint: LlmEndpoint {
            api_key: Some("test-key".into()),
            api_base: Some(base.to_owned()),
            model: Some("test-model".into()),
            temperature: 0.2,
        },
        read_timeout: Duration::from_secs(5),
    }
}

pub fn summary_config(base: &str) -> SummaryConfig {
    SummaryConfig {
        endpoint: LlmEndpoint {
            api_key: Some("summary-key".into()),
            api_base: Some(base.to_owned()),
            model: Some("title-model".into()),
            temperature: 0.2,
        },
        system_prompt: None,
        timeout: Duration::from_secs(5),
    }
}
