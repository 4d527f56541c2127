use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Bodies at or above this size are summarized instead of logged.
const MAX_LOGGED_BODY: usize = 1024;

pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let trace_header = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let (mut parts, body) = req.into_parts();
        let req_bytes = match buffer_and_log("request", &parts.headers, body).await {
            Some(bytes) => bytes,
            None => {
                warn!("failed to read request body");
                Bytes::new()
            }
        };
        if let Some(value) = &trace_header {
            parts.headers.insert(X_TRACE_ID, value.clone());
        }

        let response = next.run(Request::from_parts(parts, Body::from(req_bytes))).await;

        // Event streams are forwarded untouched; buffering would hold every
        // frame until the turn ends.
        let mut response = if is_event_stream(response.headers()) {
            response
        } else {
            let (parts, body) = response.into_parts();
            let res_bytes = buffer_and_log("response", &parts.headers, body)
                .await
                .unwrap_or_default();
            Response::from_parts(parts, Body::from(res_bytes))
        };

        if let Some(value) = trace_header {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}

fn is_event_stream(headers: &header::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"))
}

/// Collect `body` and log it at debug level when it is small JSON.
async fn buffer_and_log(direction: &str, headers: &header::HeaderMap, body: Body) -> Option<Bytes> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let is_json = content_type.contains("application/json");

    let bytes = body.collect().await.ok()?.to_bytes();

    if is_json && bytes.len() < MAX_LOGGED_BODY {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            debug!(direction, body = text, "body");
        }
    } else if !bytes.is_empty() {
        debug!(direction, content_type, size = bytes.len(), "body skipped");
    }

    Some(bytes)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
