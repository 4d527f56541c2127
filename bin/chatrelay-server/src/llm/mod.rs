//! Clients for the two upstream chat-completion endpoints.
//!
//! - [`ChatClient`] opens the streaming request for a chat turn and yields
//!   text deltas decoded by [`decoder::DeltaDecoder`].
//! - [`TitleSummarizer`] makes the single non-streaming call that names a new
//!   conversation.
//!
//! Both speak the OpenAI-style `/chat/completions` protocol described by the
//! types in [`wire`].

pub mod decoder;
pub mod stream;
pub mod summary;
pub mod wire;

pub use stream::ChatClient;
pub use summary::{TitleOutcome, TitleSummarizer};
pub use wire::{WireMessage, WireRole};

use std::time::Duration;

use thiserror::Error;

/// Connect budget applied to both upstream clients.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of the streaming chat call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The endpoint answered with a non-2xx status.  `body` is whatever
    /// diagnostic text it sent back.
    #[error("upstream returned HTTP {status}")]
    Http { status: u16, body: String },

    /// Connect, read, timeout or body-decoding failure.
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("chat endpoint has no API key")]
    NotConfigured,
}

impl UpstreamError {
    /// Error kind carried by the outbound error event.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Http { .. } => "llm_http_error",
            UpstreamError::Request(_) | UpstreamError::NotConfigured => "llm_request_failed",
        }
    }
}

/// Resolve the `/chat/completions` URL under `api_base`, inserting `/v1`
/// unless the base already ends with it.
pub fn completions_url(api_base: &str) -> String {
    let base = api_base.trim_end_matches('/');
    if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

fn http_client(read_timeout: Option<Duration>, total_timeout: Option<Duration>) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
    if let Some(t) = read_timeout {
        builder = builder.read_timeout(t);
    }
    if let Some(t) = total_timeout {
        builder = builder.timeout(t);
    }
    builder.build()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
