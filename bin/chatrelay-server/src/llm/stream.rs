//! Streaming client for the primary chat-completion endpoint.

use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, trace};

use crate::config::ChatConfig;
use crate::llm::decoder::{DeltaDecoder, Frame};
use crate::llm::wire::{CompletionRequest, WireMessage};
use crate::llm::{UpstreamError, completions_url, http_client};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4.1";

/// Forward-only sequence of text deltas for one turn.  It ends at the
/// upstream `[DONE]` sentinel or when the connection closes, and yields at
/// most one error, as its last item.  Dropping it closes the connection.
pub type DeltaStream = BoxStream<'static, Result<String, UpstreamError>>;

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl ChatClient {
    pub fn new(cfg: &ChatConfig) -> Result<Self, reqwest::Error> {
        let endpoint = &cfg.endpoint;
        Ok(Self {
            http: http_client(Some(cfg.read_timeout), None)?,
            url: completions_url(endpoint.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)),
            api_key: endpoint.api_key.clone(),
            model: endpoint.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            temperature: endpoint.temperature,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send `messages` with `stream: true` and return the decoded deltas.
    ///
    /// A non-2xx status is returned here as [`UpstreamError::Http`] with the
    /// response body as detail.  Failures after the headers arrive come out
    /// of the stream instead.
    pub async fn open(&self, messages: &[WireMessage]) -> Result<DeltaStream, UpstreamError> {
        let api_key = self.api_key.as_deref().ok_or(UpstreamError::NotConfigured)?;
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            stream: true,
        };

        debug!(url = %self.url, model = %self.model, messages = messages.len(), "opening upstream stream");
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let mut bytes = Box::pin(response.bytes_stream());
        let deltas = async_stream::stream! {
            let mut decoder = DeltaDecoder::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(UpstreamError::Request(e));
                        return;
                    }
                };
                for frame in decoder.push(&chunk) {
                    match frame {
                        Frame::Delta(text) => yield Ok(text),
                        Frame::Malformed => trace!("skipping malformed upstream event"),
                        Frame::Empty | Frame::Done => {}
                    }
                }
                if decoder.is_done() {
                    return;
                }
            }
            if let Some(Frame::Delta(text)) = decoder.finish() {
                yield Ok(text);
            }
        };
        Ok(deltas.boxed())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
