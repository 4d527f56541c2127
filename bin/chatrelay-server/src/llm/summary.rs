//! Title Summarizer: one non-streaming call that names a new conversation.
//!
//! Nothing here is fatal.  Every failure comes back as a [`TitleOutcome`] so
//! the caller decides what to log, and the provisional title stays in place.

use tracing::debug;

use crate::config::SummaryConfig;
use crate::entities::truncate_title;
use crate::llm::wire::{CompletionRequest, CompletionResponse, WireMessage, WireRole};
use crate::llm::{completions_url, http_client};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleOutcome {
    /// Trimmed, length-capped title.
    Title(String),
    /// Summarization is not configured, or the model returned blank text.
    NoTitle,
    /// The call failed; `detail` is for server-side diagnostics only.
    Failed { kind: &'static str, detail: String },
}

#[derive(Debug, Clone)]
struct Target {
    url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Clone)]
pub struct TitleSummarizer {
    http: reqwest::Client,
    /// `None` when key, base URL or model is missing.
    target: Option<Target>,
    system_prompt: Option<String>,
    temperature: f32,
}

impl TitleSummarizer {
    pub fn new(cfg: &SummaryConfig) -> Result<Self, reqwest::Error> {
        let endpoint = &cfg.endpoint;
        let target = match (&endpoint.api_key, &endpoint.api_base, &endpoint.model) {
            (Some(api_key), Some(api_base), Some(model)) => Some(Target {
                url: completions_url(api_base),
                api_key: api_key.clone(),
                model: model.clone(),
            }),
            _ => None,
        };
        Ok(Self {
            http: http_client(None, Some(cfg.timeout))?,
            target,
            system_prompt: cfg.system_prompt.clone(),
            temperature: endpoint.temperature,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Ask the summary model for a title for `first_message`.
    pub async fn summarize(&self, first_message: &str) -> TitleOutcome {
        let Some(target) = &self.target else {
            return TitleOutcome::NoTitle;
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(prompt) = &self.system_prompt {
            messages.push(WireMessage::new(WireRole::System, prompt.as_str()));
        }
        messages.push(WireMessage::new(WireRole::User, first_message));

        let body = CompletionRequest {
            model: &target.model,
            messages: &messages,
            temperature: self.temperature,
            stream: false,
        };

        debug!(url = %target.url, model = %target.model, "requesting conversation title");
        let response = match self
            .http
            .post(&target.url)
            .bearer_auth(&target.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return failed("request", e),
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => return failed("request", e),
        };
        if !status.is_success() {
            return failed("http_status", format!("{status}: {text}"));
        }

        let parsed: CompletionResponse = match serde_json::from_str(&text) {
            Ok(p) => p,
            Err(e) => return failed("malformed_body", e),
        };
        match parsed.first_content() {
            Some(title) if !title.trim().is_empty() => {
                TitleOutcome::Title(truncate_title(title.trim()))
            }
            _ => TitleOutcome::NoTitle,
        }
    }
}

fn failed(kind: &'static str, detail: impl ToString) -> TitleOutcome {
    TitleOutcome::Failed {
        kind,
        detail: detail.to_string(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::MAX_TITLE_CHARS;
    use crate::testing;
    use axum::http::StatusCode;
    use std::time::Duration;

    async fn summarizer_for(router: axum::Router<testing::Recorder>) -> (TitleSummarizer, testing::Recorder) {
        let (base, recorder) = testing::spawn_upstream(router).await;
        (TitleSummarizer::new(&testing::summary_config(&base)).unwrap(), recorder)
    }

    #[tokio::test]
    async fn returns_trimmed_title() {
        let (summarizer, recorder) =
            summarizer_for(testing::json_router(testing::completion("  Greetings chat \n"), Duration::ZERO)).await;

        assert_eq!(
            summarizer.summarize("Hello there, how are you?").await,
            TitleOutcome::Title("Greetings chat".into())
        );

        let sent = recorder.last().await;
        assert_eq!(sent.authorization.as_deref(), Some("Bearer summary-key"));
        assert_eq!(sent.body["stream"], false);
        assert_eq!(sent.body["model"], "title-model");
        let messages = sent.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "Hello there, how are you?");
    }

    #[tokio::test]
    async fn caps_title_length() {
        let long = "word ".repeat(60);
        let (summarizer, _) =
            summarizer_for(testing::json_router(testing::completion(&long), Duration::ZERO)).await;

        let TitleOutcome::Title(title) = summarizer.summarize("hi").await else {
            panic!("expected a title");
        };
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
    }

    #[tokio::test]
    async fn sends_system_prompt_first_when_configured() {
        let (base, recorder) =
            testing::spawn_upstream(testing::json_router(testing::completion("T"), Duration::ZERO)).await;
        let mut cfg = testing::summary_config(&base);
        cfg.system_prompt = Some("Name this chat.".into());
        let summarizer = TitleSummarizer::new(&cfg).unwrap();

        summarizer.summarize("hi").await;

        let messages = recorder.last().await.body["messages"].clone();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "Name this chat.");
        assert_eq!(messages[1]["role"], "user");
    }

    #[tokio::test]
    async fn incomplete_config_skips_the_call() {
        let (base, recorder) =
            testing::spawn_upstream(testing::json_router(testing::completion("T"), Duration::ZERO)).await;
        let mut cfg = testing::summary_config(&base);
        cfg.endpoint.model = None;
        let summarizer = TitleSummarizer::new(&cfg).unwrap();

        assert!(!summarizer.is_enabled());
        assert_eq!(summarizer.summarize("hi").await, TitleOutcome::NoTitle);
        assert_eq!(recorder.count().await, 0);
    }

    #[tokio::test]
    async fn blank_content_is_no_title() {
        let (summarizer, _) =
            summarizer_for(testing::json_router(testing::completion("   "), Duration::ZERO)).await;
        assert_eq!(summarizer.summarize("hi").await, TitleOutcome::NoTitle);

        let (summarizer, _) =
            summarizer_for(testing::json_router(serde_json::json!({ "choices": [] }), Duration::ZERO)).await;
        assert_eq!(summarizer.summarize("hi").await, TitleOutcome::NoTitle);
    }

    #[tokio::test]
    async fn http_error_is_failed() {
        let (summarizer, _) =
            summarizer_for(testing::status_router(StatusCode::INTERNAL_SERVER_ERROR, "boom")).await;
        match summarizer.summarize("hi").await {
            TitleOutcome::Failed { kind, detail } => {
                assert_eq!(kind, "http_status");
                assert!(detail.contains("boom"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_is_failed() {
        let (base, _) =
            testing::spawn_upstream(testing::json_router(testing::completion("late"), Duration::from_secs(2))).await;
        let mut cfg = testing::summary_config(&base);
        cfg.timeout = Duration::from_millis(200);
        let summarizer = TitleSummarizer::new(&cfg).unwrap();

        assert!(matches!(
            summarizer.summarize("hi").await,
            TitleOutcome::Failed { kind: "request", .. }
        ));
    }
}
