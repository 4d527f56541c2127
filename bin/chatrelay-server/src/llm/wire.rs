//! OpenAI-compatible `/chat/completions` request and response shapes.
//!
//! Response types default every field so that partial or unexpected bodies
//! deserialize to "no content" rather than failing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

impl WireMessage {
    pub fn new(role: impl Into<WireRole>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Request body for both endpoints; only `stream` differs.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [WireMessage],
    pub temperature: f32,
    pub stream: bool,
}

/// Non-streaming response: the title candidate is
/// `choices[0].message.content`.
#[derive(Debug, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: Option<ContentPart>,
}

/// One `data:` payload of a streaming response: the fragment is
/// `choices[0].delta.content`.
#[derive(Debug, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Option<ContentPart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    pub fn first_content(self) -> Option<String> {
        self.choices.into_iter().next()?.message?.content
    }
}

impl StreamChunk {
    pub fn first_delta(self) -> Option<String> {
        self.choices.into_iter().next()?.delta?.content
    }
}
