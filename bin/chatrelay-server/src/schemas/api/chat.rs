use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The new user message.  Trimmed; must not be blank.
    #[serde(default)]
    pub message: Option<String>,
    /// Prior turns as the client remembers them.  Only `user` and
    /// `assistant` items with non-empty content are forwarded.
    #[serde(default)]
    pub history: Option<Vec<HistoryItem>>,
    /// Continue this conversation.  Absent or empty starts a new one.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// One prior turn.  Kept as raw JSON so that items of any shape are
/// skipped individually instead of failing the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct HistoryItem {
    #[serde(default)]
    pub role: Option<Value>,
    #[serde(default)]
    pub content: Option<Value>,
}

impl HistoryItem {
    pub fn role(&self) -> Option<&str> {
        self.role.as_ref()?.as_str()
    }

    /// Text content; `None` for non-string or empty content.
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref()?.as_str().filter(|c| !c.is_empty())
    }
}
