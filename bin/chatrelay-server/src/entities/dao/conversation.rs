use chrono::{DateTime, Utc};

/// A row in the `conversations` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: String,
    /// Authenticated user id of the creator; never changes.
    pub owner: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every appended message.
    pub updated_at: DateTime<Utc>,
}
