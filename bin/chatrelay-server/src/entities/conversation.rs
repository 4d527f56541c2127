use std::future::Future;

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::config::{DEFAULT_TITLE, MAX_TITLE_CHARS};
use crate::entities::{Conversation, SqliteStore, decode_time, encode_time};

type ConversationRow = (String, String, String, String, String);

pub trait ConversationStore: Send + Sync + 'static {
    /// Return the caller's conversation `requested_id`, or create a new one
    /// titled `provisional_title` when no id is given.  The flag is `true`
    /// for a freshly created conversation.
    ///
    /// `None` means an id was given but is not a conversation of `owner`.
    /// A new conversation is never created in that case.
    fn resolve_or_create(
        &self,
        owner: &str,
        requested_id: Option<&str>,
        provisional_title: &str,
    ) -> impl Future<Output = Result<Option<(Conversation, bool)>, sqlx::Error>> + Send;

    fn get_conversation(
        &self,
        owner: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Conversation>, sqlx::Error>> + Send;

    /// Most recently active first.
    fn list_conversations(
        &self,
        owner: &str,
    ) -> impl Future<Output = Result<Vec<Conversation>, sqlx::Error>> + Send;

    /// Store `title` cut to [`MAX_TITLE_CHARS`].  Returns `false` when the
    /// conversation is not the caller's.
    fn rename(
        &self,
        owner: &str,
        id: &str,
        title: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;

    /// Remove the conversation and all of its messages.  Returns `false` when
    /// the conversation is not the caller's.
    fn delete_conversation(
        &self,
        owner: &str,
        id: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

/// Title assigned at creation: the first `budget` characters of the trimmed
/// seed text, or [`DEFAULT_TITLE`] when the seed is blank.
pub fn provisional_title(seed: &str, budget: usize) -> String {
    let seed = seed.trim();
    let title: String = seed.chars().take(budget).collect();
    if title.is_empty() {
        DEFAULT_TITLE.to_owned()
    } else {
        title
    }
}

/// Cut a title to [`MAX_TITLE_CHARS`] characters.
pub fn truncate_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_CHARS).collect()
}

fn to_conversation((id, owner, title, created_at, updated_at): ConversationRow) -> Conversation {
    Conversation {
        id,
        owner,
        title,
        created_at: decode_time(&created_at, "created_at"),
        updated_at: decode_time(&updated_at, "updated_at"),
    }
}

impl ConversationStore for SqliteStore {
    async fn resolve_or_create(
        &self,
        owner: &str,
        requested_id: Option<&str>,
        provisional_title: &str,
    ) -> Result<Option<(Conversation, bool)>, sqlx::Error> {
        if let Some(id) = requested_id {
            return Ok(self.get_conversation(owner, id).await?.map(|c| (c, false)));
        }

        // Stored timestamps carry microseconds; match them in memory.
        let now = Utc::now().trunc_subsecs(6);
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_owned(),
            title: truncate_title(provisional_title),
            created_at: now,
            updated_at: now,
        };
        let stamp = encode_time(now);
        sqlx::query(
            "INSERT INTO conversations (id, owner, title, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&conversation.id)
        .bind(&conversation.owner)
        .bind(&conversation.title)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await?;
        Ok(Some((conversation, true)))
    }

    async fn get_conversation(
        &self,
        owner: &str,
        id: &str,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        let row: Option<ConversationRow> = sqlx::query_as(
            "SELECT id, owner, title, created_at, updated_at \
             FROM conversations WHERE id = ?1 AND owner = ?2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(to_conversation))
    }

    async fn list_conversations(&self, owner: &str) -> Result<Vec<Conversation>, sqlx::Error> {
        let rows: Vec<ConversationRow> = sqlx::query_as(
            "SELECT id, owner, title, created_at, updated_at \
             FROM conversations WHERE owner = ?1 \
             ORDER BY updated_at DESC, rowid DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_conversation).collect())
    }

    async fn rename(&self, owner: &str, id: &str, title: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE conversations SET title = ?1 WHERE id = ?2 AND owner = ?3")
            .bind(truncate_title(title))
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_conversation(&self, owner: &str, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?1 AND owner = ?2")
            .bind(id)
            .bind(owner)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        // Also covered by ON DELETE CASCADE when foreign keys are enforced.
        sqlx::query("DELETE FROM messages WHERE conversation_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
