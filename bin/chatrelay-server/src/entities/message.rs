use std::future::Future;

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::entities::{Message, MessageRole, SqliteStore, decode_time, encode_time};

pub trait MessageStore: Send + Sync + 'static {
    /// Insert a message and move the conversation's `updated_at` to the same
    /// instant, in one transaction.
    fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> impl Future<Output = Result<Message, sqlx::Error>> + Send;

    /// Messages of one of `owner`'s conversations, oldest first.  A foreign
    /// conversation yields an empty list.
    fn list_messages(
        &self,
        owner: &str,
        conversation_id: &str,
    ) -> impl Future<Output = Result<Vec<Message>, sqlx::Error>> + Send;
}

impl MessageStore for SqliteStore {
    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Message, sqlx::Error> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_owned(),
            role,
            content: content.to_owned(),
            created_at: Utc::now().trunc_subsecs(6),
        };
        let stamp = encode_time(message.created_at);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(role.as_str())
        .bind(&message.content)
        .bind(&stamp)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE conversations SET updated_at = ?1 WHERE id = ?2")
            .bind(&stamp)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(message)
    }

    async fn list_messages(
        &self,
        owner: &str,
        conversation_id: &str,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
            "SELECT m.id, m.conversation_id, m.role, m.content, m.created_at \
             FROM messages m JOIN conversations c ON c.id = m.conversation_id \
             WHERE m.conversation_id = ?1 AND c.owner = ?2 \
             ORDER BY m.created_at ASC, m.rowid ASC",
        )
        .bind(conversation_id)
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, conversation_id, role, content, created_at)| {
                let role = role
                    .parse::<MessageRole>()
                    .map_err(|e| sqlx::Error::Decode(e.into()))?;
                Ok(Message {
                    id,
                    conversation_id,
                    role,
                    content,
                    created_at: decode_time(&created_at, "created_at"),
                })
            })
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
