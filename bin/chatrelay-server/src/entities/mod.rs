//! Conversation Store.
//!
//! [`ConversationStore`] and [`MessageStore`] define the persistence interface
//! used by the relay and the management routes.  [`SqliteStore`] implements
//! both on top of sqlx; to move to another database, implement the traits for
//! a new type and change the concrete type in [`crate::state::AppState`].
//!
//! Every lookup by id also filters by owner.  A foreign id and a missing id
//! produce the same `None` / `false`, so callers cannot probe for existence.
//!
//! Trait methods use `impl Future` in their signatures, so no `async-trait`
//! crate is required.

pub mod conversation;
pub mod dao;
pub mod message;

pub use conversation::{ConversationStore, provisional_title, truncate_title};
pub use dao::{Conversation, Message, MessageRole};
pub use message::MessageStore;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// SQLite-backed conversation store.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://chatrelay.db"`
    /// or `"sqlite::memory:"` for tests.  In-memory databases are pinned to a
    /// single connection so every query sees the same data.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(8)
                .connect_with(options)
                .await?
        };

        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

/// Fixed-width timestamp encoding; lexical order equals chronological order.
pub(crate) fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_time(raw: &str, column: &'static str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::warn!(raw = %raw, column, error = %e, "failed to parse timestamp; using now");
            Utc::now()
        })
}

#[cfg(test)]
impl SqliteStore {
    pub(crate) async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> SqliteStore {
    SqliteStore::connect("sqlite::memory:")
        .await
        .expect("in-memory store")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
