//! Relay Session: orchestrates one chat turn.
//!
//! A turn moves through `Init → UserPersisted → (TitleResolved) → Streaming →
//! Finalized` and never goes back.  Everything up to and including the title
//! happens before [`Relay::handle_chat_turn`] returns, so a rejected turn is
//! an ordinary HTTP error.  The rest runs inside the returned event stream:
//!
//! 1. emit the conversation id;
//! 2. forward every upstream delta as it arrives, accumulating the text;
//! 3. on failure, emit one error event and stop reading;
//! 4. persist the accumulated text as the assistant message, if non-empty.
//!
//! If the client disconnects, the stream is dropped before step 4: the
//! upstream connection closes and partial text is discarded.  The user
//! message, already committed, stays.

pub mod event;

pub use event::RelayEvent;

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::entities::{
    Conversation, ConversationStore, MessageRole, MessageStore, SqliteStore, provisional_title,
};
use crate::error::ServerError;
use crate::llm::{ChatClient, TitleOutcome, TitleSummarizer, UpstreamError, WireMessage, WireRole};
use crate::schemas::api::chat::HistoryItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Init,
    UserPersisted,
    TitleResolved,
    Streaming,
    Finalized,
}

/// Forward-only phase tracker for one turn.
#[derive(Debug)]
struct TurnPhase {
    conversation_id: String,
    phase: Phase,
}

impl TurnPhase {
    fn new() -> Self {
        Self {
            conversation_id: String::new(),
            phase: Phase::Init,
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "turn phase moved from {:?} to {:?}", self.phase, next);
        trace!(conversation_id = %self.conversation_id, from = ?self.phase, to = ?next, "turn phase");
        self.phase = next;
    }
}

/// A turn whose user message is committed and whose reply is ready to stream.
pub struct RelayTurn {
    /// The resolved conversation, including any freshly summarized title.
    pub conversation: Conversation,
    /// Outbound events.  Persists the assistant reply when fully consumed.
    pub events: BoxStream<'static, RelayEvent>,
}

#[derive(Debug, Clone)]
pub struct Relay {
    store: Arc<SqliteStore>,
    chat: ChatClient,
    summarizer: TitleSummarizer,
    provisional_title_chars: usize,
    debug: bool,
}

impl Relay {
    pub fn new(store: Arc<SqliteStore>, config: &Config) -> Result<Self, reqwest::Error> {
        let summarizer = TitleSummarizer::new(&config.summary)?;
        if !summarizer.is_enabled() {
            info!("title summarization disabled; conversations keep their provisional titles");
        }
        Ok(Self {
            store,
            chat: ChatClient::new(&config.chat)?,
            summarizer,
            provisional_title_chars: config.provisional_title_chars,
            debug: config.debug,
        })
    }

    /// Run the pre-stream part of a turn and hand back the event stream.
    ///
    /// Fails with `empty_message` before touching the store, with
    /// `conversation_not_found` when `conversation_id` is not the caller's,
    /// and with `missing_llm_api_key` (after the user message is saved) when
    /// the chat endpoint has no key.
    pub async fn handle_chat_turn(
        &self,
        owner: &str,
        message: &str,
        history: &[HistoryItem],
        conversation_id: Option<&str>,
    ) -> Result<RelayTurn, ServerError> {
        let mut phase = TurnPhase::new();

        let message = message.trim();
        if message.is_empty() {
            phase.advance(Phase::Finalized);
            return Err(ServerError::InvalidInput("empty_message"));
        }

        let requested = conversation_id.filter(|id| !id.is_empty());
        let provisional = provisional_title(message, self.provisional_title_chars);
        let Some((mut conversation, created)) = self
            .store
            .resolve_or_create(owner, requested, &provisional)
            .await?
        else {
            phase.advance(Phase::Finalized);
            return Err(ServerError::NotFound("conversation_not_found"));
        };
        phase.conversation_id = conversation.id.clone();

        self.store
            .append_message(&conversation.id, MessageRole::User, message)
            .await?;
        phase.advance(Phase::UserPersisted);
        debug!(conversation_id = %conversation.id, owner, created, "user message persisted");

        if created {
            if let Some(title) = self.resolve_title(&conversation, message).await {
                conversation.title = title;
            }
            phase.advance(Phase::TitleResolved);
        }

        if !self.chat.is_configured() {
            phase.advance(Phase::Finalized);
            return Err(ServerError::NotConfigured("missing_llm_api_key"));
        }

        let messages = upstream_messages(history, message);
        phase.advance(Phase::Streaming);
        let events = self.stream_reply(phase, messages);
        Ok(RelayTurn {
            conversation,
            events,
        })
    }

    /// Summarize a new conversation's first message and store the title.
    /// `None` leaves the provisional title in place; nothing here fails the turn.
    async fn resolve_title(&self, conversation: &Conversation, message: &str) -> Option<String> {
        match self.summarizer.summarize(message).await {
            TitleOutcome::Title(title) => {
                if let Err(e) = self
                    .store
                    .rename(&conversation.owner, &conversation.id, &title)
                    .await
                {
                    warn!(conversation_id = %conversation.id, error = %e, "failed to store summarized title");
                    return None;
                }
                debug!(conversation_id = %conversation.id, title = %title, "conversation titled");
                Some(title)
            }
            TitleOutcome::NoTitle => None,
            TitleOutcome::Failed { kind, detail } => {
                if self.debug {
                    warn!(conversation_id = %conversation.id, kind, detail = %detail, "title summarization failed");
                }
                None
            }
        }
    }

    fn stream_reply(
        &self,
        mut phase: TurnPhase,
        messages: Vec<WireMessage>,
    ) -> BoxStream<'static, RelayEvent> {
        let store = Arc::clone(&self.store);
        let chat = self.chat.clone();
        let debug_mode = self.debug;

        async_stream::stream! {
            let conversation_id = phase.conversation_id.clone();
            yield RelayEvent::Conversation { conversation_id: conversation_id.clone() };

            let mut reply = String::new();
            match chat.open(&messages).await {
                Ok(mut deltas) => {
                    while let Some(item) = deltas.next().await {
                        match item {
                            Ok(delta) => {
                                reply.push_str(&delta);
                                yield RelayEvent::Delta { delta };
                            }
                            Err(e) => {
                                report_failure(&conversation_id, &e, debug_mode);
                                yield RelayEvent::upstream_failure(&e);
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    report_failure(&conversation_id, &e, debug_mode);
                    yield RelayEvent::upstream_failure(&e);
                }
            }

            if !reply.is_empty() {
                match store
                    .append_message(&conversation_id, MessageRole::Assistant, &reply)
                    .await
                {
                    Ok(_) if debug_mode => {
                        info!(conversation_id = %conversation_id, text = %reply, "assistant reply");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(conversation_id = %conversation_id, error = %e, "failed to persist assistant message");
                    }
                }
            }
            phase.advance(Phase::Finalized);
        }
        .boxed()
    }
}

fn report_failure(conversation_id: &str, err: &UpstreamError, debug_mode: bool) {
    match err {
        UpstreamError::Http { status, .. } => {
            warn!(conversation_id, status, "upstream rejected chat request");
        }
        other if debug_mode => {
            error!(conversation_id, error = ?other, "upstream stream failed");
        }
        _ => {}
    }
}

/// Prior turns with a user/assistant role and non-empty content, followed by
/// the new user message.
pub fn upstream_messages(history: &[HistoryItem], message: &str) -> Vec<WireMessage> {
    history
        .iter()
        .filter_map(|item| {
            let role = match item.role()? {
                "user" => WireRole::User,
                "assistant" => WireRole::Assistant,
                _ => return None,
            };
            Some(WireMessage::new(role, item.text()?))
        })
        .chain(std::iter::once(WireMessage::new(WireRole::User, message)))
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
