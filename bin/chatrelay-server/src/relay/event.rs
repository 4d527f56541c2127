//! Outbound event protocol.
//!
//! Each event is one `data: <json>\n\n` frame.  Per turn the order is: one
//! [`RelayEvent::Conversation`], zero or more [`RelayEvent::Delta`], then at
//! most one [`RelayEvent::Error`].

use axum::response::sse::Event;
use serde::Serialize;

use crate::llm::UpstreamError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RelayEvent {
    Conversation {
        conversation_id: String,
    },
    Delta {
        delta: String,
    },
    Error {
        error: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl RelayEvent {
    /// Terminal event for an upstream failure.  Only HTTP-status failures
    /// carry the upstream body; transport failures stay generic.
    pub fn upstream_failure(err: &UpstreamError) -> Self {
        let detail = match err {
            UpstreamError::Http { body, .. } => Some(body.clone()),
            _ => None,
        };
        RelayEvent::Error {
            error: err.kind(),
            detail,
        }
    }

    pub fn to_sse(&self) -> Result<Event, axum::Error> {
        Event::default().json_data(self)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_serialize_to_flat_objects() {
        let init = RelayEvent::Conversation { conversation_id: "c1".into() };
        assert_eq!(serde_json::to_value(&init).unwrap(), json!({ "conversation_id": "c1" }));

        let delta = RelayEvent::Delta { delta: "héllo".into() };
        assert_eq!(serde_json::to_string(&delta).unwrap(), r#"{"delta":"héllo"}"#);
    }

    #[test]
    fn http_failures_carry_detail_and_others_do_not() {
        let http = UpstreamError::Http { status: 429, body: "rate limited".into() };
        assert_eq!(
            serde_json::to_value(RelayEvent::upstream_failure(&http)).unwrap(),
            json!({ "error": "llm_http_error", "detail": "rate limited" })
        );
        assert_eq!(
            serde_json::to_value(RelayEvent::upstream_failure(&UpstreamError::NotConfigured)).unwrap(),
            json!({ "error": "llm_request_failed" })
        );
    }
}
