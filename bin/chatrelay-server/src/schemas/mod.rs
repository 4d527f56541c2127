//! Request and response bodies for the HTTP API.

pub mod api;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::ServerError;

/// Decode a JSON request body.  An empty (or all-whitespace) body is the
/// same as `{}`; anything unparseable is `invalid_json`.
pub fn parse_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ServerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|_| ServerError::InvalidInput("invalid_json"))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
