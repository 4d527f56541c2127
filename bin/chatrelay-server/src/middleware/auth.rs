//! Identity boundary.
//!
//! Authentication happens in front of this server.  The fronting layer puts
//! the user id in a trusted header (`x-user-id` by default).  When a gateway
//! token is configured the header only counts if the request also carries
//! `Authorization: Bearer <token>`, so clients that bypass the gateway cannot
//! claim an identity.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use http::request::Parts;
use http::{HeaderMap, header};

use crate::config::IdentityConfig;
use crate::error::ServerError;
use crate::state::AppState;

/// The authenticated caller.  Rejects with `auth_required` when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

/// Resolve the caller's id from request headers.
pub fn identify(headers: &HeaderMap, cfg: &IdentityConfig) -> Option<String> {
    if let Some(expected) = &cfg.gateway_token {
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if !provided.is_some_and(|token| constant_time_eq(token, expected)) {
            return None;
        }
    }
    headers
        .get(cfg.header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        identify(&parts.headers, &state.config.identity)
            .map(AuthUser)
            .ok_or(ServerError::Unauthenticated)
    }
}

impl OptionalFromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(identify(&parts.headers, &state.config.identity).map(AuthUser))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
