//! Server configuration, loaded from environment variables at startup.
//!
//! The resulting [`Config`] is immutable.  Components copy out the sections
//! they need when they are constructed, so nothing downstream of `main` reads
//! the process environment.

use std::path::Path;
use std::time::Duration;

use tracing::warn;

/// Placeholder title for conversations whose first message is blank.
pub const DEFAULT_TITLE: &str = "New chat";

/// Maximum stored title length, in characters.
pub const MAX_TITLE_CHARS: usize = 120;

/// Runtime configuration for chatrelay-server.
///
/// Every field has a default so the server starts without any environment
/// variables set.  Streaming still needs `RELAY_LLM_API_KEY`.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// sqlx SQLite connection string (default: `"sqlite://chatrelay.db"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins.  `None` mirrors the
    /// request's `Origin` header.
    pub cors_allowed_origins: Option<String>,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_api_docs: bool,

    /// Debug mode: log swallowed upstream failures and assistant replies.
    pub debug: bool,

    /// Identity boundary shared with the fronting auth layer.
    pub identity: IdentityConfig,

    /// Character budget for the provisional title cut from the first message.
    pub provisional_title_chars: usize,

    /// Primary, streaming chat-completion endpoint.
    pub chat: ChatConfig,

    /// Secondary, non-streaming endpoint used for conversation titles.
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Header carrying the authenticated user id.
    pub header: String,
    /// When set, the identity header is trusted only alongside
    /// `Authorization: Bearer <token>`.
    pub gateway_token: Option<String>,
}

/// Connection details shared by both LLM endpoints.
#[derive(Debug, Clone, Default)]
pub struct LlmEndpoint {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub endpoint: LlmEndpoint,
    /// Upper bound on the gap between two reads of the upstream body.
    pub read_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub endpoint: LlmEndpoint,
    /// System prompt sent ahead of the user's first message, if any.
    pub system_prompt: Option<String>,
    /// Total budget for the single summarization call.
    pub timeout: Duration,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let prompt_file = env_or("RELAY_SUMMARY_PROMPT_FILE", "prompts/title_summary.txt");
        Self {
            bind_address: env_or("RELAY_BIND", "0.0.0.0:8000"),
            database_url: env_or("RELAY_DATABASE_URL", "sqlite://chatrelay.db"),
            log_level: env_or("RELAY_LOG", "info"),
            log_json: parse_bool("RELAY_LOG_JSON", false),
            cors_allowed_origins: env_opt("RELAY_CORS_ORIGINS"),
            enable_api_docs: parse_bool("RELAY_ENABLE_API_DOCS", true),
            debug: parse_bool("RELAY_DEBUG", false),
            identity: IdentityConfig {
                header: env_or("RELAY_IDENTITY_HEADER", "x-user-id").to_ascii_lowercase(),
                gateway_token: env_opt("RELAY_GATEWAY_TOKEN"),
            },
            provisional_title_chars: parse_env("RELAY_PROVISIONAL_TITLE_CHARS", 8),
            chat: ChatConfig {
                endpoint: LlmEndpoint {
                    api_key: env_opt("RELAY_LLM_API_KEY"),
                    api_base: Some(env_or("RELAY_LLM_API_BASE", "https://api.openai.com/v1")),
                    model: Some(env_or("RELAY_LLM_MODEL", "gpt-4.1")),
                    temperature: parse_env("RELAY_LLM_TEMPERATURE", 0.2),
                },
                read_timeout: Duration::from_secs(parse_env("RELAY_LLM_READ_TIMEOUT_SECS", 60)),
            },
            summary: SummaryConfig {
                endpoint: LlmEndpoint {
                    api_key: env_opt("RELAY_SUMMARY_API_KEY"),
                    api_base: env_opt("RELAY_SUMMARY_API_BASE"),
                    model: env_opt("RELAY_SUMMARY_MODEL"),
                    temperature: parse_env("RELAY_SUMMARY_TEMPERATURE", 0.2),
                },
                system_prompt: load_prompt(Path::new(&prompt_file)),
                timeout: Duration::from_secs(parse_env("RELAY_SUMMARY_TIMEOUT_SECS", 30)),
            },
        }
    }
}

impl Default for Config {
    /// Defaults with both LLM endpoints unconfigured.  Used by tests.
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            log_level: "info".into(),
            log_json: false,
            cors_allowed_origins: None,
            enable_api_docs: true,
            debug: false,
            identity: IdentityConfig {
                header: "x-user-id".into(),
                gateway_token: None,
            },
            provisional_title_chars: 8,
            chat: ChatConfig {
                endpoint: LlmEndpoint {
                    temperature: 0.2,
                    ..LlmEndpoint::default()
                },
                read_timeout: Duration::from_secs(60),
            },
            summary: SummaryConfig {
                endpoint: LlmEndpoint {
                    temperature: 0.2,
                    ..LlmEndpoint::default()
                },
                system_prompt: None,
                timeout: Duration::from_secs(30),
            },
        }
    }
}

/// Read the summarization system prompt.  A missing or empty file yields
/// `None`; the summarizer then sends the user turn alone.
pub fn load_prompt(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_owned())
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "title prompt not loaded; summarizing without a system prompt");
            None
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
