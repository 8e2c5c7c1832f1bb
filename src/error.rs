//! Error types shared by the source adapters, the LLM client and request validation.
//!
//! None of these ever reach an HTTP client as a transport error except
//! `QueryError`; the rest are folded into `status`/`message` on the report.

use std::time::Duration;
use thiserror::Error;

/// Result alias for a single provider call.
pub type SourceOutcome<T> = Result<T, SourceError>;

/// Why a provider call did not yield real data.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Required credential is absent; no network call was attempted.
    #[error("{provider} is not configured (set {env_var})")]
    NotConfigured {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("{provider} timed out after {after:?}")]
    Timeout {
        provider: &'static str,
        after: Duration,
    },

    #[error("{provider} rate limit exceeded (HTTP 429); try again later")]
    RateLimited { provider: &'static str },

    #[error("{provider} rejected the API key (HTTP 401)")]
    Unauthorized { provider: &'static str },

    #[error("{provider} rejected the request parameters (HTTP 400)")]
    BadRequest { provider: &'static str },

    #[error("{provider} returned HTTP {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("{provider} request failed: {detail}")]
    Transport {
        provider: &'static str,
        detail: String,
    },

    #[error("{provider} returned an unparseable response: {detail}")]
    Decode {
        provider: &'static str,
        detail: String,
    },

    #[error("{provider} returned no usable data")]
    Empty { provider: &'static str },
}

impl SourceError {
    /// Map a non-success HTTP status onto the matching variant.
    pub fn from_status(provider: &'static str, status: u16) -> Self {
        match status {
            429 => SourceError::RateLimited { provider },
            401 => SourceError::Unauthorized { provider },
            400 => SourceError::BadRequest { provider },
            other => SourceError::Status {
                provider,
                status: other,
            },
        }
    }

    pub fn transport(provider: &'static str, err: impl std::fmt::Display) -> Self {
        SourceError::Transport {
            provider,
            detail: err.to_string(),
        }
    }

    pub fn decode(provider: &'static str, err: impl std::fmt::Display) -> Self {
        SourceError::Decode {
            provider,
            detail: err.to_string(),
        }
    }

    /// Short reason used when the fallback chain records why it advanced.
    pub fn short_reason(&self) -> &'static str {
        match self {
            SourceError::NotConfigured { .. } => "not configured",
            SourceError::Timeout { .. } => "timed out",
            SourceError::RateLimited { .. } => "rate limited",
            SourceError::Unauthorized { .. } => "unauthorized",
            SourceError::BadRequest { .. } => "bad request",
            SourceError::Status { .. } => "http error",
            SourceError::Transport { .. } => "network error",
            SourceError::Decode { .. } => "unparseable response",
            SourceError::Empty { .. } => "no data",
        }
    }
}

/// Failure modes of a chat-completion call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM is not configured (set OPENAI_API_KEY)")]
    NotConfigured,

    #[error("LLM request failed: {0}")]
    Transport(String),

    #[error("LLM returned HTTP {0}")]
    Status(u16),

    #[error("LLM returned an empty completion")]
    Empty,

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),
}

/// Caller-visible validation failure (the only one the engine surfaces).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("topic is required and must not be empty")]
    EmptyTopic,

    #[error("unsupported timeframe '{0}' (expected one of 7d, 30d, 90d, 1y)")]
    BadTimeframe(String),
}
