// src/sources/mod.rs
//! Source adapters: one per external provider, each normalizing its response
//! into a typed payload and reporting its own health.

pub mod conversation;
pub mod fallback;
pub mod news;
pub mod social;
pub mod synthetic;
pub mod text;
pub mod web_trends;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::query::TrendQuery;

/// Health of one source's contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Real,
    Mock,
    Error,
}

impl SourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceStatus::Real => "real",
            SourceStatus::Mock => "mock",
            SourceStatus::Error => "error",
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four facets of a trend report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    GoogleTrends,
    SocialMedia,
    News,
    AiConversations,
}

impl SourceKind {
    pub fn display_name(self) -> &'static str {
        match self {
            SourceKind::GoogleTrends => "Google Trends",
            SourceKind::SocialMedia => "Social Media",
            SourceKind::News => "News",
            SourceKind::AiConversations => "AI Conversations",
        }
    }

    /// Stable label for metrics and log fields.
    pub fn key(self) -> &'static str {
        match self {
            SourceKind::GoogleTrends => "google_trends",
            SourceKind::SocialMedia => "social_media",
            SourceKind::News => "news",
            SourceKind::AiConversations => "ai_conversations",
        }
    }
}

/// Output of one adapter. Never mutated after creation; the payload is always
/// present, even when `status` is `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult<T> {
    pub status: SourceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub payload: T,
}

impl<T> SourceResult<T> {
    pub fn real(payload: T, message: impl Into<String>) -> Self {
        Self {
            status: SourceStatus::Real,
            message: Some(message.into()),
            payload,
        }
    }

    pub fn mock(payload: T, message: impl Into<String>) -> Self {
        Self {
            status: SourceStatus::Mock,
            message: Some(message.into()),
            payload,
        }
    }

    pub fn error(payload: T, message: impl Into<String>) -> Self {
        Self {
            status: SourceStatus::Error,
            message: Some(message.into()),
            payload,
        }
    }
}

/// Contract every source adapter fulfils. `fetch` never fails: provider,
/// network and parsing errors become `status = Error` with a best-effort payload.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    type Payload: Send + 'static;

    fn kind(&self) -> SourceKind;

    async fn fetch(&self, query: &TrendQuery) -> SourceResult<Self::Payload>;

    /// Payload to report when the adapter could not finish at all
    /// (timeout, task failure). Must not touch the network.
    fn degraded_payload(&self, query: &TrendQuery) -> Self::Payload;

    /// Result reported when `fetch` did not finish within `after`.
    fn timed_out(&self, query: &TrendQuery, after: Duration) -> SourceResult<Self::Payload> {
        SourceResult::error(
            self.degraded_payload(query),
            format!(
                "{} timed out after {}ms",
                self.kind().display_name(),
                after.as_millis()
            ),
        )
    }
}

/// Shared outbound HTTP client. Per-call timeouts are applied by callers.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .connect_timeout(Duration::from_secs(4))
        .build()
        .unwrap_or_default()
}

/// Round and clamp a score into `0..=100`.
pub fn clamp_score(v: f64) -> u8 {
    if !v.is_finite() {
        return 0;
    }
    v.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_score_handles_out_of_range_and_nan() {
        assert_eq!(clamp_score(-4.0), 0);
        assert_eq!(clamp_score(100.6), 100);
        assert_eq!(clamp_score(49.5), 50);
        assert_eq!(clamp_score(f64::NAN), 0);
    }

    #[test]
    fn source_result_serializes_status_lowercase() {
        let r = SourceResult::error(0u8, "boom");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["message"], "boom");
    }
}
