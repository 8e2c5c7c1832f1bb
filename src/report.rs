//! The final artifact returned to callers. Built once per query, never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::Timeframe;
use crate::sources::conversation::NormalizedConversation;
use crate::sources::news::NormalizedNews;
use crate::sources::social::NormalizedSocial;
use crate::sources::web_trends::NormalizedWebTrends;
use crate::sources::{SourceResult, SourceStatus};

/// Status per source; always present even when everything degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStatus {
    pub google_trends: SourceStatus,
    pub social_media: SourceStatus,
    pub news: SourceStatus,
    pub ai_conversations: SourceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessages {
    pub google_trends: Option<String>,
    pub social_media: Option<String>,
    pub news: Option<String>,
    pub ai_conversations: Option<String>,
}

/// The four normalized source outputs, as collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBundle {
    pub google_trends: SourceResult<NormalizedWebTrends>,
    pub social_media: SourceResult<NormalizedSocial>,
    pub news: SourceResult<NormalizedNews>,
    pub ai_conversations: SourceResult<NormalizedConversation>,
}

impl SourceBundle {
    pub fn data_status(&self) -> DataStatus {
        DataStatus {
            google_trends: self.google_trends.status,
            social_media: self.social_media.status,
            news: self.news.status,
            ai_conversations: self.ai_conversations.status,
        }
    }

    pub fn status_messages(&self) -> StatusMessages {
        StatusMessages {
            google_trends: self.google_trends.message.clone(),
            social_media: self.social_media.message.clone(),
            news: self.news.message.clone(),
            ai_conversations: self.ai_conversations.message.clone(),
        }
    }
}

/// Which path produced the scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisMode {
    Llm,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    pub timeframe: Timeframe,
    pub trend_velocity: u8,
    pub ai_engagement_score: u8,
    pub query_volume: u8,
    pub forecast_confidence: u8,
    pub topic_clustering: Vec<String>,
    pub related_topics: Vec<String>,
    pub insights: Vec<String>,
    pub data_sources: Vec<String>,
    pub data_status: DataStatus,
    pub status_messages: StatusMessages,
    pub health_log: Vec<String>,
    pub synthesis: SynthesisMode,
    pub sources: SourceBundle,
    pub generated_at: DateTime<Utc>,
}
