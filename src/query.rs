//! Request input: topic, optional industry and timeframe.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// Look-back window for a trend query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Week => "7d",
            Timeframe::Month => "30d",
            Timeframe::Quarter => "90d",
            Timeframe::Year => "1y",
        }
    }

    pub fn days(self) -> i64 {
        match self {
            Timeframe::Week => 7,
            Timeframe::Month => 30,
            Timeframe::Quarter => 90,
            Timeframe::Year => 365,
        }
    }

    /// Window string understood by the Google Trends engines (`date` / `time` param).
    pub fn google_trends_window(self) -> &'static str {
        match self {
            Timeframe::Week => "now 7-d",
            Timeframe::Month => "today 1-m",
            Timeframe::Quarter => "today 3-m",
            Timeframe::Year => "today 12-m",
        }
    }

    /// Reddit search `t` parameter.
    pub fn reddit_window(self) -> &'static str {
        match self {
            Timeframe::Week => "week",
            Timeframe::Month | Timeframe::Quarter => "month",
            Timeframe::Year => "year",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7d" => Ok(Timeframe::Week),
            "30d" => Ok(Timeframe::Month),
            "90d" => Ok(Timeframe::Quarter),
            "1y" => Ok(Timeframe::Year),
            other => Err(QueryError::BadTimeframe(other.to_string())),
        }
    }
}

/// Immutable per-request input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendQuery {
    topic: String,
    industry: Option<String>,
    timeframe: Timeframe,
}

impl TrendQuery {
    /// Validates and trims the topic; blank industries are dropped.
    pub fn new(
        topic: impl AsRef<str>,
        industry: Option<&str>,
        timeframe: Timeframe,
    ) -> Result<Self, QueryError> {
        let topic = topic.as_ref().trim();
        if topic.is_empty() {
            return Err(QueryError::EmptyTopic);
        }
        let industry = industry
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(Self {
            topic: topic.to_string(),
            industry,
            timeframe,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn industry(&self) -> Option<&str> {
        self.industry.as_deref()
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Topic with the industry appended, used as the search phrase for providers
    /// that benefit from extra context.
    pub fn search_phrase(&self) -> String {
        match &self.industry {
            Some(ind) => format!("{} {}", self.topic, ind),
            None => self.topic.clone(),
        }
    }
}
