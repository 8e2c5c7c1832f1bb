// src/sources/news.rs
//! News coverage facet backed by NewsAPI `/v2/everything`.

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::trends::ENV_NEWS_KEY;
use crate::config::TrendsConfig;
use crate::error::{SourceError, SourceOutcome};
use crate::query::TrendQuery;
use crate::sentiment::{SentimentAnalyzer, SentimentLabel};
use crate::sources::text::{normalize_text, top_keywords};
use crate::sources::{SourceAdapter, SourceKind, SourceResult};

const PROVIDER: &str = "NewsAPI";
const PAGE_SIZE: &str = "50";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedNews {
    pub article_count: u64,
    /// -1.0..=1.0 across headlines.
    pub sentiment: f32,
    pub sentiment_label: SentimentLabel,
    pub top_sources: Vec<String>,
    pub headlines: Vec<String>,
    pub keywords: Vec<String>,
}

impl NormalizedNews {
    /// No coverage at all; used when the provider could not be read.
    pub fn empty() -> Self {
        Self {
            article_count: 0,
            sentiment: 0.0,
            sentiment_label: SentimentLabel::Neutral,
            top_sources: Vec::new(),
            headlines: Vec::new(),
            keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    total_results: Option<u64>,
    #[serde(default)]
    articles: Vec<Article>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    source: Option<ArticleSource>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

pub struct NewsAdapter {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    analyzer: SentimentAnalyzer,
}

impl NewsAdapter {
    pub fn new(http: reqwest::Client, api_key: Option<String>, base_url: String) -> Self {
        Self {
            http,
            api_key,
            base_url,
            analyzer: SentimentAnalyzer::new(),
        }
    }

    pub fn from_config(cfg: &TrendsConfig, http: reqwest::Client) -> Self {
        Self::new(http, cfg.keys.news.clone(), cfg.endpoints.news.clone())
    }

    async fn everything(&self, key: &str, query: &TrendQuery) -> SourceOutcome<NormalizedNews> {
        let (from, to) = date_range(Utc::now().date_naive(), query.timeframe().days());
        let (from, to) = (from.to_string(), to.to_string());
        let phrase = query.search_phrase();

        let resp = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", phrase.as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("language", "en"),
                ("sortBy", "relevancy"),
                ("pageSize", PAGE_SIZE),
            ])
            .header("X-Api-Key", key)
            .send()
            .await
            .map_err(|e| SourceError::transport(PROVIDER, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::from_status(PROVIDER, status.as_u16()));
        }
        let body: EverythingResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::decode(PROVIDER, e))?;
        if body.status != "ok" {
            return Err(SourceError::decode(
                PROVIDER,
                body.message.unwrap_or_else(|| body.status.clone()),
            ));
        }
        Ok(self.normalize(query, body))
    }

    fn normalize(&self, query: &TrendQuery, body: EverythingResponse) -> NormalizedNews {
        let titles: Vec<String> = body
            .articles
            .iter()
            .filter_map(|a| a.title.as_deref())
            .map(normalize_text)
            .filter(|t| !t.is_empty() && t != "[Removed]")
            .collect();

        let mut by_source: HashMap<String, usize> = HashMap::new();
        for name in body
            .articles
            .iter()
            .filter_map(|a| a.source.as_ref().and_then(|s| s.name.clone()))
            .filter(|n| !n.trim().is_empty() && n != "[Removed]")
        {
            *by_source.entry(name).or_insert(0) += 1;
        }
        let mut sources: Vec<(String, usize)> = by_source.into_iter().collect();
        sources.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let sentiment = self.analyzer.polarity(titles.iter().map(String::as_str));

        NormalizedNews {
            article_count: body
                .total_results
                .unwrap_or(body.articles.len() as u64),
            sentiment,
            sentiment_label: SentimentLabel::from_polarity(sentiment),
            top_sources: sources.into_iter().take(5).map(|(s, _)| s).collect(),
            keywords: top_keywords(titles.iter().map(String::as_str), query.topic(), 8),
            headlines: titles.into_iter().take(5).collect(),
        }
    }
}

/// `[today - days, today]`, inclusive, as calendar dates.
fn date_range(today: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
    (today - ChronoDuration::days(days), today)
}

#[async_trait::async_trait]
impl SourceAdapter for NewsAdapter {
    type Payload = NormalizedNews;

    fn kind(&self) -> SourceKind {
        SourceKind::News
    }

    async fn fetch(&self, query: &TrendQuery) -> SourceResult<NormalizedNews> {
        let Some(key) = self.api_key.as_deref() else {
            // Configuration error: reported as such, never simulated.
            return SourceResult::error(
                NormalizedNews::empty(),
                format!("News API key not configured (set {ENV_NEWS_KEY}); news coverage unavailable"),
            );
        };

        match self.everything(key, query).await {
            Ok(payload) => {
                let msg = format!("Real news data retrieved ({} articles)", payload.article_count);
                SourceResult::real(payload, msg)
            }
            Err(e) => {
                tracing::warn!(provider = PROVIDER, error = %e, "news fetch failed");
                SourceResult::error(NormalizedNews::empty(), e.to_string())
            }
        }
    }

    fn degraded_payload(&self, _query: &TrendQuery) -> NormalizedNews {
        NormalizedNews::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Timeframe;
    use crate::sources::SourceStatus;

    #[test]
    fn date_range_spans_timeframe() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let (from, to) = date_range(today, Timeframe::Month.days());
        assert_eq!(from.to_string(), "2025-03-01");
        assert_eq!(to, today);
    }

    #[test]
    fn normalize_ranks_sources_and_drops_removed() {
        let raw = r#"{
            "status": "ok",
            "totalResults": 42,
            "articles": [
                {"source": {"id": null, "name": "TechCrunch"}, "title": "AI startups see record growth"},
                {"source": {"id": null, "name": "Wired"}, "title": "Regulators warn of AI risks after breach"},
                {"source": {"id": null, "name": "TechCrunch"}, "title": "AI &amp; robotics growth surge"},
                {"source": {"id": null, "name": "[Removed]"}, "title": "[Removed]"}
            ]
        }"#;
        let body: EverythingResponse = serde_json::from_str(raw).unwrap();
        let q = TrendQuery::new("AI", None, Timeframe::Month).unwrap();
        let a = NewsAdapter::new(reqwest::Client::new(), None, String::new());
        let n = a.normalize(&q, body);

        assert_eq!(n.article_count, 42);
        assert_eq!(n.top_sources, vec!["TechCrunch".to_string(), "Wired".into()]);
        assert_eq!(n.headlines.len(), 3);
        assert_eq!(n.headlines[2], "AI & robotics growth surge");
        assert_eq!(n.keywords[0], "growth");
        assert_eq!(n.sentiment_label, SentimentLabel::Positive);
    }

    #[tokio::test]
    async fn missing_key_is_explicit_error() {
        let a = NewsAdapter::new(reqwest::Client::new(), None, String::new());
        let q = TrendQuery::new("AI", None, Timeframe::Week).unwrap();
        let r = a.fetch(&q).await;
        assert_eq!(r.status, SourceStatus::Error);
        assert!(r.message.unwrap().contains("not configured"));
        assert_eq!(r.payload, NormalizedNews::empty());
    }
}
