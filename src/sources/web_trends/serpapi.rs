// src/sources/web_trends/serpapi.rs
//! Primary web-trends provider: SerpApi `google_trends` engine.

use serde::Deserialize;
use std::time::Instant;

use crate::config::trends::ENV_SERPAPI_KEY;
use crate::error::{SourceError, SourceOutcome};
use crate::query::TrendQuery;
use crate::sources::fallback::WebTrendsStrategy;
use crate::sources::web_trends::NormalizedWebTrends;

const PROVIDER: &str = "SerpApi";

#[derive(Debug, Deserialize)]
struct TimeseriesResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    interest_over_time: Option<InterestOverTime>,
}

#[derive(Debug, Deserialize)]
struct InterestOverTime {
    #[serde(default)]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimelinePoint {
    /// Unix seconds as a string.
    timestamp: String,
    #[serde(default)]
    values: Vec<TimelineValue>,
}

#[derive(Debug, Deserialize)]
struct TimelineValue {
    #[serde(default)]
    extracted_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RelatedQueriesResponse {
    #[serde(default)]
    related_queries: Option<RankedQueries>,
}

#[derive(Debug, Default, Deserialize)]
struct RankedQueries {
    #[serde(default)]
    rising: Vec<QueryEntry>,
    #[serde(default)]
    top: Vec<QueryEntry>,
}

#[derive(Debug, Deserialize)]
struct QueryEntry {
    query: String,
}

#[derive(Debug, Deserialize)]
struct RelatedTopicsResponse {
    #[serde(default)]
    related_topics: Option<RankedTopics>,
}

#[derive(Debug, Default, Deserialize)]
struct RankedTopics {
    #[serde(default)]
    rising: Vec<TopicEntry>,
    #[serde(default)]
    top: Vec<TopicEntry>,
}

#[derive(Debug, Deserialize)]
struct TopicEntry {
    topic: TopicRef,
}

#[derive(Debug, Deserialize)]
struct TopicRef {
    title: String,
}

pub struct SerpApiTrends {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl SerpApiTrends {
    pub fn new(http: reqwest::Client, api_key: Option<String>, base_url: String) -> Self {
        Self {
            http,
            api_key,
            base_url,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
        query: &TrendQuery,
        data_type: &str,
    ) -> SourceOutcome<T> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&[
                ("engine", "google_trends"),
                ("q", query.topic()),
                ("date", query.timeframe().google_trends_window()),
                ("data_type", data_type),
                ("api_key", key),
            ])
            .send()
            .await
            .map_err(|e| SourceError::transport(PROVIDER, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::from_status(PROVIDER, status.as_u16()));
        }
        resp.json::<T>()
            .await
            .map_err(|e| SourceError::decode(PROVIDER, e))
    }
}

#[async_trait::async_trait]
impl WebTrendsStrategy for SerpApiTrends {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn attempt(&self, query: &TrendQuery) -> SourceOutcome<NormalizedWebTrends> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(SourceError::NotConfigured {
                provider: PROVIDER,
                env_var: ENV_SERPAPI_KEY,
            });
        };
        let t0 = Instant::now();

        let series: TimeseriesResponse = self.get_json(key, query, "TIMESERIES").await?;
        if let Some(err) = series.error {
            return Err(if err.to_ascii_lowercase().contains("api key") {
                SourceError::Unauthorized { provider: PROVIDER }
            } else {
                SourceError::decode(PROVIDER, err)
            });
        }
        let points = series
            .interest_over_time
            .map(|iot| timeline_points(iot.timeline_data))
            .unwrap_or_default();
        if points.is_empty() {
            return Err(SourceError::Empty { provider: PROVIDER });
        }

        // Related data is best-effort: a failure here still leaves a real series.
        let (rq, rt) = tokio::join!(
            self.get_json::<RelatedQueriesResponse>(key, query, "RELATED_QUERIES"),
            self.get_json::<RelatedTopicsResponse>(key, query, "RELATED_TOPICS"),
        );
        let related_queries = rq
            .ok()
            .and_then(|r| r.related_queries)
            .map(|r| r.top.into_iter().chain(r.rising).map(|e| e.query).collect())
            .unwrap_or_default();
        let related_topics = rt
            .ok()
            .and_then(|r| r.related_topics)
            .map(|r| r.top.into_iter().chain(r.rising).map(|e| e.topic.title).collect())
            .unwrap_or_default();

        tracing::debug!(
            provider = PROVIDER,
            points = points.len(),
            ms = t0.elapsed().as_millis() as u64,
            "google trends fetched"
        );

        NormalizedWebTrends::from_points(points, related_queries, related_topics)
            .ok_or(SourceError::Empty { provider: PROVIDER })
    }
}

fn timeline_points(data: Vec<TimelinePoint>) -> Vec<(i64, f64)> {
    data.into_iter()
        .filter_map(|p| {
            let ts = p.timestamp.trim().parse::<i64>().ok()?;
            let v = p.values.first()?.extracted_value?;
            Some((ts, v))
        })
        .collect()
}
