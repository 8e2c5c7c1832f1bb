// src/sources/web_trends/searchapi.rs
//! Secondary web-trends provider: SearchApi.io `google_trends` engine.

use serde::Deserialize;

use crate::config::trends::ENV_SEARCHAPI_KEY;
use crate::error::{SourceError, SourceOutcome};
use crate::query::TrendQuery;
use crate::sources::fallback::WebTrendsStrategy;
use crate::sources::web_trends::NormalizedWebTrends;

const PROVIDER: &str = "SearchApi";

#[derive(Debug, Deserialize)]
struct SearchApiTimeseries {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    interest_over_time: Option<SearchApiInterest>,
}

#[derive(Debug, Deserialize)]
struct SearchApiInterest {
    #[serde(default)]
    timeline_data: Vec<SearchApiPoint>,
}

#[derive(Debug, Deserialize)]
struct SearchApiPoint {
    timestamp: String,
    #[serde(default)]
    values: Vec<SearchApiValue>,
}

#[derive(Debug, Deserialize)]
struct SearchApiValue {
    #[serde(default)]
    extracted_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchApiRelated {
    #[serde(default)]
    related_queries: Option<SearchApiRanked>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchApiRanked {
    #[serde(default)]
    top: Vec<SearchApiQuery>,
    #[serde(default)]
    rising: Vec<SearchApiQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchApiQuery {
    query: String,
}

pub struct SearchApiTrends {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl SearchApiTrends {
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
                ("time", query.timeframe().google_trends_window()),
                ("data_type", data_type),
            ])
            .bearer_auth(key)
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
impl WebTrendsStrategy for SearchApiTrends {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn attempt(&self, query: &TrendQuery) -> SourceOutcome<NormalizedWebTrends> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(SourceError::NotConfigured {
                provider: PROVIDER,
                env_var: ENV_SEARCHAPI_KEY,
            });
        };

        let series: SearchApiTimeseries = self.get_json(key, query, "TIMESERIES").await?;
        if let Some(err) = series.error {
            return Err(SourceError::decode(PROVIDER, err));
        }
        let points: Vec<(i64, f64)> = series
            .interest_over_time
            .map(|iot| {
                iot.timeline_data
                    .into_iter()
                    .filter_map(|p| {
                        let ts = p.timestamp.trim().parse::<i64>().ok()?;
                        let v = p.values.first()?.extracted_value?;
                        Some((ts, v))
                    })
                    .collect()
            })
            .unwrap_or_default();
        if points.is_empty() {
            return Err(SourceError::Empty { provider: PROVIDER });
        }

        let related_queries: Vec<String> = self
            .get_json::<SearchApiRelated>(key, query, "RELATED_QUERIES")
            .await
            .ok()
            .and_then(|r| r.related_queries)
            .map(|r| r.top.into_iter().chain(r.rising).map(|e| e.query).collect())
            .unwrap_or_default();

        // SearchApi has no topic entities on this plan; top queries double as topics.
        let related_topics = related_queries.iter().take(5).cloned().collect();

        NormalizedWebTrends::from_points(points, related_queries, related_topics)
            .ok_or(SourceError::Empty { provider: PROVIDER })
    }
}
