// src/sources/web_trends/mod.rs
//! Web search interest (Google Trends) via a fallback chain:
//! SerpApi → SearchApi.io → synthetic generator.

pub mod searchapi;
pub mod serpapi;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::TrendsConfig;
use crate::query::TrendQuery;
use crate::sources::fallback::{FallbackChain, WebTrendsStrategy};
use crate::sources::synthetic::SyntheticGenerator;
use crate::sources::{clamp_score, SourceAdapter, SourceKind, SourceResult};

/// Maximum number of time-series points kept after normalization.
pub const MAX_SERIES_POINTS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePoint {
    /// Unix seconds.
    pub timestamp: i64,
    pub value: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedWebTrends {
    pub interest_score: u8,
    pub related_queries: Vec<String>,
    pub related_topics: Vec<String>,
    pub trend_direction: TrendDirection,
    /// Oldest first, most recent last.
    pub time_series: Vec<TimePoint>,
}

impl NormalizedWebTrends {
    /// Normalize raw `(unix_ts, value)` points from any provider.
    ///
    /// Points are sorted by time, down-sampled to at most `MAX_SERIES_POINTS`
    /// (always keeping the most recent one), and scored.
    pub fn from_points(
        mut points: Vec<(i64, f64)>,
        related_queries: Vec<String>,
        related_topics: Vec<String>,
    ) -> Option<Self> {
        points.retain(|(_, v)| v.is_finite());
        if points.is_empty() {
            return None;
        }
        points.sort_by_key(|(ts, _)| *ts);

        let kept = downsample(&points, MAX_SERIES_POINTS);
        let time_series: Vec<TimePoint> = kept
            .iter()
            .map(|(ts, v)| TimePoint {
                timestamp: *ts,
                value: clamp_score(*v),
            })
            .collect();

        let values: Vec<f64> = time_series.iter().map(|p| p.value as f64).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        Some(Self {
            interest_score: clamp_score(mean),
            related_queries: crate::sources::text::dedup_preserving_order(related_queries),
            related_topics: crate::sources::text::dedup_preserving_order(related_topics),
            trend_direction: direction_of(&values),
            time_series,
        })
    }
}

/// Evenly spaced picks ending at the last element.
fn downsample(points: &[(i64, f64)], max: usize) -> Vec<(i64, f64)> {
    if points.len() <= max {
        return points.to_vec();
    }
    let last = points.len() - 1;
    (0..max)
        .map(|i| {
            let idx = last - ((max - 1 - i) * last) / (max - 1);
            points[idx]
        })
        .collect()
}

/// Compare the mean of the last third against the first third (±10 % band).
pub fn direction_of(values: &[f64]) -> TrendDirection {
    if values.len() < 2 {
        return TrendDirection::Stable;
    }
    let third = (values.len() / 3).max(1);
    let head = values[..third].iter().sum::<f64>() / third as f64;
    let tail = values[values.len() - third..].iter().sum::<f64>() / third as f64;

    if head <= f64::EPSILON {
        return if tail > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Stable
        };
    }
    let change = (tail - head) / head;
    if change > 0.10 {
        TrendDirection::Increasing
    } else if change < -0.10 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// Adapter for the Google Trends facet; owns the fallback chain.
pub struct WebTrendsAdapter {
    chain: FallbackChain,
    synthetic: SyntheticGenerator,
}

impl WebTrendsAdapter {
    pub fn new(chain: FallbackChain, synthetic: SyntheticGenerator) -> Self {
        Self { chain, synthetic }
    }

    /// Standard chain: SerpApi, then SearchApi.io, then synthetic data.
    /// `TrendsConfig` keeps `WEB_TRENDS_STRATEGIES` in step with this list.
    pub fn from_config(cfg: &TrendsConfig, http: reqwest::Client) -> Self {
        let synthetic = SyntheticGenerator::new(cfg.synthetic_seed);
        let strategies: Vec<Arc<dyn WebTrendsStrategy>> = vec![
            Arc::new(serpapi::SerpApiTrends::new(
                http.clone(),
                cfg.keys.serpapi.clone(),
                cfg.endpoints.serpapi.clone(),
            )),
            Arc::new(searchapi::SearchApiTrends::new(
                http,
                cfg.keys.searchapi.clone(),
                cfg.endpoints.searchapi.clone(),
            )),
        ];
        let chain = FallbackChain::new(strategies, synthetic.clone(), cfg.strategy_timeout());
        Self::new(chain, synthetic)
    }
}

#[async_trait::async_trait]
impl SourceAdapter for WebTrendsAdapter {
    type Payload = NormalizedWebTrends;

    fn kind(&self) -> SourceKind {
        SourceKind::GoogleTrends
    }

    async fn fetch(&self, query: &TrendQuery) -> SourceResult<NormalizedWebTrends> {
        self.chain.run(query).await
    }

    fn degraded_payload(&self, query: &TrendQuery) -> NormalizedWebTrends {
        self.synthetic.web_trends(query)
    }

    /// The chain ends in synthetic data, so running out of time is still a
    /// labeled mock rather than an error.
    fn timed_out(&self, query: &TrendQuery, after: Duration) -> SourceResult<NormalizedWebTrends> {
        SourceResult::mock(
            self.synthetic.web_trends(query),
            format!(
                "Using simulated Google Trends data (providers did not answer within {}ms)",
                after.as_millis()
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsample_keeps_last_point_and_order() {
        let pts: Vec<(i64, f64)> = (0..30).map(|i| (i as i64, i as f64)).collect();
        let out = downsample(&pts, 7);
        assert_eq!(out.len(), 7);
        assert_eq!(out.last().unwrap().0, 29);
        assert_eq!(out.first().unwrap().0, 0);
        assert!(out.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn from_points_scores_and_detects_direction() {
        let pts = vec![(3, 60.0), (1, 20.0), (2, 40.0)];
        let n = NormalizedWebTrends::from_points(pts, vec!["a".into(), "A".into()], vec![])
            .unwrap();
        assert_eq!(n.interest_score, 40);
        assert_eq!(n.trend_direction, TrendDirection::Increasing);
        assert_eq!(n.time_series.first().unwrap().timestamp, 1);
        assert_eq!(n.related_queries, vec!["a".to_string()]);
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(NormalizedWebTrends::from_points(vec![], vec![], vec![]).is_none());
    }

    #[test]
    fn flat_and_falling_series() {
        assert_eq!(direction_of(&[50.0, 51.0, 50.0]), TrendDirection::Stable);
        assert_eq!(direction_of(&[80.0, 60.0, 40.0]), TrendDirection::Decreasing);
        assert_eq!(direction_of(&[0.0, 0.0, 0.0]), TrendDirection::Stable);
    }
}
