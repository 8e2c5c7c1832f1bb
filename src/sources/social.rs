// src/sources/social.rs
//! Social-media facet backed by the Reddit search API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::trends::ENV_REDDIT_TOKEN;
use crate::config::TrendsConfig;
use crate::error::{SourceError, SourceOutcome};
use crate::query::TrendQuery;
use crate::sentiment::SentimentAnalyzer;
use crate::sources::synthetic::SyntheticGenerator;
use crate::sources::{clamp_score, SourceAdapter, SourceKind, SourceResult};

const PROVIDER: &str = "Reddit";
const MAX_POSTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSocial {
    /// 0–100.
    pub engagement: u8,
    pub mention_volume: u64,
    /// -1.0..=1.0
    pub sentiment: f32,
    pub trending_hashtags: Vec<String>,
    pub platforms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
}

pub struct SocialAdapter {
    http: reqwest::Client,
    token: Option<String>,
    base_url: String,
    synthetic: SyntheticGenerator,
    analyzer: SentimentAnalyzer,
}

impl SocialAdapter {
    pub fn new(
        http: reqwest::Client,
        token: Option<String>,
        base_url: String,
        synthetic: SyntheticGenerator,
    ) -> Self {
        Self {
            http,
            token,
            base_url,
            synthetic,
            analyzer: SentimentAnalyzer::new(),
        }
    }

    pub fn from_config(cfg: &TrendsConfig, http: reqwest::Client) -> Self {
        Self::new(
            http,
            cfg.keys.reddit.clone(),
            cfg.endpoints.reddit.clone(),
            SyntheticGenerator::new(cfg.synthetic_seed),
        )
    }

    async fn search(&self, token: &str, query: &TrendQuery) -> SourceOutcome<Vec<Post>> {
        let limit = MAX_POSTS.to_string();
        let resp = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", query.topic()),
                ("t", query.timeframe().reddit_window()),
                ("sort", "relevance"),
                ("limit", limit.as_str()),
            ])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SourceError::transport(PROVIDER, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::from_status(PROVIDER, status.as_u16()));
        }
        let listing: Listing = resp
            .json()
            .await
            .map_err(|e| SourceError::decode(PROVIDER, e))?;
        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }

    fn normalize(&self, posts: &[Post]) -> NormalizedSocial {
        let n = posts.len();
        let avg_interactions = if n == 0 {
            0.0
        } else {
            posts
                .iter()
                .map(|p| (p.score.max(0) + p.num_comments.max(0)) as f64)
                .sum::<f64>()
                / n as f64
        };
        // Log-scaled interaction depth plus a breadth bonus for many posts.
        let engagement = if n == 0 {
            0
        } else {
            clamp_score(25.0 * (1.0 + avg_interactions).log10() + 0.3 * n.min(MAX_POSTS) as f64)
        };

        let mut by_sub: HashMap<&str, usize> = HashMap::new();
        for p in posts.iter().filter(|p| !p.subreddit.is_empty()) {
            *by_sub.entry(p.subreddit.as_str()).or_insert(0) += 1;
        }
        let mut subs: Vec<(&str, usize)> = by_sub.into_iter().collect();
        subs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        NormalizedSocial {
            engagement,
            mention_volume: n as u64,
            sentiment: self.analyzer.polarity(posts.iter().map(|p| p.title.as_str())),
            trending_hashtags: subs.into_iter().take(5).map(|(s, _)| format!("r/{s}")).collect(),
            platforms: vec!["Reddit".to_string()],
        }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for SocialAdapter {
    type Payload = NormalizedSocial;

    fn kind(&self) -> SourceKind {
        SourceKind::SocialMedia
    }

    async fn fetch(&self, query: &TrendQuery) -> SourceResult<NormalizedSocial> {
        let Some(token) = self.token.as_deref() else {
            return SourceResult::mock(
                self.synthetic.social(query),
                format!(
                    "Social media API not configured (set {ENV_REDDIT_TOKEN}); using simulated engagement data"
                ),
            );
        };

        match self.search(token, query).await {
            Ok(posts) => {
                let payload = self.normalize(&posts);
                let msg = format!("Real social data retrieved ({} posts)", payload.mention_volume);
                SourceResult::real(payload, msg)
            }
            Err(e) => {
                tracing::warn!(provider = PROVIDER, error = %e, "social fetch failed");
                SourceResult::error(self.synthetic.social(query), e.to_string())
            }
        }
    }

    fn degraded_payload(&self, query: &TrendQuery) -> NormalizedSocial {
        self.synthetic.social(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceStatus;

    fn adapter(token: Option<&str>) -> SocialAdapter {
        SocialAdapter::new(
            reqwest::Client::new(),
            token.map(str::to_string),
            "http://127.0.0.1:1/search".to_string(),
            SyntheticGenerator::new(0),
        )
    }

    #[test]
    fn normalize_counts_subreddits_and_engagement() {
        let raw = r#"{"data":{"children":[
            {"data":{"title":"Huge growth for rust","subreddit":"rust","score":900,"num_comments":99}},
            {"data":{"title":"Rust crash fears","subreddit":"programming","score":0,"num_comments":0}},
            {"data":{"title":"rust wins again","subreddit":"rust","score":99,"num_comments":1}}
        ]}}"#;
        let listing: Listing = serde_json::from_str(raw).unwrap();
        let posts: Vec<Post> = listing.data.children.into_iter().map(|c| c.data).collect();
        let n = adapter(None).normalize(&posts);
        assert_eq!(n.mention_volume, 3);
        assert_eq!(n.trending_hashtags, vec!["r/rust".to_string(), "r/programming".into()]);
        // avg interactions = (999 + 0 + 100) / 3 ≈ 366 → 25*log10(367) + 0.9 ≈ 65
        assert_eq!(n.engagement, 65);
        assert!(n.sentiment > 0.0);
    }

    #[test]
    fn no_posts_means_zero_engagement() {
        let n = adapter(None).normalize(&[]);
        assert_eq!(n.engagement, 0);
        assert_eq!(n.sentiment, 0.0);
    }

    #[tokio::test]
    async fn missing_token_is_mock_not_error() {
        let q = TrendQuery::new("coffee", None, Default::default()).unwrap();
        let r = adapter(None).fetch(&q).await;
        assert_eq!(r.status, SourceStatus::Mock);
        assert!(r.message.unwrap().contains(ENV_REDDIT_TOKEN));
    }

    #[tokio::test]
    async fn unreachable_provider_is_error_with_payload() {
        let q = TrendQuery::new("coffee", None, Default::default()).unwrap();
        let r = adapter(Some("t")).fetch(&q).await;
        assert_eq!(r.status, SourceStatus::Error);
        assert_eq!(r.payload, SyntheticGenerator::new(0).social(&q));
    }
}
