//! # Trend Synthesizer
//! Combines the four normalized source outputs into report scores.
//!
//! Primary path asks the LLM for a strict JSON object. Any failure (not
//! configured, network, timeout, non-conforming output) switches to a local,
//! deterministic computation that needs no network and cannot fail.

use metrics::counter;
use serde::Deserialize;
use std::time::Duration;

use crate::health::{SourceHealthTracker, SIMULATED_SUFFIX};
use crate::llm::{complete_with_timeout, extract_json_object, sanitize_line, DynChatClient};
use crate::query::TrendQuery;
use crate::report::{SourceBundle, SynthesisMode};
use crate::sentiment::SentimentLabel;
use crate::sources::web_trends::TrendDirection;
use crate::sources::{clamp_score, SourceStatus};

/// Forecast confidence used when the model did not provide one.
pub const FALLBACK_FORECAST_CONFIDENCE: u8 = 60;

const MAX_CLUSTERS: usize = 5;
const MAX_RELATED: usize = 10;
const MAX_INSIGHTS: usize = 6;
const MAX_INSIGHT_CHARS: usize = 240;

const SYSTEM_PROMPT: &str = "You are a marketing trend analyst. Combine the provided source data into one \
trend assessment. Sources marked \"mock\" are simulated and \"error\" sources are unavailable; weigh them accordingly. \
Respond with a single JSON object only, with exactly these keys: \
trendVelocity, aiEngagementScore, queryVolume, forecastConfidence (integers 0-100), \
topicClustering (array of up to 5 strings), relatedTopics (array of up to 10 strings), \
dataSources (array of source names you relied on), insights (array of 3-6 short sentences).";

/// Scores and lists produced by either synthesis path.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub trend_velocity: u8,
    pub ai_engagement_score: u8,
    pub query_volume: u8,
    pub forecast_confidence: u8,
    pub topic_clustering: Vec<String>,
    pub related_topics: Vec<String>,
    pub insights: Vec<String>,
    pub data_sources: Vec<String>,
    pub mode: SynthesisMode,
}

/// Result of decoding a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOutcome {
    Parsed(Synthesis),
    Unparseable(String),
}

/// Exact shape requested from the model; every key is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSynthesis {
    trend_velocity: f64,
    ai_engagement_score: f64,
    query_volume: f64,
    forecast_confidence: f64,
    topic_clustering: Vec<String>,
    related_topics: Vec<String>,
    data_sources: Vec<String>,
    insights: Vec<String>,
}

pub struct TrendSynthesizer {
    llm: DynChatClient,
    timeout: Duration,
}

impl TrendSynthesizer {
    pub fn new(llm: DynChatClient, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Always returns a synthesis; the LLM path is attempted only when configured.
    pub async fn synthesize(
        &self,
        query: &TrendQuery,
        bundle: &SourceBundle,
        health: &SourceHealthTracker,
    ) -> Synthesis {
        let contributing = health.contributing_sources();

        if !self.llm.is_configured() {
            tracing::debug!("LLM not configured; using deterministic synthesis");
            counter!("trend_synthesis_fallback_total", "reason" => "not_configured").increment(1);
            return fallback(query, bundle, health);
        }

        let prompt = build_prompt(query, bundle);
        match complete_with_timeout(self.llm.as_ref(), SYSTEM_PROMPT, &prompt, self.timeout).await
        {
            Ok(raw) => match decode(&raw, &contributing) {
                SynthesisOutcome::Parsed(s) => s,
                SynthesisOutcome::Unparseable(raw) => {
                    tracing::warn!(
                        chars = raw.chars().count(),
                        "LLM synthesis unparseable; using deterministic synthesis"
                    );
                    counter!("trend_synthesis_fallback_total", "reason" => "unparseable")
                        .increment(1);
                    fallback(query, bundle, health)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "LLM synthesis failed; using deterministic synthesis");
                counter!("trend_synthesis_fallback_total", "reason" => "llm_error").increment(1);
                fallback(query, bundle, health)
            }
        }
    }
}

/// User prompt embedding every payload together with its status.
pub fn build_prompt(query: &TrendQuery, bundle: &SourceBundle) -> String {
    let data = serde_json::to_string_pretty(bundle).unwrap_or_else(|_| "{}".to_string());
    let mut p = format!(
        "Topic: \"{}\"\nTimeframe: {}\n",
        query.topic(),
        query.timeframe()
    );
    if let Some(ind) = query.industry() {
        p.push_str(&format!("Industry: {ind}\n"));
    }
    p.push_str("Source data (each with status real|mock|error and a message):\n");
    p.push_str(&data);
    p
}

/// Strict decode of a model reply. `contributing` lists the non-error source
/// names; the model's `dataSources` is reconciled against it.
pub fn decode(raw: &str, contributing: &[String]) -> SynthesisOutcome {
    let unparseable = || SynthesisOutcome::Unparseable(raw.to_string());

    let Some(json) = extract_json_object(raw) else {
        return unparseable();
    };
    let Ok(parsed) = serde_json::from_str::<LlmSynthesis>(json) else {
        return unparseable();
    };
    let scores = [
        parsed.trend_velocity,
        parsed.ai_engagement_score,
        parsed.query_volume,
        parsed.forecast_confidence,
    ];
    if scores.iter().any(|v| !v.is_finite()) {
        return unparseable();
    }
    let insights = clean_list(parsed.insights, MAX_INSIGHTS, MAX_INSIGHT_CHARS);
    if insights.is_empty() {
        return unparseable();
    }

    SynthesisOutcome::Parsed(Synthesis {
        trend_velocity: clamp_score(parsed.trend_velocity),
        ai_engagement_score: clamp_score(parsed.ai_engagement_score),
        query_volume: clamp_score(parsed.query_volume),
        forecast_confidence: clamp_score(parsed.forecast_confidence),
        topic_clustering: clean_list(parsed.topic_clustering, MAX_CLUSTERS, 80),
        related_topics: clean_list(parsed.related_topics, MAX_RELATED, 80),
        insights,
        data_sources: reconcile_sources(&parsed.data_sources, contributing),
        mode: SynthesisMode::Llm,
    })
}

fn clean_list(items: Vec<String>, max_items: usize, max_chars: usize) -> Vec<String> {
    let cleaned = items
        .iter()
        .map(|s| sanitize_line(s, max_chars))
        .collect::<Vec<_>>();
    crate::sources::text::dedup_preserving_order(cleaned)
        .into_iter()
        .take(max_items)
        .collect()
}

/// Comparable form of a source name: the " (simulated)" label is dropped,
/// then only lowercase alphanumerics are kept.
fn source_key(s: &str) -> String {
    let s = s.trim();
    let base = s.strip_suffix(SIMULATED_SUFFIX).unwrap_or(s);
    base.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Keep only model-named sources whose name equals a contributing source;
/// fall back to the full contributing list when nothing matches.
fn reconcile_sources(claimed: &[String], contributing: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for c in claimed {
        let key = source_key(c);
        if key.is_empty() {
            continue;
        }
        if let Some(hit) = contributing.iter().find(|s| source_key(s) == key) {
            if !out.contains(hit) {
                out.push(hit.clone());
            }
        }
    }
    if out.is_empty() {
        contributing.to_vec()
    } else {
        out
    }
}

/// Deterministic synthesis straight from the payloads.
pub fn fallback(
    query: &TrendQuery,
    bundle: &SourceBundle,
    health: &SourceHealthTracker,
) -> Synthesis {
    let web = &bundle.google_trends.payload;
    let social = &bundle.social_media.payload;
    let news = &bundle.news;
    let convo = &bundle.ai_conversations.payload;

    let trend_velocity =
        clamp_score((web.interest_score as f64 + social.engagement as f64) / 2.0);

    let related = web
        .related_queries
        .iter()
        .chain(web.related_topics.iter())
        .cloned()
        .collect::<Vec<_>>();

    let mut insights = Vec::new();
    let direction = match web.trend_direction {
        TrendDirection::Increasing => "is increasing",
        TrendDirection::Decreasing => "is decreasing",
        TrendDirection::Stable => "is holding steady",
    };
    insights.push(format!(
        "Search interest in \"{}\" {} over the last {} (interest score {}/100).",
        query.topic(),
        direction,
        query.timeframe(),
        web.interest_score
    ));
    insights.push(format!(
        "Social engagement is {} ({}/100) across {} recent posts.",
        level(social.engagement),
        social.engagement,
        social.mention_volume
    ));
    if news.status == SourceStatus::Error {
        insights.push("News coverage could not be measured for this period.".to_string());
    } else if news.payload.article_count == 0 {
        insights.push("No news coverage was found for this period.".to_string());
    } else {
        let lead = match news.payload.top_sources.first() {
            Some(s) => format!(", led by {s}"),
            None => String::new(),
        };
        let sentiment = match news.payload.sentiment_label {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        };
        insights.push(format!(
            "News coverage: {} articles with {} sentiment{}.",
            news.payload.article_count, sentiment, lead
        ));
    }
    let angle = convo
        .emerging_angles
        .first()
        .map(|a| format!("; emerging angle: {a}"))
        .unwrap_or_default();
    insights.push(format!(
        "AI assistant conversations show {} interest ({}/100){}.",
        level(convo.mention_frequency),
        convo.mention_frequency,
        angle
    ));
    let degraded = health.degraded_count();
    if degraded > 0 {
        insights.push(format!(
            "{degraded} of 4 sources used simulated or unavailable data; treat scores as indicative."
        ));
    }

    Synthesis {
        trend_velocity,
        ai_engagement_score: convo.mention_frequency.min(100),
        query_volume: web.interest_score.min(100),
        forecast_confidence: FALLBACK_FORECAST_CONFIDENCE,
        topic_clustering: web.related_topics.iter().take(MAX_CLUSTERS).cloned().collect(),
        related_topics: crate::sources::text::dedup_preserving_order(related)
            .into_iter()
            .take(MAX_RELATED)
            .collect(),
        insights,
        data_sources: health.contributing_sources(),
        mode: SynthesisMode::Fallback,
    }
}

fn level(score: u8) -> &'static str {
    match score {
        70..=u8::MAX => "high",
        40..=69 => "moderate",
        _ => "low",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{DisabledClient, MockClient};
    use crate::query::Timeframe;
    use crate::sources::news::NormalizedNews;
    use crate::sources::synthetic::SyntheticGenerator;
    use crate::sources::{SourceKind, SourceResult};
    use std::sync::Arc;

    fn query() -> TrendQuery {
        TrendQuery::new("artificial intelligence", None, Timeframe::Month).unwrap()
    }

    fn bundle(web_interest: u8, engagement: u8) -> SourceBundle {
        let g = SyntheticGenerator::new(3);
        let q = query();
        let mut web = g.web_trends(&q);
        web.interest_score = web_interest;
        let mut social = g.social(&q);
        social.engagement = engagement;
        SourceBundle {
            google_trends: SourceResult::mock(web, "simulated"),
            social_media: SourceResult::mock(social, "simulated"),
            news: SourceResult::error(NormalizedNews::empty(), "not configured"),
            ai_conversations: SourceResult::mock(g.conversation(&q), "simulated"),
        }
    }

    fn health(b: &SourceBundle) -> SourceHealthTracker {
        let mut h = SourceHealthTracker::new();
        h.record(SourceKind::GoogleTrends, &b.google_trends);
        h.record(SourceKind::SocialMedia, &b.social_media);
        h.record(SourceKind::News, &b.news);
        h.record(SourceKind::AiConversations, &b.ai_conversations);
        h
    }

    const GOOD_REPLY: &str = r#"{
        "trendVelocity": 81.4, "aiEngagementScore": 140, "queryVolume": -3,
        "forecastConfidence": 72, "topicClustering": ["LLMs", "Agents"],
        "relatedTopics": ["AI tools"], "dataSources": ["Google Trends", "News"],
        "insights": ["Interest is climbing.", "  "]
    }"#;

    #[tokio::test]
    async fn network_error_uses_exact_fallback_arithmetic() {
        let b = bundle(71, 90);
        let h = health(&b);
        let s = TrendSynthesizer::new(Arc::new(MockClient::NetworkError), Duration::from_secs(1))
            .synthesize(&query(), &b, &h)
            .await;
        assert_eq!(s.mode, SynthesisMode::Fallback);
        // round((71 + 90) / 2) = round(80.5) = 81
        assert_eq!(s.trend_velocity, 81);
        assert_eq!(s.query_volume, 71);
        assert_eq!(s.ai_engagement_score, b.ai_conversations.payload.mention_frequency);
        assert_eq!(s.forecast_confidence, FALLBACK_FORECAST_CONFIDENCE);
        assert_eq!(
            s.topic_clustering,
            b.google_trends.payload.related_topics.iter().take(5).cloned().collect::<Vec<_>>()
        );
        assert!(!s.insights.is_empty());
        assert!(!s.data_sources.iter().any(|d| d.starts_with("News")));
    }

    #[tokio::test]
    async fn valid_reply_is_clamped_and_reconciled() {
        let b = bundle(50, 50);
        let h = health(&b);
        let s = TrendSynthesizer::new(
            Arc::new(MockClient::Reply(GOOD_REPLY.to_string())),
            Duration::from_secs(1),
        )
        .synthesize(&query(), &b, &h)
        .await;
        assert_eq!(s.mode, SynthesisMode::Llm);
        assert_eq!(s.trend_velocity, 81);
        assert_eq!(s.ai_engagement_score, 100);
        assert_eq!(s.query_volume, 0);
        assert_eq!(s.insights, vec!["Interest is climbing.".to_string()]);
        // "News" errored, so only Google Trends survives.
        assert_eq!(s.data_sources, vec!["Google Trends (simulated)".to_string()]);
    }

    #[test]
    fn decode_rejects_missing_fields_and_prose() {
        let contributing = vec!["News".to_string()];
        assert!(matches!(
            decode(r#"{"trendVelocity": 50}"#, &contributing),
            SynthesisOutcome::Unparseable(_)
        ));
        assert!(matches!(
            decode("The trend looks great!", &contributing),
            SynthesisOutcome::Unparseable(_)
        ));
        let no_insights = GOOD_REPLY.replace(r#"["Interest is climbing.", "  "]"#, "[]");
        assert!(matches!(
            decode(&no_insights, &contributing),
            SynthesisOutcome::Unparseable(_)
        ));
    }

    #[test]
    fn reconcile_falls_back_when_nothing_matches() {
        let contributing = vec!["Social Media".to_string()];
        assert_eq!(
            reconcile_sources(&["Twitter".to_string()], &contributing),
            contributing
        );
        assert_eq!(
            reconcile_sources(&["social".to_string(), "Social Media".into()], &contributing),
            contributing
        );
    }

    #[test]
    fn reconcile_matches_whole_names_only() {
        let contributing = vec![
            "Google Trends (simulated)".to_string(),
            "Social Media".into(),
            "AI Conversations".into(),
        ];
        // Fragments never pick an arbitrary source.
        assert_eq!(
            reconcile_sources(&["ai".to_string(), "s".into(), "Social Media".into()], &contributing),
            vec!["Social Media".to_string()]
        );
        assert_eq!(
            reconcile_sources(&["google trends".to_string(), "AI-Conversations".into()], &contributing),
            vec!["Google Trends (simulated)".to_string(), "AI Conversations".into()]
        );
        assert_eq!(
            reconcile_sources(&["ai".to_string()], &contributing),
            contributing
        );
    }

    #[tokio::test]
    async fn unconfigured_and_garbage_replies_fall_back() {
        let b = bundle(10, 20);
        let h = health(&b);
        let clients: [DynChatClient; 3] = [
            Arc::new(DisabledClient),
            Arc::new(MockClient::Reply("```json\n{ nope }\n```".into())),
            Arc::new(MockClient::Hang),
        ];
        for llm in clients {
            let s = TrendSynthesizer::new(llm, Duration::from_millis(20))
                .synthesize(&query(), &b, &h)
                .await;
            assert_eq!(s.mode, SynthesisMode::Fallback);
            assert_eq!(s.trend_velocity, 15);
        }
    }

    #[test]
    fn prompt_embeds_statuses() {
        let b = bundle(10, 20);
        let p = build_prompt(&query(), &b);
        assert!(p.contains("artificial intelligence"));
        assert!(p.contains("\"status\": \"error\""));
        assert!(p.contains("interestScore"));
    }
}
