// src/sources/conversation.rs
//! Conversational-trend facet: an LLM estimate of how often a topic comes up
//! in AI-assistant conversations and what people ask about it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::TrendsConfig;
use crate::llm::{complete_with_timeout, extract_json_object, sanitize_line, DynChatClient};
use crate::query::TrendQuery;
use crate::sources::synthetic::SyntheticGenerator;
use crate::sources::{clamp_score, SourceAdapter, SourceKind, SourceResult};

const SYSTEM_PROMPT: &str = "You estimate how frequently a topic is discussed in conversations with AI assistants. \
Respond with a single JSON object only: {\"mentionFrequency\": <0-100 integer>, \
\"sentiment\": \"positive\"|\"neutral\"|\"negative\"|\"mixed\", \
\"commonQuestions\": [<up to 5 short strings>], \"emergingAngles\": [<up to 5 short strings>]}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationSentiment {
    Positive,
    Neutral,
    Negative,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedConversation {
    /// 0–100.
    pub mention_frequency: u8,
    pub sentiment: ConversationSentiment,
    pub common_questions: Vec<String>,
    pub emerging_angles: Vec<String>,
}

/// Strict shape expected from the model.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationEstimate {
    mention_frequency: f64,
    sentiment: ConversationSentiment,
    #[serde(default)]
    common_questions: Vec<String>,
    #[serde(default)]
    emerging_angles: Vec<String>,
}

/// Decode a model reply into a normalized payload; `None` when it does not
/// match the expected shape.
pub fn parse_estimate(raw: &str) -> Option<NormalizedConversation> {
    let json = extract_json_object(raw)?;
    let est: ConversationEstimate = serde_json::from_str(json).ok()?;
    if !est.mention_frequency.is_finite() {
        return None;
    }
    let clean = |v: Vec<String>| -> Vec<String> {
        v.iter()
            .map(|s| sanitize_line(s, 160))
            .filter(|s| !s.is_empty())
            .take(5)
            .collect()
    };
    Some(NormalizedConversation {
        mention_frequency: clamp_score(est.mention_frequency),
        sentiment: est.sentiment,
        common_questions: clean(est.common_questions),
        emerging_angles: clean(est.emerging_angles),
    })
}

pub struct ConversationAdapter {
    llm: DynChatClient,
    timeout: Duration,
    synthetic: SyntheticGenerator,
}

impl ConversationAdapter {
    pub fn new(llm: DynChatClient, timeout: Duration, synthetic: SyntheticGenerator) -> Self {
        Self {
            llm,
            timeout,
            synthetic,
        }
    }

    pub fn from_config(cfg: &TrendsConfig, llm: DynChatClient) -> Self {
        Self::new(
            llm,
            cfg.llm_timeout(),
            SyntheticGenerator::new(cfg.synthetic_seed),
        )
    }

    fn prompt(query: &TrendQuery) -> String {
        let mut p = format!(
            "Topic: \"{}\"\nTimeframe: last {}\n",
            query.topic(),
            query.timeframe()
        );
        if let Some(ind) = query.industry() {
            p.push_str(&format!("Industry: {ind}\n"));
        }
        p.push_str("Estimate the conversational trend for this topic.");
        p
    }
}

#[async_trait::async_trait]
impl SourceAdapter for ConversationAdapter {
    type Payload = NormalizedConversation;

    fn kind(&self) -> SourceKind {
        SourceKind::AiConversations
    }

    async fn fetch(&self, query: &TrendQuery) -> SourceResult<NormalizedConversation> {
        if !self.llm.is_configured() {
            return SourceResult::mock(
                self.synthetic.conversation(query),
                "AI conversation estimator not configured (set OPENAI_API_KEY); using simulated estimate",
            );
        }

        let user = Self::prompt(query);
        match complete_with_timeout(self.llm.as_ref(), SYSTEM_PROMPT, &user, self.timeout).await {
            Ok(raw) => match parse_estimate(&raw) {
                Some(payload) => {
                    let msg = format!(
                        "Real AI conversation estimate retrieved via {} (frequency {})",
                        self.llm.provider_name(),
                        payload.mention_frequency
                    );
                    SourceResult::real(payload, msg)
                }
                None => {
                    tracing::warn!("conversation estimate unparseable");
                    SourceResult::error(
                        self.synthetic.conversation(query),
                        "AI conversation estimate was not valid JSON; using simulated estimate",
                    )
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "conversation estimate failed");
                SourceResult::error(self.synthetic.conversation(query), e.to_string())
            }
        }
    }

    fn degraded_payload(&self, query: &TrendQuery) -> NormalizedConversation {
        self.synthetic.conversation(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{DisabledClient, MockClient};
    use crate::sources::SourceStatus;
    use std::sync::Arc;

    fn q() -> TrendQuery {
        TrendQuery::new("sourdough", Some("food"), Default::default()).unwrap()
    }

    fn adapter(llm: DynChatClient) -> ConversationAdapter {
        ConversationAdapter::new(llm, Duration::from_millis(100), SyntheticGenerator::new(0))
    }

    #[test]
    fn parse_clamps_and_trims() {
        let raw = r#"```json
        {"mentionFrequency": 140.2, "sentiment": "mixed",
         "commonQuestions": ["  How to start?\n", ""], "emergingAngles": []}
        ```"#;
        let p = parse_estimate(raw).unwrap();
        assert_eq!(p.mention_frequency, 100);
        assert_eq!(p.sentiment, ConversationSentiment::Mixed);
        assert_eq!(p.common_questions, vec!["How to start?".to_string()]);
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        assert!(parse_estimate(r#"{"mentionFrequency": "high"}"#).is_none());
        assert!(parse_estimate(r#"{"mentionFrequency": 50, "sentiment": "ecstatic"}"#).is_none());
        assert!(parse_estimate("plain text").is_none());
    }

    #[tokio::test]
    async fn real_when_model_answers() {
        let llm = Arc::new(MockClient::Reply(
            r#"{"mentionFrequency": 42, "sentiment": "positive", "commonQuestions": ["Why?"], "emergingAngles": ["Home baking"]}"#.into(),
        ));
        let r = adapter(llm).fetch(&q()).await;
        assert_eq!(r.status, SourceStatus::Real);
        assert_eq!(r.payload.mention_frequency, 42);
    }

    #[tokio::test]
    async fn unconfigured_is_mock_and_failures_are_errors() {
        let r = adapter(Arc::new(DisabledClient)).fetch(&q()).await;
        assert_eq!(r.status, SourceStatus::Mock);

        let r = adapter(Arc::new(MockClient::NetworkError)).fetch(&q()).await;
        assert_eq!(r.status, SourceStatus::Error);
        assert_eq!(r.payload, SyntheticGenerator::new(0).conversation(&q()));

        let r = adapter(Arc::new(MockClient::Hang)).fetch(&q()).await;
        assert_eq!(r.status, SourceStatus::Error);
        assert!(r.message.unwrap().contains("timed out"));

        let r = adapter(Arc::new(MockClient::Reply("not json".into()))).fetch(&q()).await;
        assert_eq!(r.status, SourceStatus::Error);
    }
}
