//! # Trend Aggregation Service
//! Orchestrates one analysis: all four adapters run concurrently, each bounded
//! by its own timeout, then health is recorded and the synthesizer produces
//! the report. Adapters never fail the whole request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::task::{JoinError, JoinHandle};

use crate::config::TrendsConfig;
use crate::health::SourceHealthTracker;
use crate::llm::build_chat_client;
use crate::query::TrendQuery;
use crate::report::{SourceBundle, TrendReport};
use crate::sources::conversation::{ConversationAdapter, NormalizedConversation};
use crate::sources::news::{NewsAdapter, NormalizedNews};
use crate::sources::social::{NormalizedSocial, SocialAdapter};
use crate::sources::web_trends::{NormalizedWebTrends, WebTrendsAdapter};
use crate::sources::{http_client, SourceAdapter, SourceKind, SourceResult};
use crate::synthesis::TrendSynthesizer;

pub type DynAdapter<P> = Arc<dyn SourceAdapter<Payload = P>>;

/// Spawned task that is aborted when the handle is dropped, so a timed-out or
/// cancelled request does not leave provider calls running.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct TrendAggregationService {
    web: DynAdapter<NormalizedWebTrends>,
    social: DynAdapter<NormalizedSocial>,
    news: DynAdapter<NormalizedNews>,
    conversation: DynAdapter<NormalizedConversation>,
    synthesizer: TrendSynthesizer,
    adapter_timeout: Duration,
}

impl TrendAggregationService {
    pub fn new(
        web: DynAdapter<NormalizedWebTrends>,
        social: DynAdapter<NormalizedSocial>,
        news: DynAdapter<NormalizedNews>,
        conversation: DynAdapter<NormalizedConversation>,
        synthesizer: TrendSynthesizer,
        adapter_timeout: Duration,
    ) -> Self {
        Self {
            web,
            social,
            news,
            conversation,
            synthesizer,
            adapter_timeout,
        }
    }

    /// Production wiring. One HTTP client and one chat client are shared by
    /// every adapter and the synthesizer.
    pub fn from_config(cfg: &TrendsConfig) -> Self {
        let mut cfg = cfg.clone();
        cfg.sanitize();
        let cfg = &cfg;
        let http = http_client();
        let llm = build_chat_client(cfg, http.clone());
        tracing::info!(
            serpapi = cfg.keys.serpapi.is_some(),
            searchapi = cfg.keys.searchapi.is_some(),
            reddit = cfg.keys.reddit.is_some(),
            news = cfg.keys.news.is_some(),
            llm = llm.provider_name(),
            "trend aggregation service configured"
        );
        Self::new(
            Arc::new(WebTrendsAdapter::from_config(cfg, http.clone())),
            Arc::new(SocialAdapter::from_config(cfg, http.clone())),
            Arc::new(NewsAdapter::from_config(cfg, http)),
            Arc::new(ConversationAdapter::from_config(cfg, llm.clone())),
            TrendSynthesizer::new(llm, cfg.llm_timeout()),
            cfg.adapter_timeout(),
        )
    }

    /// Full analysis for one query. Always produces a report.
    pub async fn analyze(&self, query: TrendQuery) -> TrendReport {
        let started = Instant::now();
        tracing::info!(
            topic = query.topic(),
            timeframe = %query.timeframe(),
            industry = query.industry().unwrap_or(""),
            "analysis started"
        );

        let (google_trends, social_media, news, ai_conversations) = tokio::join!(
            run_adapter(self.web.clone(), query.clone(), self.adapter_timeout),
            run_adapter(self.social.clone(), query.clone(), self.adapter_timeout),
            run_adapter(self.news.clone(), query.clone(), self.adapter_timeout),
            run_adapter(self.conversation.clone(), query.clone(), self.adapter_timeout),
        );
        let bundle = SourceBundle {
            google_trends,
            social_media,
            news,
            ai_conversations,
        };

        let mut health = SourceHealthTracker::new();
        health.record(SourceKind::GoogleTrends, &bundle.google_trends);
        health.record(SourceKind::SocialMedia, &bundle.social_media);
        health.record(SourceKind::News, &bundle.news);
        health.record(SourceKind::AiConversations, &bundle.ai_conversations);

        let synthesis = self.synthesizer.synthesize(&query, &bundle, &health).await;

        let elapsed = started.elapsed();
        counter!("trend_reports_total", "synthesis" => synthesis_label(&synthesis)).increment(1);
        histogram!("trend_analyze_ms").record(elapsed.as_secs_f64() * 1000.0);
        tracing::info!(
            topic = query.topic(),
            elapsed_ms = elapsed.as_millis() as u64,
            degraded = health.degraded_count(),
            trend_velocity = synthesis.trend_velocity,
            "analysis finished"
        );

        TrendReport {
            topic: query.topic().to_string(),
            industry: query.industry().map(str::to_string),
            timeframe: query.timeframe(),
            trend_velocity: synthesis.trend_velocity,
            ai_engagement_score: synthesis.ai_engagement_score,
            query_volume: synthesis.query_volume,
            forecast_confidence: synthesis.forecast_confidence,
            topic_clustering: synthesis.topic_clustering,
            related_topics: synthesis.related_topics,
            insights: synthesis.insights,
            data_sources: synthesis.data_sources,
            data_status: bundle.data_status(),
            status_messages: bundle.status_messages(),
            health_log: health.log_lines(),
            synthesis: synthesis.mode,
            sources: bundle,
            generated_at: chrono::Utc::now(),
        }
    }
}

fn synthesis_label(s: &crate::synthesis::Synthesis) -> &'static str {
    match s.mode {
        crate::report::SynthesisMode::Llm => "llm",
        crate::report::SynthesisMode::Fallback => "fallback",
    }
}

/// Run one adapter on its own task under `timeout`. A panicked task becomes an
/// `Error` result with the adapter's degraded payload; a timeout is reported
/// by the adapter itself (`SourceAdapter::timed_out`).
async fn run_adapter<P: Send + 'static>(
    adapter: DynAdapter<P>,
    query: TrendQuery,
    timeout: Duration,
) -> SourceResult<P> {
    let kind = adapter.kind();
    let task = AbortOnDrop(tokio::spawn({
        let adapter = adapter.clone();
        let query = query.clone();
        async move { adapter.fetch(&query).await }
    }));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::error!(source = kind.key(), error = %e, "adapter task failed");
            SourceResult::error(
                adapter.degraded_payload(&query),
                format!("{} adapter failed unexpectedly", kind.display_name()),
            )
        }
        Err(_) => {
            tracing::warn!(
                source = kind.key(),
                timeout_ms = timeout.as_millis() as u64,
                "adapter timed out"
            );
            adapter.timed_out(&query, timeout)
        }
    }
}
