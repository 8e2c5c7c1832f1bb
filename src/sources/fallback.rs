// src/sources/fallback.rs
//! Ordered fallback chain for the web-trends facet.
//!
//! Strategies run strictly in order, each bounded by its own timeout. The first
//! one that yields real data wins and later strategies are never consulted.
//! The synthetic generator terminates the chain, so it cannot fail.

use metrics::counter;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{SourceError, SourceOutcome};
use crate::query::TrendQuery;
use crate::sources::synthetic::SyntheticGenerator;
use crate::sources::web_trends::NormalizedWebTrends;
use crate::sources::SourceResult;

/// One real provider in the chain.
#[async_trait::async_trait]
pub trait WebTrendsStrategy: Send + Sync {
    /// Provider name used in messages and logs.
    fn name(&self) -> &'static str;

    async fn attempt(&self, query: &TrendQuery) -> SourceOutcome<NormalizedWebTrends>;
}

/// Why one strategy was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub strategy: &'static str,
    pub reason: String,
}

pub struct FallbackChain {
    strategies: Vec<Arc<dyn WebTrendsStrategy>>,
    terminal: SyntheticGenerator,
    per_strategy_timeout: Duration,
}

impl FallbackChain {
    pub fn new(
        strategies: Vec<Arc<dyn WebTrendsStrategy>>,
        terminal: SyntheticGenerator,
        per_strategy_timeout: Duration,
    ) -> Self {
        Self {
            strategies,
            terminal,
            per_strategy_timeout,
        }
    }

    pub async fn run(&self, query: &TrendQuery) -> SourceResult<NormalizedWebTrends> {
        let mut skipped: Vec<Skipped> = Vec::new();

        for strategy in &self.strategies {
            let outcome =
                match tokio::time::timeout(self.per_strategy_timeout, strategy.attempt(query))
                    .await
                {
                    Ok(r) => r,
                    Err(_) => Err(SourceError::Timeout {
                        provider: strategy.name(),
                        after: self.per_strategy_timeout,
                    }),
                };

            match outcome {
                Ok(payload) => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        skipped = skipped.len(),
                        "web trends strategy succeeded"
                    );
                    return SourceResult::real(
                        payload,
                        format!("Real Google Trends data retrieved via {}", strategy.name()),
                    );
                }
                Err(e) => {
                    // Missing credentials are expected configuration, not a failure.
                    if matches!(e, SourceError::NotConfigured { .. }) {
                        tracing::debug!(strategy = strategy.name(), "strategy not configured");
                    } else {
                        tracing::warn!(strategy = strategy.name(), error = %e, "web trends strategy failed");
                    }
                    counter!("trend_fallback_advance_total", "strategy" => strategy.name())
                        .increment(1);
                    skipped.push(Skipped {
                        strategy: strategy.name(),
                        reason: e.short_reason().to_string(),
                    });
                }
            }
        }

        SourceResult::mock(self.terminal.web_trends(query), mock_message(&skipped))
    }
}

fn mock_message(skipped: &[Skipped]) -> String {
    if skipped.is_empty() {
        return "Using simulated Google Trends data".to_string();
    }
    let reasons = skipped
        .iter()
        .map(|s| format!("{}: {}", s.strategy, s.reason))
        .collect::<Vec<_>>()
        .join("; ");
    format!("Using simulated Google Trends data ({reasons})")
}
