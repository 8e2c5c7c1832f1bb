// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod llm;
pub mod metrics;
pub mod query;
pub mod report;
pub mod sentiment;
pub mod service;
pub mod sources;
pub mod synthesis;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, router, AppState};
pub use crate::config::TrendsConfig;
pub use crate::query::{Timeframe, TrendQuery};
pub use crate::report::TrendReport;
pub use crate::service::TrendAggregationService;

use axum::Router;

/// Full application router using the default config lookup
/// (`$TRENDS_CONFIG_PATH`, `config/trends.toml`, then environment keys).
/// `/metrics` is mounted when `TRENDS_METRICS=1`.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = TrendsConfig::load_default()?;
    Ok(app_with_config(&cfg, metrics::enabled_from_env()))
}

/// Router for an explicit config; used by tests that point providers at local servers.
pub fn app_with_config(cfg: &TrendsConfig, with_metrics: bool) -> Router {
    let state = AppState::new(TrendAggregationService::from_config(cfg));
    let mut router = api::create_router(state);
    if with_metrics {
        match metrics::Metrics::init() {
            Some(m) => router = router.merge(m.router()),
            None => tracing::warn!("/metrics requested but no recorder is available"),
        }
    }
    router
}
