use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Env switch that mounts `/metrics` on the app router.
pub const ENV_METRICS_ENABLED: &str = "TRENDS_METRICS";

static HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder (once) and describe the
    /// series this crate emits. Returns `None` if another recorder was
    /// installed first.
    pub fn init() -> Option<Self> {
        let handle = HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(h) => {
                describe();
                Some(h)
            }
            Err(e) => {
                tracing::warn!(error = %e, "prometheus recorder not installed");
                None
            }
        });
        handle.clone().map(|handle| Self { handle })
    }

    /// `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

pub fn enabled_from_env() -> bool {
    std::env::var(ENV_METRICS_ENABLED)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn describe() {
    describe_counter!(
        "trend_source_status_total",
        "Source results by source and status (real/mock/error)."
    );
    describe_counter!(
        "trend_fallback_advance_total",
        "Web-trends strategies skipped, by strategy."
    );
    describe_counter!(
        "trend_synthesis_fallback_total",
        "Syntheses computed locally instead of by the LLM, by reason."
    );
    describe_counter!("trend_reports_total", "Reports produced, by synthesis mode.");
    describe_histogram!("trend_analyze_ms", "End-to-end analysis time in milliseconds.");
}
