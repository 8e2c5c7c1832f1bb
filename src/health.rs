// src/health.rs
//! Per-source health as carried through to the report.
//!
//! Not a stateful service: each adapter stamps its own status/message on its
//! result and this module only gathers them, logs one line per source and
//! bumps the status counters.

use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::sources::{SourceKind, SourceResult, SourceStatus};

/// Label appended to the display name of a source that contributed simulated data.
pub const SIMULATED_SUFFIX: &str = " (simulated)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthEntry {
    pub source: SourceKind,
    pub status: SourceStatus,
    pub message: Option<String>,
}

impl HealthEntry {
    pub fn of<T>(source: SourceKind, result: &SourceResult<T>) -> Self {
        Self {
            source,
            status: result.status,
            message: result.message.clone(),
        }
    }

    /// e.g. `News: real (Real news data retrieved (42 articles))`
    pub fn log_line(&self) -> String {
        match &self.message {
            Some(m) => format!("{}: {} ({})", self.source.display_name(), self.status, m),
            None => format!("{}: {}", self.source.display_name(), self.status),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceHealthTracker {
    entries: Vec<HealthEntry>,
}

impl SourceHealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<T>(&mut self, source: SourceKind, result: &SourceResult<T>) {
        let entry = HealthEntry::of(source, result);
        match entry.status {
            SourceStatus::Error => tracing::warn!(
                target: "trends::health",
                source = source.key(),
                status = %entry.status,
                message = entry.message.as_deref().unwrap_or(""),
                "source degraded"
            ),
            _ => tracing::info!(
                target: "trends::health",
                source = source.key(),
                status = %entry.status,
                message = entry.message.as_deref().unwrap_or(""),
                "source status"
            ),
        }
        counter!(
            "trend_source_status_total",
            "source" => source.key(),
            "status" => entry.status.as_str()
        )
        .increment(1);
        self.entries.push(entry);
    }

    /// Display names of every source that is not in `Error`, in recording order.
    /// Mock sources carry a "(simulated)" suffix.
    pub fn contributing_sources(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|e| match e.status {
                SourceStatus::Real => Some(e.source.display_name().to_string()),
                SourceStatus::Mock => Some(format!("{}{SIMULATED_SUFFIX}", e.source.display_name())),
                SourceStatus::Error => None,
            })
            .collect()
    }

    pub fn degraded_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status != SourceStatus::Real)
            .count()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.entries.iter().map(HealthEntry::log_line).collect()
    }
}
