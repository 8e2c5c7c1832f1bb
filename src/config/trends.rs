// src/config/trends.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const DEFAULT_TRENDS_CONFIG_PATH: &str = "config/trends.toml";
pub const ENV_TRENDS_CONFIG_PATH: &str = "TRENDS_CONFIG_PATH";

pub const ENV_SERPAPI_KEY: &str = "SERPAPI_API_KEY";
pub const ENV_SEARCHAPI_KEY: &str = "SEARCHAPI_API_KEY";
pub const ENV_REDDIT_TOKEN: &str = "REDDIT_ACCESS_TOKEN";
pub const ENV_NEWS_KEY: &str = "NEWS_API_KEY";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";

/// Real providers in the web-trends chain ahead of the synthetic step.
pub const WEB_TRENDS_STRATEGIES: u64 = 2;

fn default_adapter_timeout_ms() -> u64 {
    15_000
}
fn default_strategy_timeout_ms() -> u64 {
    6_000
}
fn default_llm_timeout_ms() -> u64 {
    15_000
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Base URLs for every provider; overridable so tests can point at local servers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub serpapi: String,
    pub searchapi: String,
    pub reddit: String,
    pub news: String,
    pub openai: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            serpapi: "https://serpapi.com/search.json".to_string(),
            searchapi: "https://www.searchapi.io/api/v1/search".to_string(),
            reddit: "https://oauth.reddit.com/search".to_string(),
            news: "https://newsapi.org/v2/everything".to_string(),
            openai: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }
}

/// Provider credentials. In TOML each value is either a literal or `"ENV"`;
/// `"ENV"` (and any key missing from the file) is read from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiKeys {
    pub serpapi: Option<String>,
    pub searchapi: Option<String>,
    pub reddit: Option<String>,
    pub news: Option<String>,
    pub openai: Option<String>,
}

impl ApiKeys {
    /// Read every key from its environment variable.
    pub fn from_env() -> Self {
        Self {
            serpapi: env_key(ENV_SERPAPI_KEY),
            searchapi: env_key(ENV_SEARCHAPI_KEY),
            reddit: env_key(ENV_REDDIT_TOKEN),
            news: env_key(ENV_NEWS_KEY),
            openai: env_key(ENV_OPENAI_KEY),
        }
    }

    fn resolve(self) -> Self {
        Self {
            serpapi: resolve_key(self.serpapi, ENV_SERPAPI_KEY),
            searchapi: resolve_key(self.searchapi, ENV_SEARCHAPI_KEY),
            reddit: resolve_key(self.reddit, ENV_REDDIT_TOKEN),
            news: resolve_key(self.news, ENV_NEWS_KEY),
            openai: resolve_key(self.openai, ENV_OPENAI_KEY),
        }
    }
}

fn env_key(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_key(raw: Option<String>, env_name: &str) -> Option<String> {
    match raw {
        None => env_key(env_name),
        Some(v) if v.trim().eq_ignore_ascii_case("env") => env_key(env_name),
        Some(v) => {
            let t = v.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
    }
}

/// Engine configuration: timeouts, synthetic seed, model, endpoints, keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendsConfig {
    /// Upper bound for a single source adapter (including its fallback chain).
    #[serde(default = "default_adapter_timeout_ms")]
    pub adapter_timeout_ms: u64,
    /// Per-strategy bound inside the web-trends fallback chain.
    #[serde(default = "default_strategy_timeout_ms")]
    pub strategy_timeout_ms: u64,
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,
    /// Mixed into the per-topic seed of the synthetic generator.
    #[serde(default)]
    pub synthetic_seed: u64,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub keys: ApiKeys,
}

impl Default for TrendsConfig {
    /// Defaults with no credentials at all (every source degrades).
    fn default() -> Self {
        Self {
            adapter_timeout_ms: default_adapter_timeout_ms(),
            strategy_timeout_ms: default_strategy_timeout_ms(),
            llm_timeout_ms: default_llm_timeout_ms(),
            synthetic_seed: 0,
            openai_model: default_openai_model(),
            endpoints: Endpoints::default(),
            keys: ApiKeys::default(),
        }
    }
}

impl TrendsConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading trends config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: TrendsConfig = toml::from_str(s).context("parsing trends config")?;
        cfg.keys = cfg.keys.resolve();
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $TRENDS_CONFIG_PATH (must exist)
    /// 2) config/trends.toml
    /// 3) built-in defaults with keys from the environment
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_TRENDS_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!("TRENDS_CONFIG_PATH points to non-existent path");
            }
            return Self::load_from_file(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_TRENDS_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        let mut cfg = Self {
            keys: ApiKeys::from_env(),
            ..Self::default()
        };
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn sanitize(&mut self) {
        if self.adapter_timeout_ms == 0 {
            self.adapter_timeout_ms = default_adapter_timeout_ms();
        }
        if self.strategy_timeout_ms == 0 {
            self.strategy_timeout_ms = default_strategy_timeout_ms();
        }
        if self.llm_timeout_ms == 0 {
            self.llm_timeout_ms = default_llm_timeout_ms();
        }
        if self.openai_model.trim().is_empty() {
            self.openai_model = default_openai_model();
        }
        // The whole web-trends chain must finish inside the adapter bound,
        // leaving a tenth of it for the synthetic step.
        let chain_budget = self.adapter_timeout_ms * 9 / 10;
        let max_strategy = (chain_budget / WEB_TRENDS_STRATEGIES).max(1);
        if self.strategy_timeout_ms > max_strategy {
            tracing::warn!(
                strategy_timeout_ms = self.strategy_timeout_ms,
                adapter_timeout_ms = self.adapter_timeout_ms,
                clamped_to = max_strategy,
                "strategy timeout too long for adapter timeout; clamping"
            );
            self.strategy_timeout_ms = max_strategy;
        }
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.llm_timeout_ms)
    }
}
