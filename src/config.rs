// =============================================================================
// Pipeline Configuration
// =============================================================================
//
// Two sources:
//   - `PipelineConfig`: non-secret tunables, optionally loaded from
//     `pipeline_config.json`.  Every field carries `#[serde(default)]` so a
//     partial (or empty) file is always valid.
//   - `EnvSettings`: credentials and endpoints from the environment
//     (`API_KEY`, `SECRET_KEY`, `CACHE_ADDR`, `CACHE_PASS`, `FEED_SYMBOLS`).
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_interval() -> String {
    "1m".to_string()
}

fn default_seed_limit() -> u32 {
    100
}

fn default_seed_max_attempts() -> u32 {
    3
}

fn default_seed_retry_delay_ms() -> u64 {
    1_000
}

fn default_trade_history_limit() -> u32 {
    1_000
}

fn default_order_book_limit() -> u32 {
    100
}

fn default_backoff_cap_exponent() -> u32 {
    6
}

fn default_rest_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_ws_url() -> String {
    "wss://stream.binance.com:9443/ws".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_live_kline_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_short_ttl_secs() -> u64 {
    5 * 60
}

// =============================================================================
// TtlPolicy
// =============================================================================

/// Expiry applied to each cache window on write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TtlPolicy {
    /// Kline window written by the live stream.
    #[serde(default = "default_live_kline_ttl_secs")]
    pub live_kline_secs: u64,
    /// Kline window written by the historical seeder.
    #[serde(default = "default_short_ttl_secs")]
    pub seeded_kline_secs: u64,
    #[serde(default = "default_short_ttl_secs")]
    pub trade_secs: u64,
    #[serde(default = "default_short_ttl_secs")]
    pub depth_secs: u64,
}

impl TtlPolicy {
    pub fn live_kline(&self) -> Duration {
        Duration::from_secs(self.live_kline_secs)
    }

    pub fn seeded_kline(&self) -> Duration {
        Duration::from_secs(self.seeded_kline_secs)
    }

    pub fn trade(&self) -> Duration {
        Duration::from_secs(self.trade_secs)
    }

    pub fn depth(&self) -> Duration {
        Duration::from_secs(self.depth_secs)
    }

    /// Every window needs a positive expiry; the store rejects `PX 0`.
    pub fn validate(&self) -> Result<()> {
        let ttls = [
            ("live_kline_secs", self.live_kline_secs),
            ("seeded_kline_secs", self.seeded_kline_secs),
            ("trade_secs", self.trade_secs),
            ("depth_secs", self.depth_secs),
        ];
        for (name, secs) in ttls {
            if secs == 0 {
                bail!("ttl.{name} must be greater than zero");
            }
        }
        Ok(())
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            live_kline_secs: default_live_kline_ttl_secs(),
            seeded_kline_secs: default_short_ttl_secs(),
            trade_secs: default_short_ttl_secs(),
            depth_secs: default_short_ttl_secs(),
        }
    }
}

// =============================================================================
// PipelineConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Candlestick interval for both seeding and the live kline stream.
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Historical candles fetched per symbol at startup.
    #[serde(default = "default_seed_limit")]
    pub seed_limit: u32,

    #[serde(default = "default_seed_max_attempts")]
    pub seed_max_attempts: u32,

    /// Fixed delay between seeding attempts.
    #[serde(default = "default_seed_retry_delay_ms")]
    pub seed_retry_delay_ms: u64,

    /// Also seed `trade:<symbol>` from the aggregated-trade history.
    #[serde(default = "default_true")]
    pub seed_trade_history: bool,

    #[serde(default = "default_trade_history_limit")]
    pub trade_history_limit: u32,

    /// Also seed `depth:<symbol>` from an order-book snapshot.
    #[serde(default = "default_true")]
    pub seed_order_book: bool,

    #[serde(default = "default_order_book_limit")]
    pub order_book_limit: u32,

    /// Reconnect backoff is `2^min(attempt, cap)` seconds.
    #[serde(default = "default_backoff_cap_exponent")]
    pub backoff_cap_exponent: u32,

    #[serde(default)]
    pub ttl: TtlPolicy,

    #[serde(default = "default_rest_url")]
    pub rest_url: String,

    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            seed_limit: default_seed_limit(),
            seed_max_attempts: default_seed_max_attempts(),
            seed_retry_delay_ms: default_seed_retry_delay_ms(),
            seed_trade_history: true,
            trade_history_limit: default_trade_history_limit(),
            seed_order_book: true,
            order_book_limit: default_order_book_limit(),
            backoff_cap_exponent: default_backoff_cap_exponent(),
            ttl: TtlPolicy::default(),
            rest_url: default_rest_url(),
            ws_url: default_ws_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse pipeline config from {}", path.display()))?;
        config
            .ttl
            .validate()
            .with_context(|| format!("invalid pipeline config in {}", path.display()))?;

        info!(
            path = %path.display(),
            interval = %config.interval,
            seed_limit = config.seed_limit,
            "pipeline config loaded"
        );

        Ok(config)
    }

    pub fn seed_retry_delay(&self) -> Duration {
        Duration::from_millis(self.seed_retry_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

// =============================================================================
// EnvSettings
// =============================================================================

const DEFAULT_CACHE_ADDR: &str = "127.0.0.1:6379";

#[derive(Clone, Default)]
pub struct EnvSettings {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    /// `host:port` of the cache server.
    pub cache_addr: String,
    pub cache_pass: Option<String>,
    /// Optional allow-list intersected with discovered symbols.
    pub symbols: Option<Vec<String>>,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup.  Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let symbols = get("FEED_SYMBOLS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty());

        Self {
            api_key: get("API_KEY"),
            secret_key: get("SECRET_KEY"),
            cache_addr: get("CACHE_ADDR").unwrap_or_else(|| DEFAULT_CACHE_ADDR.to_string()),
            cache_pass: get("CACHE_PASS"),
            symbols,
        }
    }
}

impl std::fmt::Debug for EnvSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| if v.is_some() { "<redacted>" } else { "<unset>" };
        f.debug_struct("EnvSettings")
            .field("api_key", &redact(&self.api_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("cache_addr", &self.cache_addr)
            .field("cache_pass", &redact(&self.cache_pass))
            .field("symbols", &self.symbols)
            .finish()
    }
}
