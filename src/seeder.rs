// =============================================================================
// Historical Seeder — fills the cache before any stream starts
// =============================================================================
//
// Per symbol, concurrently across all symbols:
//   1. fetch the last `limit` klines (bounded retry), normalize, annotate,
//      write `kline:<SYM>` in one shot;
//   2. optionally seed `trade:<SYM>` from the aggregated-trade history;
//   3. optionally seed `depth:<SYM>` with one order-book snapshot.
//
// Only transport errors are retried: up to `max_attempts` tries with a fixed
// delay in between.  A symbol whose klines cannot be fetched is logged and
// skipped; steps 2 and 3 never affect the outcome of step 1.
//
// Completion is signalled once, with a `SeedReport`, over a oneshot channel.
// =============================================================================

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cache::{Cache, WindowKind};
use crate::config::{PipelineConfig, TtlPolicy};
use crate::error::FeedError;
use crate::feed::MarketFeed;
use crate::indicators;
use crate::normalize::{candle_from_kline, depth_from_book, trade_from_agg};
use crate::types::{Candle, Trade};

#[derive(Debug, Clone)]
pub struct SeedSettings {
    pub interval: String,
    pub limit: u32,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// `Some(limit)` to seed the trade window.
    pub trade_history: Option<u32>,
    /// `Some(limit)` to seed the depth window.
    pub order_book: Option<u32>,
    pub ttl: TtlPolicy,
}

impl From<&PipelineConfig> for SeedSettings {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            interval: cfg.interval.clone(),
            limit: cfg.seed_limit,
            max_attempts: cfg.seed_max_attempts.max(1),
            retry_delay: cfg.seed_retry_delay(),
            trade_history: cfg.seed_trade_history.then_some(cfg.trade_history_limit),
            order_book: cfg.seed_order_book.then_some(cfg.order_book_limit),
            ttl: cfg.ttl.clone(),
        }
    }
}

/// What seeding achieved for one symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolSeed {
    pub symbol: String,
    pub candles: usize,
    pub trades: usize,
    pub book_seeded: bool,
    /// Kline fetch failed after every attempt.
    pub failed: bool,
}

/// Outcome of a full seeding pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedReport {
    pub symbols: Vec<SymbolSeed>,
    /// Request weight reported by the exchange once seeding finished.
    pub used_weight: Option<u32>,
}

impl SeedReport {
    pub fn seeded(&self) -> usize {
        self.symbols.iter().filter(|s| !s.failed).count()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.symbols
            .iter()
            .filter(|s| s.failed)
            .map(|s| s.symbol.as_str())
            .collect()
    }

    pub fn candles(&self) -> usize {
        self.symbols.iter().map(|s| s.candles).sum()
    }
}

/// Run `op` until it succeeds, fails with a non-transport error, or
/// `max_attempts` tries are used up.
async fn with_retry<T, F, Fut>(
    what: &str,
    symbol: &str,
    max_attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, FeedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(FeedError::Transport(msg)) if attempt < max_attempts => {
                warn!(
                    symbol = %symbol,
                    what,
                    attempt,
                    max_attempts,
                    error = %msg,
                    "seed fetch failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn log_dropped(symbol: &str, what: &str, err: impl Display) {
    warn!(symbol = %symbol, what, error = %err, "dropping seeded record");
}

#[derive(Clone)]
pub struct Seeder {
    feed: Arc<dyn MarketFeed>,
    cache: Cache,
    settings: SeedSettings,
}

impl Seeder {
    pub fn new(feed: Arc<dyn MarketFeed>, cache: Cache, settings: SeedSettings) -> Self {
        Self {
            feed,
            cache,
            settings,
        }
    }

    /// Seed every symbol concurrently and report once all have finished.
    pub async fn seed_all(&self, symbols: &[String]) -> SeedReport {
        let results = join_all(symbols.iter().map(|s| self.seed_symbol(s))).await;
        SeedReport {
            symbols: results,
            used_weight: self.feed.used_weight(),
        }
    }

    /// Seed in the background; the receiver resolves when seeding is done.
    pub fn spawn(self, symbols: Vec<String>) -> oneshot::Receiver<SeedReport> {
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let report = self.seed_all(&symbols).await;
            // The supervisor may have stopped waiting.
            let _ = done_tx.send(report);
        });
        done_rx
    }

    pub async fn seed_symbol(&self, symbol: &str) -> SymbolSeed {
        let mut seed = SymbolSeed {
            symbol: symbol.to_string(),
            ..SymbolSeed::default()
        };

        match self.seed_klines(symbol).await {
            Ok(count) => seed.candles = count,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "kline seeding failed, skipping symbol");
                seed.failed = true;
                return seed;
            }
        }

        if let Some(limit) = self.settings.trade_history {
            match self.seed_trades(symbol, limit).await {
                Ok(count) => seed.trades = count,
                Err(e) => warn!(symbol = %symbol, error = %e, "trade history seeding failed"),
            }
        }

        if let Some(limit) = self.settings.order_book {
            match self.seed_order_book(symbol, limit).await {
                Ok(()) => seed.book_seeded = true,
                Err(e) => warn!(symbol = %symbol, error = %e, "order book seeding failed"),
            }
        }

        debug!(
            symbol = %symbol,
            candles = seed.candles,
            trades = seed.trades,
            book = seed.book_seeded,
            "symbol seeded"
        );
        seed
    }

    async fn seed_klines(&self, symbol: &str) -> anyhow::Result<usize> {
        let s = &self.settings;
        let raw = with_retry("klines", symbol, s.max_attempts, s.retry_delay, || {
            self.feed.fetch_klines(symbol, &s.interval, s.limit)
        })
        .await?;

        let mut candles: Vec<Candle> = raw
            .iter()
            .filter_map(|k| {
                candle_from_kline(k)
                    .map_err(|e| log_dropped(symbol, "kline", e))
                    .ok()
            })
            .collect();
        indicators::annotate(&mut candles);

        self.cache
            .replace_window(WindowKind::Kline, symbol, &candles, s.ttl.seeded_kline())
            .await?;
        Ok(candles.len())
    }

    async fn seed_trades(&self, symbol: &str, limit: u32) -> anyhow::Result<usize> {
        let s = &self.settings;
        let raw = with_retry("agg_trades", symbol, s.max_attempts, s.retry_delay, || {
            self.feed.fetch_agg_trades(symbol, limit)
        })
        .await?;

        let trades: Vec<Trade> = raw
            .iter()
            .filter_map(|t| {
                trade_from_agg(t)
                    .map_err(|e| log_dropped(symbol, "trade", e))
                    .ok()
            })
            .collect();

        self.cache
            .replace_window(WindowKind::Trade, symbol, &trades, s.ttl.trade())
            .await?;
        Ok(trades.len())
    }

    async fn seed_order_book(&self, symbol: &str, limit: u32) -> anyhow::Result<()> {
        let s = &self.settings;
        let raw = with_retry("depth", symbol, s.max_attempts, s.retry_delay, || {
            self.feed.fetch_depth(symbol, limit)
        })
        .await?;

        let snapshot = depth_from_book(&raw)?;
        self.cache
            .append(WindowKind::Depth, symbol, snapshot, s.ttl.depth())
            .await?;
        Ok(())
    }
}

/// Log a finished report.
pub fn log_report(report: &SeedReport) {
    let failed = report.failed();
    info!(
        seeded = report.seeded(),
        failed = failed.len(),
        candles = report.candles(),
        used_weight = ?report.used_weight,
        "historical seeding complete"
    );
    if !failed.is_empty() {
        warn!(symbols = ?failed, "symbols without seeded klines");
    }
}
