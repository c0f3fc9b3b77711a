// =============================================================================
// Supervisor — discovery, seeding barrier, worker fan-out, shutdown
// =============================================================================
//
// Startup sequence:
//   1. discover the exchange catalogue and keep the spot USDT pairs
//      (leveraged UP/DOWN tokens excluded), optionally narrowed by an
//      allow-list;
//   2. seed every symbol and wait for the seeding-complete signal;
//   3. spawn trade, kline and depth workers per symbol;
//   4. wait until every worker has stopped (they only stop on cancellation
//      or a fatal subscription error).
//
// Discovery failure, an empty symbol set, or cancellation before streaming
// starts is reported as an error so the process exits non-zero.
// =============================================================================

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cache::Cache;
use crate::config::PipelineConfig;
use crate::feed::MarketFeed;
use crate::market_data::{
    run_with_reconnect, tick_channel, BackoffPolicy, DepthWorker, KlineWorker, StatusReporter,
    StreamRole, StreamSession, TradeWorker, WorkerState,
};
use crate::seeder::{log_report, SeedSettings, Seeder};

/// Spot pairs quoted in USDT, without the leveraged-token variants.
pub fn filter_usdt_symbols<S: AsRef<str>>(catalogue: &[S]) -> Vec<String> {
    catalogue
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| s.ends_with("USDT") && !s.ends_with("UPUSDT") && !s.ends_with("DOWNUSDT"))
        .map(str::to_string)
        .collect()
}

/// Keep only symbols on the allow-list, preserving discovery order.
fn apply_allow_list(symbols: Vec<String>, allow: Option<&[String]>) -> Vec<String> {
    match allow {
        None => symbols,
        Some(allow) => {
            let allow: HashSet<&str> = allow.iter().map(String::as_str).collect();
            symbols.into_iter().filter(|s| allow.contains(s.as_str())).collect()
        }
    }
}

/// Final state of one worker, as reported when the supervisor joins it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerExit {
    pub symbol: String,
    pub role: StreamRole,
    pub state: WorkerState,
}

pub struct Supervisor {
    feed: Arc<dyn MarketFeed>,
    cache: Cache,
    config: PipelineConfig,
    allow_list: Option<Vec<String>>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(
        feed: Arc<dyn MarketFeed>,
        cache: Cache,
        config: PipelineConfig,
        allow_list: Option<Vec<String>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            feed,
            cache,
            config,
            allow_list,
            cancel,
        }
    }

    pub async fn discover(&self) -> Result<Vec<String>> {
        let catalogue = self
            .feed
            .discover_symbols()
            .await
            .context("symbol discovery failed")?;

        let usdt = filter_usdt_symbols(&catalogue);
        let symbols = apply_allow_list(usdt, self.allow_list.as_deref());
        if symbols.is_empty() {
            bail!(
                "no USDT symbols to ingest (catalogue had {} entries)",
                catalogue.len()
            );
        }

        info!(count = symbols.len(), catalogue = catalogue.len(), "symbols discovered");
        Ok(symbols)
    }

    /// Run the whole pipeline until cancelled.  Returns how each worker ended.
    pub async fn run(self) -> Result<Vec<WorkerExit>> {
        let symbols = self.discover().await?;

        // ── Seeding barrier ─────────────────────────────────────────────
        let seeder = Seeder::new(
            self.feed.clone(),
            self.cache.clone(),
            SeedSettings::from(&self.config),
        );
        let seeding = seeder.spawn(symbols.clone());
        let report = tokio::select! {
            _ = self.cancel.cancelled() => bail!("cancelled during historical seeding"),
            report = seeding => report.context("seeder exited without reporting")?,
        };
        log_report(&report);

        // ── Workers ─────────────────────────────────────────────────────
        let mut workers = self.spawn_workers(&symbols);
        info!(symbols = symbols.len(), workers = workers.len(), "streaming started");

        let mut exits = Vec::with_capacity(workers.len());
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(exit) => {
                    if exit.state == WorkerState::Fatal {
                        error!(
                            symbol = %exit.symbol,
                            stream = %exit.role,
                            "worker exited permanently"
                        );
                    }
                    exits.push(exit);
                }
                Err(e) => error!(error = %e, "worker task panicked"),
            }
        }

        let fatal = exits.iter().filter(|e| e.state == WorkerState::Fatal).count();
        info!(workers = exits.len(), fatal, "all workers stopped");
        Ok(exits)
    }

    fn spawn_workers(&self, symbols: &[String]) -> JoinSet<WorkerExit> {
        let policy = BackoffPolicy::new(self.config.backoff_cap_exponent);
        let ttl = &self.config.ttl;
        let mut set = JoinSet::new();

        for symbol in symbols {
            let (ticks_tx, ticks_rx) = tick_channel();

            let trade = TradeWorker::new(
                symbol.clone(),
                self.feed.clone(),
                self.cache.clone(),
                ticks_tx,
                ttl.trade(),
            );
            let kline = KlineWorker::new(
                symbol.clone(),
                self.config.interval.clone(),
                self.feed.clone(),
                self.cache.clone(),
                ticks_rx,
                ttl.live_kline(),
            );
            let depth = DepthWorker::new(
                symbol.clone(),
                self.feed.clone(),
                self.cache.clone(),
                ttl.depth(),
            );

            set.spawn(supervise(trade, policy, self.cancel.clone()));
            set.spawn(supervise(kline, policy, self.cancel.clone()));
            set.spawn(supervise(depth, policy, self.cancel.clone()));
        }
        set
    }
}

async fn supervise<S: StreamSession>(
    mut session: S,
    policy: BackoffPolicy,
    cancel: CancellationToken,
) -> WorkerExit {
    let status = StatusReporter::new(session.role(), session.symbol());
    let state = run_with_reconnect(&mut session, policy, &cancel, &status).await;
    WorkerExit {
        symbol: session.symbol().to_string(),
        role: session.role(),
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, WindowKind};
    use crate::error::FeedError;
    use crate::testkit::{flat_kline, kline_event, raw_kline, raw_trade, Channel, FakeFeed, Session};
    use crate::types::Candle;
    use std::time::Duration;

    #[test]
    fn usdt_filter_drops_leveraged_and_other_quotes() {
        let catalogue = ["BTCUSDT", "ETHBUSD", "BTCUPUSDT", "ETHDOWNUSDT", "LTCUSDT"];
        assert_eq!(filter_usdt_symbols(&catalogue), vec!["BTCUSDT", "LTCUSDT"]);
    }

    #[test]
    fn allow_list_narrows_in_discovery_order() {
        let symbols = vec!["BTCUSDT".to_string(), "ETHUSDT".to_string(), "LTCUSDT".to_string()];
        let allow = vec!["LTCUSDT".to_string(), "BTCUSDT".to_string(), "DOGEUSDT".to_string()];
        assert_eq!(
            apply_allow_list(symbols.clone(), Some(allow.as_slice())),
            vec!["BTCUSDT", "LTCUSDT"]
        );
        assert_eq!(apply_allow_list(symbols.clone(), None), symbols);
    }

    fn supervisor(
        feed: FakeFeed,
        allow: Option<Vec<String>>,
    ) -> (Supervisor, Cache, CancellationToken) {
        let cache = Cache::new(Arc::new(MemoryStore::new()));
        let cancel = CancellationToken::new();
        let sup = Supervisor::new(
            Arc::new(feed),
            cache.clone(),
            PipelineConfig::default(),
            allow,
            cancel.clone(),
        );
        (sup, cache, cancel)
    }

    #[tokio::test]
    async fn discovery_failure_is_a_startup_error() {
        let (sup, _, _) = supervisor(FakeFeed::new(), None);
        let err = sup.run().await.unwrap_err();
        assert!(err.to_string().contains("symbol discovery failed"));
    }

    #[tokio::test]
    async fn empty_symbol_set_is_a_startup_error() {
        let feed = FakeFeed::new().with_catalogue(&["ETHBUSD", "BTCUPUSDT"]);
        let (sup, _, _) = supervisor(feed, None);
        assert!(sup.run().await.is_err());

        let feed = FakeFeed::new().with_catalogue(&["BTCUSDT"]);
        let (sup, _, _) = supervisor(feed, Some(vec!["ETHUSDT".into()]));
        assert!(sup.run().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn seeds_then_streams_then_stops_on_cancel() {
        let seeded: Vec<_> = (0..5).map(|m| flat_kline(m, "100")).collect();
        let feed = Arc::new(
            FakeFeed::new()
                .with_catalogue(&["BTCUSDT", "ETHBUSD", "LTCUSDT"])
                .with_klines("BTCUSDT", seeded.clone())
                .with_klines("LTCUSDT", seeded)
                .script_trades("BTCUSDT", Session::Hold(vec![Ok(raw_trade(1, "101"))]))
                .script_klines(
                    "BTCUSDT",
                    Session::Hold(vec![Ok(kline_event(
                        "BTCUSDT",
                        raw_kline(5, "100", "100", "100", "100", false),
                    ))]),
                )
                .script_depth("LTCUSDT", Session::Refuse(FeedError::Subscribe("403".into()))),
        );
        let cache = Cache::new(Arc::new(MemoryStore::new()));
        let cancel = CancellationToken::new();
        let sup = Supervisor::new(
            feed.clone(),
            cache.clone(),
            PipelineConfig::default(),
            None,
            cancel.clone(),
        );

        let run = tokio::spawn(sup.run());
        tokio::time::sleep(Duration::from_secs(5)).await;

        // Workers only subscribe after seeding wrote both windows.
        assert_eq!(feed.subscribed_symbols(Channel::Trades), vec!["BTCUSDT", "LTCUSDT"]);
        assert_eq!(feed.subscribed_symbols(Channel::Depth), vec!["BTCUSDT", "LTCUSDT"]);
        let window: Vec<Candle> = cache.read_window(WindowKind::Kline, "BTCUSDT").await.unwrap();
        assert_eq!(window.len(), 6);
        assert_eq!(window[5].open_time.timestamp_millis(), 5 * 60_000);

        cancel.cancel();
        let exits = run.await.unwrap().unwrap();
        assert_eq!(exits.len(), 6);
        let fatal: Vec<_> = exits.iter().filter(|e| e.state == WorkerState::Fatal).collect();
        assert_eq!(fatal.len(), 1);
        assert_eq!((fatal[0].symbol.as_str(), fatal[0].role), ("LTCUSDT", StreamRole::Depth));
        assert!(exits
            .iter()
            .filter(|e| e.state != WorkerState::Fatal)
            .all(|e| e.state == WorkerState::Cancelled));
        // The rejected depth stream was tried once and never retried.
        assert_eq!(feed.subscribe_times(Channel::Depth, "LTCUSDT").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_seeding_is_an_error() {
        let feed = FakeFeed::new()
            .with_catalogue(&["BTCUSDT"])
            .with_kline_failures("BTCUSDT", 10);
        let (sup, _, cancel) = supervisor(feed, None);
        cancel.cancel();
        let err = sup.run().await.unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }
}
