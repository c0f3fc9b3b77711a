// =============================================================================
// Kline worker — live candles with trade fusion
// =============================================================================
//
// An in-progress kline only reports the close as of its last update.  When a
// fresher trade price is waiting in the tick slot it replaces that close, so
// the cached bar tracks the market at trade latency rather than kline latency.
// Final klines are written untouched.
//
// The fusion never waits: an empty slot means the event's own close is used.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{debug, error, info, warn};

use super::rendezvous::TickReceiver;
use super::worker::{StatusReporter, StreamRole, StreamSession, WorkerState};
use crate::cache::Cache;
use crate::error::{FeedError, ParseError, PipelineError};
use crate::feed::{MarketFeed, RawKlineEvent};
use crate::normalize::candle_from_kline;
use crate::types::Candle;

/// Normalize `event` and, if the bar is still open, fuse in the latest trade
/// price.  `high`/`low` widen to keep the fused close inside the range.
pub fn build_live_candle(
    event: &RawKlineEvent,
    ticks: &mut TickReceiver,
) -> Result<Candle, ParseError> {
    let mut candle = candle_from_kline(&event.kline)?;

    if !candle.is_final {
        if let Some(tick) = ticks.try_take() {
            candle.close = tick.price;
            candle.high = candle.high.max(tick.price);
            candle.low = candle.low.min(tick.price);
        }
    }
    Ok(candle)
}

pub struct KlineWorker {
    symbol: String,
    interval: String,
    feed: Arc<dyn MarketFeed>,
    cache: Cache,
    ticks: TickReceiver,
    ttl: Duration,
}

impl KlineWorker {
    pub fn new(
        symbol: impl Into<String>,
        interval: impl Into<String>,
        feed: Arc<dyn MarketFeed>,
        cache: Cache,
        ticks: TickReceiver,
        ttl: Duration,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            feed,
            cache,
            ticks,
            ttl,
        }
    }

    pub async fn handle(&mut self, event: RawKlineEvent) {
        if event.symbol != self.symbol {
            debug!(
                symbol = %self.symbol,
                stream = "kline",
                other = %event.symbol,
                "ignoring foreign kline"
            );
            return;
        }

        let candle = match build_live_candle(&event, &mut self.ticks) {
            Ok(candle) => candle,
            Err(e) => {
                warn!(symbol = %self.symbol, stream = "kline", error = %e, "dropping kline");
                return;
            }
        };

        if let Err(e) = self.cache.upsert_candle(&self.symbol, candle, self.ttl).await {
            error!(symbol = %self.symbol, stream = "kline", error = %e, "cache write failed");
        }
    }
}

#[async_trait]
impl StreamSession for KlineWorker {
    fn role(&self) -> StreamRole {
        StreamRole::Kline
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    async fn run_session(&mut self, status: &StatusReporter) -> Result<(), PipelineError> {
        let mut events = self
            .feed
            .subscribe_klines(&self.symbol, &self.interval)
            .await?;
        status.set(WorkerState::Running);
        info!(
            symbol = %self.symbol,
            stream = "kline",
            interval = %self.interval,
            "kline stream connected"
        );

        while let Some(item) = events.next().await {
            match item {
                Ok(event) => self.handle(event).await,
                Err(FeedError::Decode(msg)) => {
                    warn!(
                        symbol = %self.symbol,
                        stream = "kline",
                        error = %msg,
                        "undecodable kline event"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, WindowKind};
    use crate::market_data::rendezvous::{tick_channel, TradeTick};
    use crate::testkit::{kline_event, raw_kline, FakeFeed, Session};

    const TTL: Duration = Duration::from_secs(86_400);

    fn in_progress(close: &str) -> RawKlineEvent {
        kline_event("BTCUSDT", raw_kline(0, "99", "100.5", "98", close, false))
    }

    #[test]
    fn pending_tick_overrides_in_progress_close() {
        let (tx, mut rx) = tick_channel();
        tx.publish(TradeTick { price: 101.5, trade_id: 9 });

        let candle = build_live_candle(&in_progress("100"), &mut rx).unwrap();
        assert_eq!(candle.close, 101.5);
        assert_eq!(candle.high, 101.5);
        assert_eq!(candle.low, 98.0);
        assert!(candle.low <= candle.close && candle.close <= candle.high);
    }

    #[test]
    fn empty_slot_keeps_event_close() {
        let (_tx, mut rx) = tick_channel();
        let candle = build_live_candle(&in_progress("100"), &mut rx).unwrap();
        assert_eq!(candle.close, 100.0);
    }

    #[test]
    fn tick_is_consumed_once() {
        let (tx, mut rx) = tick_channel();
        tx.publish(TradeTick { price: 101.5, trade_id: 1 });
        assert_eq!(build_live_candle(&in_progress("100"), &mut rx).unwrap().close, 101.5);
        assert_eq!(build_live_candle(&in_progress("100"), &mut rx).unwrap().close, 100.0);
    }

    #[test]
    fn final_kline_is_not_fused() {
        let (tx, mut rx) = tick_channel();
        tx.publish(TradeTick { price: 250.0, trade_id: 1 });
        let event = kline_event("BTCUSDT", raw_kline(0, "99", "100.5", "98", "100", true));
        let candle = build_live_candle(&event, &mut rx).unwrap();
        assert_eq!(candle.close, 100.0);
        assert_eq!(candle.high, 100.5);
        // The tick stays available for the next in-progress bar.
        assert_eq!(rx.try_take().map(|t| t.price), Some(250.0));
    }

    #[test]
    fn fused_price_below_low_widens_low() {
        let (tx, mut rx) = tick_channel();
        tx.publish(TradeTick { price: 97.0, trade_id: 1 });
        let candle = build_live_candle(&in_progress("99"), &mut rx).unwrap();
        assert_eq!((candle.low, candle.close), (97.0, 97.0));
    }

    #[tokio::test]
    async fn session_writes_fused_candles_as_one_bar_per_interval() {
        let feed = FakeFeed::new().script_klines(
            "BTCUSDT",
            Session::Close(vec![
                Ok(in_progress("100")),
                Ok(in_progress("100.2")),
                Err(FeedError::Decode("bad frame".into())),
                Ok(kline_event("BTCUSDT", raw_kline(0, "99", "100.5", "98", "100.4", true))),
                Ok(kline_event("BTCUSDT", raw_kline(1, "100.4", "100.4", "100.4", "100.4", false))),
                Ok(kline_event("ETHUSDT", raw_kline(2, "1", "1", "1", "1", false))),
            ]),
        );
        let cache = Cache::new(Arc::new(MemoryStore::new()));
        let (tx, rx) = tick_channel();
        tx.publish(TradeTick { price: 101.5, trade_id: 1 });

        let mut worker = KlineWorker::new("BTCUSDT", "1m", Arc::new(feed), cache.clone(), rx, TTL);
        let status = StatusReporter::new(StreamRole::Kline, "BTCUSDT");
        worker.run_session(&status).await.unwrap();

        let candles: Vec<Candle> = cache.read_window(WindowKind::Kline, "BTCUSDT").await.unwrap();
        assert_eq!(candles.len(), 2);
        assert!(candles[0].is_final);
        assert_eq!(candles[0].close, 100.4);
        assert!(!candles[1].is_final);
        assert!(candles[0].open_time < candles[1].open_time);
    }
}
