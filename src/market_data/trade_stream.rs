// =============================================================================
// Trade worker — aggregated trades to the tick slot and the trade window
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{error, info, warn};

use super::rendezvous::{TickSender, TradeTick};
use super::worker::{StatusReporter, StreamRole, StreamSession, WorkerState};
use crate::cache::{Cache, WindowKind};
use crate::error::{FeedError, PipelineError};
use crate::feed::{MarketFeed, RawAggTrade};
use crate::normalize::trade_from_agg;

pub struct TradeWorker {
    symbol: String,
    feed: Arc<dyn MarketFeed>,
    cache: Cache,
    ticks: TickSender,
    ttl: Duration,
}

impl TradeWorker {
    pub fn new(
        symbol: impl Into<String>,
        feed: Arc<dyn MarketFeed>,
        cache: Cache,
        ticks: TickSender,
        ttl: Duration,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            feed,
            cache,
            ticks,
            ttl,
        }
    }

    /// Publish the price for fusion first, then persist the trade.  A bad
    /// record or a cache failure drops this trade only.
    pub async fn handle(&self, raw: RawAggTrade) {
        let trade = match trade_from_agg(&raw) {
            Ok(trade) => trade,
            Err(e) => {
                warn!(symbol = %self.symbol, stream = "trade", error = %e, "dropping trade");
                return;
            }
        };

        self.ticks.publish(TradeTick {
            price: trade.price,
            trade_id: trade.id,
        });

        if let Err(e) = self
            .cache
            .append(WindowKind::Trade, &self.symbol, trade, self.ttl)
            .await
        {
            error!(symbol = %self.symbol, stream = "trade", error = %e, "cache write failed");
        }
    }
}

#[async_trait]
impl StreamSession for TradeWorker {
    fn role(&self) -> StreamRole {
        StreamRole::Trade
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    async fn run_session(&mut self, status: &StatusReporter) -> Result<(), PipelineError> {
        let mut events = self.feed.subscribe_trades(&self.symbol).await?;
        status.set(WorkerState::Running);
        info!(symbol = %self.symbol, stream = "trade", "trade stream connected");

        while let Some(item) = events.next().await {
            match item {
                Ok(raw) => self.handle(raw).await,
                Err(FeedError::Decode(msg)) => {
                    warn!(
                        symbol = %self.symbol,
                        stream = "trade",
                        error = %msg,
                        "undecodable trade event"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
