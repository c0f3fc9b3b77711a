// =============================================================================
// Binance spot market feed
// =============================================================================

pub mod client;
pub mod rate_limit;
pub mod stream;

pub use client::BinanceClient;

use async_trait::async_trait;

use crate::error::FeedError;
use crate::feed::{EventStream, MarketFeed, RawAggTrade, RawDepth, RawKline, RawKlineEvent};

#[async_trait]
impl MarketFeed for BinanceClient {
    async fn discover_symbols(&self) -> Result<Vec<String>, FeedError> {
        self.get_symbols().await
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<RawKline>, FeedError> {
        self.get_klines(symbol, interval, limit).await
    }

    async fn fetch_agg_trades(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<RawAggTrade>, FeedError> {
        self.get_agg_trades(symbol, limit).await
    }

    async fn fetch_depth(&self, symbol: &str, limit: u32) -> Result<RawDepth, FeedError> {
        self.get_depth(symbol, limit).await
    }

    async fn subscribe_trades(&self, symbol: &str) -> Result<EventStream<RawAggTrade>, FeedError> {
        let url = stream::stream_url(&self.ws_url, symbol, &stream::agg_trade_channel());
        stream::subscribe(&url).await
    }

    async fn subscribe_klines(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<EventStream<RawKlineEvent>, FeedError> {
        let url = stream::stream_url(&self.ws_url, symbol, &stream::kline_channel(interval));
        stream::subscribe(&url).await
    }

    async fn subscribe_depth(&self, symbol: &str) -> Result<EventStream<RawDepth>, FeedError> {
        let url = stream::stream_url(&self.ws_url, symbol, &stream::depth_channel());
        stream::subscribe(&url).await
    }

    fn used_weight(&self) -> Option<u32> {
        Some(self.weight().used_weight())
    }
}
