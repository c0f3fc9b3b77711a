// =============================================================================
// Upstream Market Feed — capability set consumed by the pipeline
// =============================================================================
//
// The pipeline only ever talks to the exchange through `MarketFeed`: symbol
// discovery, three REST fetches and three websocket subscriptions.  The live
// implementation lives in `crate::binance`; tests substitute a deterministic
// fake.
//
// A subscription is a stream of `Result<T, FeedError>`:
//   Ok(event)               => one upstream event, in source order
//   Err(FeedError::Decode)  => one bad message, the stream stays usable
//   Err(other)              => the connection is gone
//   None                    => the upstream closed the stream
// =============================================================================

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Deserialize;

use crate::error::FeedError;

/// Boxed event stream returned by the subscription operations.
pub type EventStream<T> = BoxStream<'static, Result<T, FeedError>>;

/// A kline exactly as the exchange reports it (decimal strings, ms epochs).
///
/// Field names follow the websocket `k` object; the REST array form is
/// mapped onto the same struct by the client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawKline {
    #[serde(rename = "t")]
    pub open_time: i64,
    #[serde(rename = "T")]
    pub close_time: i64,
    #[serde(rename = "o")]
    pub open: String,
    #[serde(rename = "h")]
    pub high: String,
    #[serde(rename = "l")]
    pub low: String,
    #[serde(rename = "c")]
    pub close: String,
    #[serde(rename = "v")]
    pub volume: String,
    #[serde(rename = "q")]
    pub quote_asset_volume: String,
    #[serde(rename = "V")]
    pub taker_buy_base: String,
    #[serde(rename = "Q")]
    pub taker_buy_quote: String,
    #[serde(rename = "x", default = "closed_by_default")]
    pub is_final: bool,
}

fn closed_by_default() -> bool {
    true
}

/// Websocket kline event: the symbol plus the bar being built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawKlineEvent {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "k")]
    pub kline: RawKline,
}

/// Aggregated trade, identical in the REST and websocket payloads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawAggTrade {
    #[serde(rename = "a")]
    pub id: u64,
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "q")]
    pub quantity: String,
    #[serde(rename = "T")]
    pub time: i64,
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
    #[serde(rename = "M", default)]
    pub is_best_match: bool,
}

/// Order-book levels as `[price, quantity]` string pairs.
///
/// Accepts both the partial-book shape (`lastUpdateId`, `bids`, `asks`) and
/// the diff-event shape (`u`, `b`, `a`).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RawDepth {
    #[serde(rename = "lastUpdateId", alias = "u", default)]
    pub last_update_id: u64,
    #[serde(alias = "b", default)]
    pub bids: Vec<(String, String)>,
    #[serde(alias = "a", default)]
    pub asks: Vec<(String, String)>,
}

/// Everything the pipeline needs from an exchange.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Every symbol the exchange lists, unfiltered.
    async fn discover_symbols(&self) -> Result<Vec<String>, FeedError>;

    /// The most recent `limit` klines at `interval`, oldest first.
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<RawKline>, FeedError>;

    /// The most recent `limit` aggregated trades, oldest first.
    async fn fetch_agg_trades(&self, symbol: &str, limit: u32)
        -> Result<Vec<RawAggTrade>, FeedError>;

    /// A `limit`-level order-book snapshot.
    async fn fetch_depth(&self, symbol: &str, limit: u32) -> Result<RawDepth, FeedError>;

    async fn subscribe_trades(&self, symbol: &str) -> Result<EventStream<RawAggTrade>, FeedError>;

    async fn subscribe_klines(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<EventStream<RawKlineEvent>, FeedError>;

    async fn subscribe_depth(&self, symbol: &str) -> Result<EventStream<RawDepth>, FeedError>;

    /// Request weight the exchange last reported, for feeds that report one.
    fn used_weight(&self) -> Option<u32> {
        None
    }
}
