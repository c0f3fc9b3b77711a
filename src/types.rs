// =============================================================================
// Canonical market records shared across the pipeline
// =============================================================================
//
// Records are produced once by the normalization layer, handed to the cache,
// and never mutated afterwards.  All of them serialize to JSON so the cache
// windows stay self-describing.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed or in-progress bar at a fixed interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Base-asset volume.
    pub volume: f64,
    pub quote_asset_volume: f64,
    pub taker_buy_base: f64,
    pub taker_buy_quote: f64,
    /// `false` while the bar is still being traded.
    #[serde(default = "default_final")]
    pub is_final: bool,

    // Derived fields, filled in by `indicators::annotate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma10: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma30: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi14: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<f64>,
}

fn default_final() -> bool {
    true
}

/// One aggregated trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub price: f64,
    pub quantity: f64,
    pub buyer_is_maker: bool,
    pub time: DateTime<Utc>,
    pub is_best_match: bool,
}

/// A single price level.  Zero quantity means the level was removed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookEntry {
    pub price: f64,
    pub quantity: f64,
}

/// Point-in-time view of the book: bids best-first (descending), asks
/// best-first (ascending).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DepthSnapshot {
    #[serde(default)]
    pub last_update_id: u64,
    pub bids: Vec<OrderBookEntry>,
    pub asks: Vec<OrderBookEntry>,
}

impl DepthSnapshot {
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|e| e.price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|e| e.price)
    }
}

/// Everything cached for one symbol, as read back by consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolWindow {
    pub symbol: String,
    pub candles: Vec<Candle>,
    pub trades: Vec<Trade>,
    pub depth: Vec<DepthSnapshot>,
}

impl SymbolWindow {
    pub fn latest_depth(&self) -> Option<&DepthSnapshot> {
        self.depth.last()
    }
}
