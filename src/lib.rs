// =============================================================================
// USDT Feed — library surface
// =============================================================================
//
// Ingestion pipeline (discovery, seeding, live streams) plus the read side:
// typed per-symbol snapshots from the cache and the indicator functions that
// run over them.  The `usdt-feed` binary is a thin bootstrap over this crate.
// =============================================================================

pub mod binance;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod indicators;
pub mod market_data;
pub mod normalize;
pub mod seeder;
pub mod supervisor;
#[cfg(test)]
mod testkit;
pub mod types;

pub use cache::{Cache, KeyValueStore, RedisStore, WindowKind};
pub use error::{CacheError, FeedError, ParseError, PipelineError};
pub use types::{Candle, DepthSnapshot, OrderBookEntry, SymbolWindow, Trade};
