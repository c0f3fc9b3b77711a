// =============================================================================
// Cache Adapter
// =============================================================================
//
// Typed, bounded, per-symbol windows on top of a key/value store.  Values are
// JSON; a window is a JSON array stored under `<prefix><SYMBOL>`.
//
// Window writes are read-modify-write and therefore not atomic across writers.
// The streaming engine runs exactly one writer per (symbol, window kind), which
// is what makes this safe.
// =============================================================================

pub mod store;
pub mod window;

#[cfg(test)]
pub use store::MemoryStore;
pub use store::{KeyValueStore, RedisStore};
pub use window::{push_capped, WindowKind};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheError;
use crate::indicators;
use crate::types::{Candle, SymbolWindow};

/// Shared cache handle.  Clones share the same underlying store.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn KeyValueStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let encoded = serde_json::to_string(value)?;
        self.store.set(key, encoded, ttl).await
    }

    /// `Ok(None)` when the key is missing or expired.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.delete(key).await
    }

    async fn load_window<T: DeserializeOwned>(&self, key: &str) -> Result<VecDeque<T>, CacheError> {
        Ok(self.get::<VecDeque<T>>(key).await?.unwrap_or_default())
    }

    /// Append `record` to the window at `prefix || symbol`, evicting the
    /// oldest records beyond `cap`, and write it back with `ttl`.
    pub async fn append_window<T: Serialize + DeserializeOwned>(
        &self,
        prefix: &str,
        symbol: &str,
        record: T,
        cap: usize,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = format!("{prefix}{symbol}");
        let mut window = self.load_window::<T>(&key).await?;
        push_capped(&mut window, record, cap);
        self.set(&key, &window, Some(ttl)).await
    }

    /// [`Cache::append_window`] with the prefix and cap of `kind`.
    pub async fn append<T: Serialize + DeserializeOwned>(
        &self,
        kind: WindowKind,
        symbol: &str,
        record: T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.append_window(kind.prefix(), symbol, record, kind.cap(), ttl)
            .await
    }

    /// Overwrite the whole window, keeping only the most recent `cap` records.
    pub async fn replace_window<T: Serialize>(
        &self,
        kind: WindowKind,
        symbol: &str,
        records: &[T],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let start = records.len().saturating_sub(kind.cap());
        self.set(&kind.key(symbol), &records[start..], Some(ttl))
            .await
    }

    /// Write a live candle.  An update to the bar already at the tail replaces
    /// it; a new bar is appended.  Open times stay strictly increasing.
    pub async fn upsert_candle(
        &self,
        symbol: &str,
        candle: Candle,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let kind = WindowKind::Kline;
        let key = kind.key(symbol);
        let mut window = self.load_window::<Candle>(&key).await?;

        match window.back_mut() {
            Some(last) if last.open_time == candle.open_time => *last = candle,
            Some(last) if last.open_time > candle.open_time => return Ok(()),
            _ => push_capped(&mut window, candle, kind.cap()),
        }
        self.set(&key, &window, Some(ttl)).await
    }

    pub async fn read_window<T: DeserializeOwned>(
        &self,
        kind: WindowKind,
        symbol: &str,
    ) -> Result<Vec<T>, CacheError> {
        Ok(self
            .get::<Vec<T>>(&kind.key(symbol))
            .await?
            .unwrap_or_default())
    }

    /// All three windows for `symbol`, candles annotated with SMA(10),
    /// SMA(30), RSI(14) and returns.
    pub async fn snapshot(&self, symbol: &str) -> Result<SymbolWindow, CacheError> {
        let mut candles: Vec<Candle> = self.read_window(WindowKind::Kline, symbol).await?;
        indicators::annotate(&mut candles);

        Ok(SymbolWindow {
            symbol: symbol.to_string(),
            candles,
            trades: self.read_window(WindowKind::Trade, symbol).await?,
            depth: self.read_window(WindowKind::Depth, symbol).await?,
        })
    }
}
