// =============================================================================
// Test fixtures and a scripted in-memory exchange
// =============================================================================

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::FeedError;
use crate::feed::{EventStream, MarketFeed, RawAggTrade, RawDepth, RawKline, RawKlineEvent};
use crate::types::Candle;

const MINUTE_MS: i64 = 60_000;

/// A one-minute candle opening at `minute` minutes past the epoch.
pub fn candle_at(minute: i64, close: f64) -> Candle {
    let open_ms = minute * MINUTE_MS;
    Candle {
        open_time: Utc.timestamp_millis_opt(open_ms).unwrap(),
        close_time: Utc.timestamp_millis_opt(open_ms + MINUTE_MS - 1).unwrap(),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
        quote_asset_volume: close,
        taker_buy_base: 0.5,
        taker_buy_quote: close / 2.0,
        is_final: true,
        sma10: None,
        sma30: None,
        rsi14: None,
        returns: None,
    }
}

/// A candle with explicit OHLC; times are irrelevant to the indicator tests.
pub fn ohlc(open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        open,
        high,
        low,
        ..candle_at(0, close)
    }
}

pub fn raw_kline(
    minute: i64,
    open: &str,
    high: &str,
    low: &str,
    close: &str,
    closed: bool,
) -> RawKline {
    let open_ms = minute * MINUTE_MS;
    RawKline {
        open_time: open_ms,
        close_time: open_ms + MINUTE_MS - 1,
        open: open.to_string(),
        high: high.to_string(),
        low: low.to_string(),
        close: close.to_string(),
        volume: "10".to_string(),
        quote_asset_volume: "1000".to_string(),
        taker_buy_base: "4".to_string(),
        taker_buy_quote: "400".to_string(),
        is_final: closed,
    }
}

/// A flat kline whose every price is `price`.
pub fn flat_kline(minute: i64, price: &str) -> RawKline {
    raw_kline(minute, price, price, price, price, true)
}

pub fn kline_event(symbol: &str, kline: RawKline) -> RawKlineEvent {
    RawKlineEvent {
        symbol: symbol.to_string(),
        kline,
    }
}

pub fn raw_trade(id: u64, price: &str) -> RawAggTrade {
    RawAggTrade {
        id,
        price: price.to_string(),
        quantity: "1".to_string(),
        time: 1_700_000_000_000 + id as i64,
        buyer_is_maker: id % 2 == 0,
        is_best_match: true,
    }
}

pub fn raw_depth(update_id: u64, bid: &str, ask: &str) -> RawDepth {
    RawDepth {
        last_update_id: update_id,
        bids: vec![(bid.to_string(), "1".to_string())],
        asks: vec![(ask.to_string(), "2".to_string())],
    }
}

// =============================================================================
// FakeFeed
// =============================================================================

/// One scripted connection attempt.
pub enum Session<T> {
    /// The subscribe call itself fails.
    Refuse(FeedError),
    /// Deliver the items, then the upstream closes the stream.
    Close(Vec<Result<T, FeedError>>),
    /// Deliver the items, then stay silent forever.
    Hold(Vec<Result<T, FeedError>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Trades,
    Klines,
    Depth,
}

#[derive(Default)]
struct FakeState {
    catalogue: Option<Vec<String>>,
    klines: HashMap<String, Vec<RawKline>>,
    kline_failures: HashMap<String, u32>,
    fetch_calls: HashMap<String, u32>,
    agg_trades: HashMap<String, Vec<RawAggTrade>>,
    depth: HashMap<String, RawDepth>,
    trade_sessions: HashMap<String, VecDeque<Session<RawAggTrade>>>,
    kline_sessions: HashMap<String, VecDeque<Session<RawKlineEvent>>>,
    depth_sessions: HashMap<String, VecDeque<Session<RawDepth>>>,
    subscribes: Vec<(Channel, String, Instant)>,
    used_weight: Option<u32>,
}

/// Deterministic exchange double.  Unscripted subscriptions hang silently,
/// unscripted REST fetches answer with empty data.
#[derive(Default)]
pub struct FakeFeed {
    state: Mutex<FakeState>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalogue(self, symbols: &[&str]) -> Self {
        self.state.lock().catalogue = Some(symbols.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_used_weight(self, weight: u32) -> Self {
        self.state.lock().used_weight = Some(weight);
        self
    }

    pub fn with_klines(self, symbol: &str, klines: Vec<RawKline>) -> Self {
        self.state.lock().klines.insert(symbol.to_string(), klines);
        self
    }

    /// The next `count` kline fetches for `symbol` fail with a transport error.
    pub fn with_kline_failures(self, symbol: &str, count: u32) -> Self {
        self.state.lock().kline_failures.insert(symbol.to_string(), count);
        self
    }

    pub fn with_agg_trades(self, symbol: &str, trades: Vec<RawAggTrade>) -> Self {
        self.state.lock().agg_trades.insert(symbol.to_string(), trades);
        self
    }

    pub fn with_depth(self, symbol: &str, depth: RawDepth) -> Self {
        self.state.lock().depth.insert(symbol.to_string(), depth);
        self
    }

    pub fn script_trades(self, symbol: &str, session: Session<RawAggTrade>) -> Self {
        self.state
            .lock()
            .trade_sessions
            .entry(symbol.to_string())
            .or_default()
            .push_back(session);
        self
    }

    pub fn script_klines(self, symbol: &str, session: Session<RawKlineEvent>) -> Self {
        self.state
            .lock()
            .kline_sessions
            .entry(symbol.to_string())
            .or_default()
            .push_back(session);
        self
    }

    pub fn script_depth(self, symbol: &str, session: Session<RawDepth>) -> Self {
        self.state
            .lock()
            .depth_sessions
            .entry(symbol.to_string())
            .or_default()
            .push_back(session);
        self
    }

    /// Number of kline fetches issued for `symbol`.
    pub fn fetch_calls(&self, symbol: &str) -> u32 {
        self.state.lock().fetch_calls.get(symbol).copied().unwrap_or(0)
    }

    /// Instants at which `channel` was subscribed for `symbol`.
    pub fn subscribe_times(&self, channel: Channel, symbol: &str) -> Vec<Instant> {
        self.state
            .lock()
            .subscribes
            .iter()
            .filter(|(c, s, _)| *c == channel && s == symbol)
            .map(|(_, _, at)| *at)
            .collect()
    }

    pub fn subscribed_symbols(&self, channel: Channel) -> Vec<String> {
        let mut out: Vec<String> = self
            .state
            .lock()
            .subscribes
            .iter()
            .filter(|(c, _, _)| *c == channel)
            .map(|(_, s, _)| s.clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

fn open_session<T: Send + 'static>(
    queue: Option<&mut VecDeque<Session<T>>>,
) -> Result<EventStream<T>, FeedError> {
    match queue.and_then(|q| q.pop_front()) {
        None => Ok(stream::pending().boxed()),
        Some(Session::Refuse(err)) => Err(err),
        Some(Session::Close(items)) => Ok(stream::iter(items).boxed()),
        Some(Session::Hold(items)) => Ok(stream::iter(items).chain(stream::pending()).boxed()),
    }
}

#[async_trait]
impl MarketFeed for FakeFeed {
    async fn discover_symbols(&self) -> Result<Vec<String>, FeedError> {
        self.state
            .lock()
            .catalogue
            .clone()
            .ok_or_else(|| FeedError::Transport("exchange info unavailable".into()))
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        _interval: &str,
        limit: u32,
    ) -> Result<Vec<RawKline>, FeedError> {
        let mut state = self.state.lock();
        *state.fetch_calls.entry(symbol.to_string()).or_default() += 1;
        if let Some(left) = state.kline_failures.get_mut(symbol) {
            if *left > 0 {
                *left -= 1;
                return Err(FeedError::Transport("503 service unavailable".into()));
            }
        }
        let all = state.klines.get(symbol).cloned().unwrap_or_default();
        let skip = all.len().saturating_sub(limit as usize);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn fetch_agg_trades(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<RawAggTrade>, FeedError> {
        let all = self
            .state
            .lock()
            .agg_trades
            .get(symbol)
            .cloned()
            .unwrap_or_default();
        let skip = all.len().saturating_sub(limit as usize);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn fetch_depth(&self, symbol: &str, _limit: u32) -> Result<RawDepth, FeedError> {
        Ok(self.state.lock().depth.get(symbol).cloned().unwrap_or_default())
    }

    async fn subscribe_trades(&self, symbol: &str) -> Result<EventStream<RawAggTrade>, FeedError> {
        let mut state = self.state.lock();
        state
            .subscribes
            .push((Channel::Trades, symbol.to_string(), Instant::now()));
        open_session(state.trade_sessions.get_mut(symbol))
    }

    async fn subscribe_klines(
        &self,
        symbol: &str,
        _interval: &str,
    ) -> Result<EventStream<RawKlineEvent>, FeedError> {
        let mut state = self.state.lock();
        state
            .subscribes
            .push((Channel::Klines, symbol.to_string(), Instant::now()));
        open_session(state.kline_sessions.get_mut(symbol))
    }

    async fn subscribe_depth(&self, symbol: &str) -> Result<EventStream<RawDepth>, FeedError> {
        let mut state = self.state.lock();
        state
            .subscribes
            .push((Channel::Depth, symbol.to_string(), Instant::now()));
        open_session(state.depth_sessions.get_mut(symbol))
    }

    fn used_weight(&self) -> Option<u32> {
        self.state.lock().used_weight
    }
}
