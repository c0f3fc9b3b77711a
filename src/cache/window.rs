// =============================================================================
// Per-symbol record windows
// =============================================================================
//
// Each symbol owns three append-only windows in the cache.  A window grows to
// its cap, then slides: every further push evicts the oldest record.
// =============================================================================

use std::collections::VecDeque;
use std::fmt;

pub const KLINE_CAP: usize = 10_000;
pub const TRADE_CAP: usize = 100_000;
pub const DEPTH_CAP: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    Kline,
    Trade,
    Depth,
}

impl WindowKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Kline => "kline:",
            Self::Trade => "trade:",
            Self::Depth => "depth:",
        }
    }

    pub fn cap(&self) -> usize {
        match self {
            Self::Kline => KLINE_CAP,
            Self::Trade => TRADE_CAP,
            Self::Depth => DEPTH_CAP,
        }
    }

    /// Cache key for `symbol`, e.g. `kline:BTCUSDT`.
    pub fn key(&self, symbol: &str) -> String {
        format!("{}{}", self.prefix(), symbol)
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches(':'))
    }
}

/// Push `record` and evict from the front until `len <= cap`.
pub fn push_capped<T>(window: &mut VecDeque<T>, record: T, cap: usize) {
    window.push_back(record);
    truncate_front(window, cap);
}

/// Drop the oldest records so at most `cap` remain.
pub fn truncate_front<T>(window: &mut VecDeque<T>, cap: usize) {
    let excess = window.len().saturating_sub(cap);
    window.drain(..excess);
}
