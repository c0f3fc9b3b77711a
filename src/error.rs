// =============================================================================
// Error taxonomy for the ingestion pipeline
// =============================================================================
//
//   ParseError     — a raw record field failed conversion (field-tagged).
//   FeedError      — upstream failures, split into transient transport errors,
//                    fatal subscription errors and per-message decode errors.
//   CacheError     — key/value transport or JSON encoding failure.
//   PipelineError  — what a worker session returns to its reconnect loop.
// =============================================================================

use std::fmt;

use thiserror::Error;

/// Record field a [`ParseError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    OpenTime,
    CloseTime,
    Open,
    High,
    Low,
    Close,
    Volume,
    QuoteAssetVolume,
    TakerBuyBase,
    TakerBuyQuote,
    TradePrice,
    TradeQty,
    TradeTime,
    BidPrice,
    BidQty,
    AskPrice,
    AskQty,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenTime => "open_time",
            Self::CloseTime => "close_time",
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::Volume => "volume",
            Self::QuoteAssetVolume => "quote_asset_volume",
            Self::TakerBuyBase => "taker_buy_base",
            Self::TakerBuyQuote => "taker_buy_quote",
            Self::TradePrice => "trade_price",
            Self::TradeQty => "trade_qty",
            Self::TradeTime => "trade_time",
            Self::BidPrice => "bid_price",
            Self::BidQty => "bid_qty",
            Self::AskPrice => "ask_price",
            Self::AskQty => "ask_qty",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("not a decimal number: {0:?}")]
    Malformed(String),
    #[error("value is not finite")]
    NonFinite,
    #[error("value must not be negative: {0}")]
    Negative(f64),
    #[error("value must be positive: {0}")]
    NonPositive(f64),
    #[error("timestamp out of range: {0}")]
    Timestamp(i64),
    #[error("{0}")]
    Invariant(&'static str),
}

/// A raw upstream field could not be turned into a canonical value.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to parse {field}: {kind}")]
pub struct ParseError {
    pub field: Field,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(field: Field, kind: ParseErrorKind) -> Self {
        Self { field, kind }
    }
}

/// Failures reported by the upstream market feed.
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// Connection dropped, timed out, or returned a retryable status.
    #[error("transport error: {0}")]
    Transport(String),
    /// The subscription could not be established at all.
    #[error("subscription rejected: {0}")]
    Subscribe(String),
    /// A single message could not be decoded; the stream itself is healthy.
    #[error("undecodable message: {0}")]
    Decode(String),
}

/// Key/value store or encoding failure.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache transport error: {0}")]
    Transport(#[from] redis::RedisError),
    #[error("cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Outcome of a worker session, classified for the reconnect loop.
///
/// Parse and cache failures never end a session: workers log them and drop
/// the record, so they have no variant here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("subscription failed: {0}")]
    Subscribe(String),
    #[error("cancelled")]
    Cancelled,
}

impl From<FeedError> for PipelineError {
    fn from(e: FeedError) -> Self {
        match e {
            FeedError::Subscribe(msg) => Self::Subscribe(msg),
            FeedError::Transport(msg) | FeedError::Decode(msg) => Self::Transport(msg),
        }
    }
}

impl PipelineError {
    /// Whether the reconnect loop should back off and try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
