// =============================================================================
// Binance REST API Client — public market-data endpoints
// =============================================================================
//
// Only unsigned endpoints are used.  The API key, when configured, is still
// sent as `X-MBX-APIKEY` so requests are attributed to the account; the secret
// key is never logged or serialized.
//
// Every response's `X-MBX-USED-WEIGHT-1M` header is fed to the weight tracker.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::rate_limit::WeightTracker;
use crate::error::FeedError;
use crate::feed::{RawAggTrade, RawDepth, RawKline};

/// Binance REST + websocket client.
#[derive(Clone)]
pub struct BinanceClient {
    pub(super) rest_url: String,
    pub(super) ws_url: String,
    client: reqwest::Client,
    weight: Arc<WeightTracker>,
    has_key: bool,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new `BinanceClient`.
    ///
    /// # Arguments
    /// * `api_key`  — optional Binance API key (sent as a header only).
    /// * `rest_url` — e.g. `https://api.binance.com`
    /// * `ws_url`   — e.g. `wss://stream.binance.com:9443/ws`
    pub fn new(
        api_key: Option<&str>,
        rest_url: impl Into<String>,
        ws_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        let mut has_key = false;
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let val = HeaderValue::from_str(key).context("API key is not a valid header value")?;
            default_headers.insert("X-MBX-APIKEY", val);
            has_key = true;
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        let rest_url = rest_url.into().trim_end_matches('/').to_string();
        let ws_url = ws_url.into().trim_end_matches('/').to_string();
        debug!(rest_url = %rest_url, ws_url = %ws_url, "BinanceClient initialised");

        Ok(Self {
            rest_url,
            ws_url,
            client,
            weight: Arc::new(WeightTracker::new()),
            has_key,
        })
    }

    pub fn weight(&self) -> &WeightTracker {
        &self.weight
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    /// GET `path` with `query` and decode the JSON body.
    ///
    /// Connection failures and non-success statuses are transport errors; a
    /// body that is not JSON is a decode error.
    async fn get_json(&self, path: &str, query: &str) -> Result<Value, FeedError> {
        let url = if query.is_empty() {
            format!("{}{}", self.rest_url, path)
        } else {
            format!("{}{}?{}", self.rest_url, path, query)
        };

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::Transport(format!("GET {path} request failed: {e}")))?;

        self.weight.update_from_headers(resp.headers());

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FeedError::Transport(format!("GET {path} body read failed: {e}")))?;

        if !status.is_success() {
            return Err(FeedError::Transport(format!(
                "Binance GET {path} returned {status}: {body}"
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| FeedError::Decode(format!("GET {path} returned invalid JSON: {e}")))
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /api/v3/exchangeInfo — every listed symbol name.
    #[instrument(skip(self), name = "binance::exchange_info")]
    pub async fn get_symbols(&self) -> Result<Vec<String>, FeedError> {
        let body = self.get_json("/api/v3/exchangeInfo", "").await?;
        let symbols = parse_symbols(&body)?;
        debug!(count = symbols.len(), authenticated = self.has_key, "exchange info retrieved");
        Ok(symbols)
    }

    /// GET /api/v3/klines
    ///
    /// Array indices:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
    ///   [6] closeTime, [7] quoteAssetVolume, [8] numberOfTrades,
    ///   [9] takerBuyBaseVolume, [10] takerBuyQuoteVolume
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<RawKline>, FeedError> {
        let query = format!("symbol={symbol}&interval={interval}&limit={limit}");
        let body = self.get_json("/api/v3/klines", &query).await?;
        let klines = parse_klines(&body, Utc::now().timestamp_millis())?;
        debug!(symbol, interval, count = klines.len(), "klines fetched");
        Ok(klines)
    }

    /// GET /api/v3/aggTrades
    #[instrument(skip(self), name = "binance::get_agg_trades")]
    pub async fn get_agg_trades(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<RawAggTrade>, FeedError> {
        let query = format!("symbol={symbol}&limit={limit}");
        let body = self.get_json("/api/v3/aggTrades", &query).await?;
        let trades: Vec<RawAggTrade> = serde_json::from_value(body)
            .map_err(|e| FeedError::Decode(format!("aggTrades: {e}")))?;
        debug!(symbol, count = trades.len(), "agg trades fetched");
        Ok(trades)
    }

    /// GET /api/v3/depth
    #[instrument(skip(self), name = "binance::get_depth")]
    pub async fn get_depth(&self, symbol: &str, limit: u32) -> Result<RawDepth, FeedError> {
        let query = format!("symbol={symbol}&limit={limit}");
        let body = self.get_json("/api/v3/depth", &query).await?;
        serde_json::from_value(body).map_err(|e| FeedError::Decode(format!("depth: {e}")))
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

fn parse_symbols(body: &Value) -> Result<Vec<String>, FeedError> {
    let entries = body["symbols"]
        .as_array()
        .ok_or_else(|| FeedError::Decode("exchangeInfo response missing 'symbols' array".into()))?;

    Ok(entries
        .iter()
        .filter_map(|s| s["symbol"].as_str().map(str::to_string))
        .collect())
}

/// Decode the klines array-of-arrays.  A bar whose close time is still in the
/// future (relative to `now_ms`) is reported as in progress.
fn parse_klines(body: &Value, now_ms: i64) -> Result<Vec<RawKline>, FeedError> {
    let rows = body
        .as_array()
        .ok_or_else(|| FeedError::Decode("klines response is not an array".into()))?;

    let mut klines = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(arr) = row.as_array().filter(|a| a.len() >= 11) else {
            warn!(entry = %row, "skipping malformed kline entry");
            continue;
        };

        let (Some(open_time), Some(close_time)) = (arr[0].as_i64(), arr[6].as_i64()) else {
            warn!(entry = %row, "skipping kline entry without timestamps");
            continue;
        };

        klines.push(RawKline {
            open_time,
            close_time,
            open: decimal_text(&arr[1]),
            high: decimal_text(&arr[2]),
            low: decimal_text(&arr[3]),
            close: decimal_text(&arr[4]),
            volume: decimal_text(&arr[5]),
            quote_asset_volume: decimal_text(&arr[7]),
            taker_buy_base: decimal_text(&arr[9]),
            taker_buy_quote: decimal_text(&arr[10]),
            is_final: close_time < now_ms,
        });
    }
    Ok(klines)
}

/// Decimal fields arrive as strings; tolerate bare numbers too.  Anything else
/// becomes an empty string and fails normalization with the field tag.
fn decimal_text(val: &Value) -> String {
    match val {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("api_key", &if self.has_key { "<redacted>" } else { "<none>" })
            .field("rest_url", &self.rest_url)
            .field("ws_url", &self.ws_url)
            .finish()
    }
}
