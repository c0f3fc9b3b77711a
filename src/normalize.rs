// =============================================================================
// Normalization — raw exchange records to canonical types
// =============================================================================
//
// Binance sends every price and quantity as a decimal string and every time as
// a millisecond epoch.  Conversion either yields a complete record that
// satisfies the data-model invariants or a `ParseError` naming the offending
// field; callers never see a half-built record.
// =============================================================================

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Field, ParseError, ParseErrorKind};
use crate::feed::{RawAggTrade, RawDepth, RawKline};
use crate::types::{Candle, DepthSnapshot, OrderBookEntry, Trade};

/// Parse a decimal string into a finite f64.
pub fn parse_decimal(raw: &str, field: Field) -> Result<f64, ParseError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ParseError::new(field, ParseErrorKind::Malformed(raw.to_string())))?;
    if !value.is_finite() {
        return Err(ParseError::new(field, ParseErrorKind::NonFinite));
    }
    Ok(value)
}

fn non_negative(raw: &str, field: Field) -> Result<f64, ParseError> {
    let value = parse_decimal(raw, field)?;
    if value < 0.0 {
        return Err(ParseError::new(field, ParseErrorKind::Negative(value)));
    }
    Ok(value)
}

fn positive(raw: &str, field: Field) -> Result<f64, ParseError> {
    let value = parse_decimal(raw, field)?;
    if value <= 0.0 {
        return Err(ParseError::new(field, ParseErrorKind::NonPositive(value)));
    }
    Ok(value)
}

/// Millisecond epoch to an absolute UTC time.
pub fn millis_to_time(ms: i64, field: Field) -> Result<DateTime<Utc>, ParseError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| ParseError::new(field, ParseErrorKind::Timestamp(ms)))
}

fn invariant(field: Field, what: &'static str) -> ParseError {
    ParseError::new(field, ParseErrorKind::Invariant(what))
}

/// Build a [`Candle`] from a raw kline.
///
/// Enforces `open_time < close_time`, `low <= open, close <= high` and
/// non-negative prices and volumes.
pub fn candle_from_kline(raw: &RawKline) -> Result<Candle, ParseError> {
    let open_time = millis_to_time(raw.open_time, Field::OpenTime)?;
    let close_time = millis_to_time(raw.close_time, Field::CloseTime)?;
    if open_time >= close_time {
        return Err(invariant(Field::OpenTime, "open time must precede close time"));
    }

    let open = non_negative(&raw.open, Field::Open)?;
    let high = non_negative(&raw.high, Field::High)?;
    let low = non_negative(&raw.low, Field::Low)?;
    let close = non_negative(&raw.close, Field::Close)?;

    if low > high {
        return Err(invariant(Field::Low, "low above high"));
    }
    if open < low || open > high {
        return Err(invariant(Field::Open, "open outside low..high"));
    }
    if close < low || close > high {
        return Err(invariant(Field::Close, "close outside low..high"));
    }

    Ok(Candle {
        open_time,
        close_time,
        open,
        high,
        low,
        close,
        volume: non_negative(&raw.volume, Field::Volume)?,
        quote_asset_volume: non_negative(&raw.quote_asset_volume, Field::QuoteAssetVolume)?,
        taker_buy_base: non_negative(&raw.taker_buy_base, Field::TakerBuyBase)?,
        taker_buy_quote: non_negative(&raw.taker_buy_quote, Field::TakerBuyQuote)?,
        is_final: raw.is_final,
        sma10: None,
        sma30: None,
        rsi14: None,
        returns: None,
    })
}

/// Build a [`Trade`] from a raw aggregated trade.  Price and quantity must be
/// strictly positive.
pub fn trade_from_agg(raw: &RawAggTrade) -> Result<Trade, ParseError> {
    Ok(Trade {
        id: raw.id,
        price: positive(&raw.price, Field::TradePrice)?,
        quantity: positive(&raw.quantity, Field::TradeQty)?,
        buyer_is_maker: raw.buyer_is_maker,
        time: millis_to_time(raw.time, Field::TradeTime)?,
        is_best_match: raw.is_best_match,
    })
}

fn levels(
    raw: &[(String, String)],
    price_field: Field,
    qty_field: Field,
) -> Result<Vec<OrderBookEntry>, ParseError> {
    raw.iter()
        .map(|(price, qty)| {
            Ok(OrderBookEntry {
                price: non_negative(price, price_field)?,
                quantity: non_negative(qty, qty_field)?,
            })
        })
        .collect()
}

/// Build a [`DepthSnapshot`] with bids sorted descending and asks ascending.
///
/// Zero-quantity levels are kept: they mark removals for diff consumers.
pub fn depth_from_book(raw: &RawDepth) -> Result<DepthSnapshot, ParseError> {
    let mut bids = levels(&raw.bids, Field::BidPrice, Field::BidQty)?;
    let mut asks = levels(&raw.asks, Field::AskPrice, Field::AskQty)?;

    bids.sort_by(|a, b| b.price.total_cmp(&a.price));
    asks.sort_by(|a, b| a.price.total_cmp(&b.price));

    Ok(DepthSnapshot {
        last_update_id: raw.last_update_id,
        bids,
        asks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::raw_kline;

    fn level(p: &str, q: &str) -> (String, String) {
        (p.to_string(), q.to_string())
    }

    #[test]
    fn candle_from_valid_kline() {
        let raw = raw_kline(0, "100", "105", "95", "101", true);
        let c = candle_from_kline(&raw).unwrap();
        assert_eq!(c.open, 100.0);
        assert_eq!(c.close, 101.0);
        assert_eq!(c.open_time.timestamp_millis(), 0);
        assert_eq!(c.close_time.timestamp_millis(), 59_999);
        assert!(c.is_final);
        assert!(c.sma10.is_none());
    }

    #[test]
    fn malformed_fields_are_tagged() {
        let cases: Vec<(Box<dyn Fn(&mut RawKline)>, Field)> = vec![
            (Box::new(|k| k.open = "abc".into()), Field::Open),
            (Box::new(|k| k.high = "".into()), Field::High),
            (Box::new(|k| k.low = "x".into()), Field::Low),
            (Box::new(|k| k.close = "1,5".into()), Field::Close),
            (Box::new(|k| k.volume = "-".into()), Field::Volume),
            (Box::new(|k| k.quote_asset_volume = "q".into()), Field::QuoteAssetVolume),
            (Box::new(|k| k.taker_buy_base = "NaN".into()), Field::TakerBuyBase),
            (Box::new(|k| k.taker_buy_quote = "inf".into()), Field::TakerBuyQuote),
        ];
        for (mutate, field) in cases {
            let mut raw = raw_kline(0, "100", "105", "95", "101", true);
            mutate(&mut raw);
            let err = candle_from_kline(&raw).unwrap_err();
            assert_eq!(err.field, field, "{err}");
        }
    }

    #[test]
    fn candle_invariants_are_enforced() {
        let err = candle_from_kline(&raw_kline(0, "100", "99", "95", "98", true)).unwrap_err();
        assert_eq!(err.field, Field::Open);

        let err = candle_from_kline(&raw_kline(0, "100", "105", "95", "106", true)).unwrap_err();
        assert_eq!(err.field, Field::Close);

        let mut raw = raw_kline(0, "100", "105", "95", "101", true);
        raw.close_time = raw.open_time;
        assert_eq!(candle_from_kline(&raw).unwrap_err().field, Field::OpenTime);

        let mut raw = raw_kline(0, "100", "105", "95", "101", true);
        raw.volume = "-1".into();
        let err = candle_from_kline(&raw).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Negative(-1.0));
    }

    #[test]
    fn trade_requires_positive_values() {
        let mut raw = RawAggTrade {
            id: 9,
            price: "101.5".into(),
            quantity: "0.25".into(),
            time: 1_700_000_000_123,
            buyer_is_maker: false,
            is_best_match: true,
        };
        let t = trade_from_agg(&raw).unwrap();
        assert_eq!(t.price, 101.5);
        assert_eq!(t.time.timestamp_millis(), 1_700_000_000_123);

        raw.quantity = "0".into();
        assert_eq!(trade_from_agg(&raw).unwrap_err().field, Field::TradeQty);
        raw.quantity = "1".into();
        raw.price = "oops".into();
        assert_eq!(trade_from_agg(&raw).unwrap_err().field, Field::TradePrice);
    }

    #[test]
    fn depth_is_sorted_and_keeps_removals() {
        let raw = RawDepth {
            last_update_id: 42,
            bids: vec![level("99.5", "1"), level("100.0", "0"), level("98", "3")],
            asks: vec![level("101", "2"), level("100.5", "1")],
        };
        let snap = depth_from_book(&raw).unwrap();
        let bid_prices: Vec<f64> = snap.bids.iter().map(|e| e.price).collect();
        let ask_prices: Vec<f64> = snap.asks.iter().map(|e| e.price).collect();
        assert_eq!(bid_prices, vec![100.0, 99.5, 98.0]);
        assert_eq!(ask_prices, vec![100.5, 101.0]);
        assert_eq!(snap.bids[0].quantity, 0.0);
        assert_eq!(snap.last_update_id, 42);
    }

    #[test]
    fn depth_errors_are_tagged() {
        let mut raw = RawDepth {
            last_update_id: 1,
            bids: vec![level("bad", "1")],
            asks: vec![],
        };
        assert_eq!(depth_from_book(&raw).unwrap_err().field, Field::BidPrice);
        raw.bids = vec![level("1", "-2")];
        assert_eq!(depth_from_book(&raw).unwrap_err().field, Field::BidQty);
        raw.bids.clear();
        raw.asks = vec![level("x", "1")];
        assert_eq!(depth_from_book(&raw).unwrap_err().field, Field::AskPrice);
        raw.asks = vec![level("1", "y")];
        assert_eq!(depth_from_book(&raw).unwrap_err().field, Field::AskQty);
    }
}
