// =============================================================================
// Average Directional Index (ADX)
// =============================================================================
//
// ADX quantifies trend **strength** regardless of direction.
//
// Calculation pipeline (bar i >= 1, compared with bar i - 1):
//   1. TR, +DM = max(H_i - H_{i-1}, 0), -DM = max(L_{i-1} - L_i, 0).
//      Only the larger of +DM / -DM survives; ties zero both.
//   2. EMA(w) of TR, +DM and -DM.
//   3. +DI = 100 * EMA(+DM) / EMA(TR),  -DI = 100 * EMA(-DM) / EMA(TR)
//   4. DX  = 100 * |+DI - -DI| / (+DI + -DI)
//   5. ADX = EMA(DX, w)
//
// Index alignment: the smoothed series are first defined at bar `w`, so DX
// starts at `w` and ADX at `2w - 1`.  Any zero divisor yields 0.0.
//
// Interpretation:
//   ADX > 25  => trending market
//   ADX < 20  => ranging / choppy market
// =============================================================================

use super::{ema, pad_front, SENTINEL};
use crate::types::Candle;

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        100.0 * num / den
    }
}

/// Compute the ADX series for `candles` (oldest first).
///
/// Empty when `window == 0` or there are fewer than `2 * window` candles.
pub fn adx(candles: &[Candle], window: usize) -> Vec<f64> {
    let n = candles.len();
    if window == 0 || n < 2 * window {
        return Vec::new();
    }

    // ------------------------------------------------------------------
    // Step 1: TR, +DM, -DM for bars 1..n (slot j describes bar j + 1)
    // ------------------------------------------------------------------
    let mut tr = Vec::with_capacity(n - 1);
    let mut plus_dm = Vec::with_capacity(n - 1);
    let mut minus_dm = Vec::with_capacity(n - 1);

    for pair in candles.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);

        tr.push(
            (cur.high - cur.low)
                .max((cur.high - prev.close).abs())
                .max((cur.low - prev.close).abs()),
        );

        let up = (cur.high - prev.high).max(0.0);
        let down = (prev.low - cur.low).max(0.0);
        if up > down {
            plus_dm.push(up);
            minus_dm.push(0.0);
        } else if down > up {
            plus_dm.push(0.0);
            minus_dm.push(down);
        } else {
            plus_dm.push(0.0);
            minus_dm.push(0.0);
        }
    }

    // ------------------------------------------------------------------
    // Step 2-4: smoothing, DI, DX
    // ------------------------------------------------------------------
    let smooth_tr = ema(&tr, window);
    let smooth_plus = ema(&plus_dm, window);
    let smooth_minus = ema(&minus_dm, window);

    let mut dx = vec![SENTINEL; n];
    for i in window..n {
        let j = i - 1;
        let plus_di = ratio(smooth_plus[j], smooth_tr[j]);
        let minus_di = ratio(smooth_minus[j], smooth_tr[j]);
        dx[i] = ratio((plus_di - minus_di).abs(), plus_di + minus_di);
    }

    // ------------------------------------------------------------------
    // Step 5: ADX over DX's defined suffix
    // ------------------------------------------------------------------
    pad_front(ema(&dx[window..], window), n)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::is_sentinel;
    use crate::testkit::ohlc;

    #[test]
    fn adx_period_zero() {
        let candles = vec![ohlc(1.0, 2.0, 0.5, 1.5); 50];
        assert!(adx(&candles, 0).is_empty());
    }

    #[test]
    fn adx_insufficient_data() {
        let candles = vec![ohlc(1.0, 2.0, 0.5, 1.5); 27];
        assert!(adx(&candles, 14).is_empty());
    }

    #[test]
    fn adx_alignment() {
        let candles: Vec<Candle> = (0..40)
            .map(|i| {
                let base = 100.0 + i as f64;
                ohlc(base, base + 1.0, base - 0.5, base + 0.5)
            })
            .collect();
        let out = adx(&candles, 5);
        assert_eq!(out.len(), 40);
        assert!(is_sentinel(out[8]));
        assert!(!is_sentinel(out[9]));
    }

    #[test]
    fn adx_strong_uptrend() {
        // Consecutive higher highs and higher lows: -DM is always zero, so
        // DX is 100 on every bar.
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                ohlc(base, base + 1.5, base - 0.5, base + 1.0)
            })
            .collect();
        let out = adx(&candles, 14);
        let value = *out.last().unwrap();
        assert!(value > 25.0, "expected ADX > 25 for strong trend, got {value}");
        assert!((value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn adx_flat_market_hits_zero_fallback() {
        // Identical candles: no directional movement, DI sum is zero.
        let candles = vec![ohlc(100.0, 101.0, 99.0, 100.0); 60];
        let out = adx(&candles, 14);
        assert_eq!(*out.last().unwrap(), 0.0);
    }

    #[test]
    fn adx_result_range() {
        let candles: Vec<Candle> = (0..100)
            .map(|i| {
                let base = 50.0 + (i as f64 * 0.3).sin() * 10.0;
                ohlc(base - 0.5, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        for v in adx(&candles, 14).into_iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(&v), "ADX {v} out of [0,100] range");
        }
    }
}
