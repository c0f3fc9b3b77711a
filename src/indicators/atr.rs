// =============================================================================
// Average True Range (ATR) and Chaikin Volatility
// =============================================================================
//
// True Range (TR) for each bar:
//   TR_0 = H_0 - L_0                                   (no previous close)
//   TR_i = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_{w-1} = SMA of the first `w` TR values
//   ATR_i     = (1 - 1/w) * ATR_{i-1} + (1/w) * TR_i
//
// Chaikin volatility here is the rolling mean of the high-low range over the
// trailing `w` bars (current bar included).
// =============================================================================

use super::{sma, SENTINEL};

fn same_len(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
}

/// Per-bar true range.  Empty when the input lengths differ.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    if !same_len(high, low) || !same_len(high, close) {
        return Vec::new();
    }

    (0..high.len())
        .map(|i| {
            let hl = high[i] - low[i];
            if i == 0 {
                return hl;
            }
            let prev_close = close[i - 1];
            hl.max((high[i] - prev_close).abs())
                .max((low[i] - prev_close).abs())
        })
        .collect()
}

/// Average True Range with Wilder's smoothing.
///
/// Empty when `window == 0`, the series are shorter than `window`, or their
/// lengths differ.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], window: usize) -> Vec<f64> {
    let tr = true_range(high, low, close);
    let n = tr.len();
    if window == 0 || n < window {
        return Vec::new();
    }

    let k = 1.0 / window as f64;
    let mut out = vec![SENTINEL; n];
    out[window - 1] = sma(&tr, window)[window - 1];
    for i in window..n {
        out[i] = (1.0 - k) * out[i - 1] + k * tr[i];
    }
    out
}

/// Rolling mean of `high - low` over the trailing `window` bars.
pub fn chaikin_volatility(high: &[f64], low: &[f64], window: usize) -> Vec<f64> {
    if !same_len(high, low) {
        return Vec::new();
    }
    let ranges: Vec<f64> = high.iter().zip(low).map(|(h, l)| h - l).collect();
    sma(&ranges, window)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::is_sentinel;

    fn split(bars: &[(f64, f64, f64)]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            bars.iter().map(|b| b.0).collect(),
            bars.iter().map(|b| b.1).collect(),
            bars.iter().map(|b| b.2).collect(),
        )
    }

    #[test]
    fn atr_period_zero() {
        let (h, l, c) = split(&[(105.0, 95.0, 102.0); 20]);
        assert!(atr(&h, &l, &c, 0).is_empty());
    }

    #[test]
    fn atr_insufficient_data() {
        let (h, l, c) = split(&[(105.0, 95.0, 102.0); 10]);
        assert!(atr(&h, &l, &c, 14).is_empty());
    }

    #[test]
    fn atr_mismatched_lengths() {
        assert!(atr(&[1.0, 2.0], &[0.5], &[1.0, 2.0], 1).is_empty());
    }

    #[test]
    fn atr_seed_and_smoothing() {
        let (h, l, c) = split(&[
            (102.0, 98.0, 101.0),
            (104.0, 99.0, 103.0),
            (106.0, 100.0, 105.0),
            (108.0, 102.0, 107.0),
        ]);
        let out = atr(&h, &l, &c, 3);
        assert_eq!(out.len(), 4);
        assert!(is_sentinel(out[1]));
        // TR = [4, 5, 6, 6]
        assert!((out[2] - 5.0).abs() < 1e-12);
        let expected = (2.0 / 3.0) * 5.0 + (1.0 / 3.0) * 6.0;
        assert!((out[3] - expected).abs() < 1e-12);
    }

    #[test]
    fn atr_true_range_uses_prev_close() {
        // Gap scenario: |H - prevClose| > H - L
        let tr = true_range(&[105.0, 115.0], &[95.0, 108.0], &[95.0, 112.0]);
        assert_eq!(tr, vec![10.0, 20.0]);
    }

    #[test]
    fn atr_constant_range() {
        let bars: Vec<(f64, f64, f64)> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.1;
                (base + 5.0, base - 5.0, base)
            })
            .collect();
        let (h, l, c) = split(&bars);
        let out = atr(&h, &l, &c, 14);
        let last = *out.last().unwrap();
        assert!((last - 10.0).abs() < 1.0, "expected ATR near 10.0, got {last}");
    }

    #[test]
    fn chaikin_includes_current_bar() {
        let out = chaikin_volatility(&[10.0, 12.0, 15.0], &[9.0, 10.0, 12.0], 2);
        assert_eq!(out.len(), 3);
        assert!(is_sentinel(out[0]));
        assert!((out[1] - 1.5).abs() < 1e-12);
        assert!((out[2] - 2.5).abs() < 1e-12);
    }
}
