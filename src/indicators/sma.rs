// =============================================================================
// Simple, Weighted, Hull and Volume-Weighted Moving Averages
// =============================================================================
//
//   SMA_i  = (1/w) * Σ_{k<w} p[i-k]                       (sliding sum, O(n))
//   WMA_i  = Σ_{k<w} (w-k) * p[i-k] / (w(w+1)/2)          (linear weights 1..w)
//   HMA    = WMA( 2*WMA(p, w/2) - WMA(p, w), floor(sqrt(w)) )
//   VWMA_i = Σ p*v / Σ v over the trailing w bars
//
// WMA is padded to the input length like every other indicator, so HMA's two
// inner series line up by trailing index.
// =============================================================================

use super::{pad_front, SENTINEL};

/// Simple moving average.  First defined value at `window - 1`.
///
/// Returns an empty vec when `window == 0` or `values.len() < window`.
pub fn sma(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if window == 0 || n < window {
        return Vec::new();
    }

    let w = window as f64;
    let mut out = vec![SENTINEL; n];
    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = sum / w;

    for i in window..n {
        sum += values[i] - values[i - window];
        out[i] = sum / w;
    }
    out
}

/// Unpadded WMA: element `j` covers `values[j..j + window]`.
fn wma_core(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }
    let denominator = (window * (window + 1) / 2) as f64;

    values
        .windows(window)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .map(|(k, p)| p * (k + 1) as f64)
                .sum::<f64>()
                / denominator
        })
        .collect()
}

/// Linearly weighted moving average, padded to `values.len()`.
///
/// The most recent bar carries weight `window`, the oldest weight 1.
pub fn wma(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }
    pad_front(wma_core(values, window), values.len())
}

/// Hull moving average.
///
/// Needs `window >= 2` and at least `window + floor(sqrt(window)) - 1`
/// values; the first defined index is `window + floor(sqrt(window)) - 2`.
pub fn hma(values: &[f64], window: usize) -> Vec<f64> {
    if window < 2 {
        return Vec::new();
    }
    let half = window / 2;
    let root = (window as f64).sqrt() as usize;
    let n = values.len();
    if n + 1 < window + root {
        return Vec::new();
    }

    let half_wma = wma_core(values, half);
    let full_wma = wma_core(values, window);

    // full_wma[j] and half_wma[j + offset] both end at index j + window - 1.
    let offset = window - half;
    let diff: Vec<f64> = full_wma
        .iter()
        .enumerate()
        .map(|(j, full)| 2.0 * half_wma[j + offset] - full)
        .collect();

    pad_front(wma_core(&diff, root), n)
}

/// Volume-weighted moving average over the trailing `window` bars.
///
/// When the window's total volume is zero the plain mean of its prices is
/// used instead.  Mismatched input lengths produce an empty vec.
pub fn vwma(prices: &[f64], volumes: &[f64], window: usize) -> Vec<f64> {
    let n = prices.len();
    if window == 0 || n < window || volumes.len() != n {
        return Vec::new();
    }

    let w = window as f64;
    let mut out = vec![SENTINEL; n];
    let mut pv_sum = 0.0;
    let mut v_sum = 0.0;
    let mut p_sum = 0.0;

    for i in 0..n {
        pv_sum += prices[i] * volumes[i];
        v_sum += volumes[i];
        p_sum += prices[i];
        if i >= window {
            let old = i - window;
            pv_sum -= prices[old] * volumes[old];
            v_sum -= volumes[old];
            p_sum -= prices[old];
        }
        if i + 1 >= window {
            out[i] = if v_sum > 0.0 { pv_sum / v_sum } else { p_sum / w };
        }
    }
    out
}
