// =============================================================================
// Stochastic Oscillator
// =============================================================================
//
//   %K_i = 100 * (close_i - minLow) / (maxHigh - minLow)   over trailing w bars
//   %D   = SMA(%K, w)
//
// A flat window (maxHigh == minLow) gives %K = 50.

use super::{pad_front, sma, SENTINEL};
use crate::types::Candle;

#[derive(Debug, Clone, Default)]
pub struct Stochastic {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

impl Stochastic {
    pub fn is_empty(&self) -> bool {
        self.k.is_empty()
    }
}

/// %K first defined at `window - 1`, %D at `2 * window - 2`.
///
/// Empty when `window == 0` or fewer than `window` candles.
pub fn stochastic(candles: &[Candle], window: usize) -> Stochastic {
    let n = candles.len();
    if window == 0 || n < window {
        return Stochastic::default();
    }

    let mut k = vec![SENTINEL; n];
    for i in window - 1..n {
        let span = &candles[i + 1 - window..=i];
        let lowest = span.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let highest = span.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let range = highest - lowest;
        k[i] = if range == 0.0 {
            50.0
        } else {
            100.0 * (candles[i].close - lowest) / range
        };
    }

    let d = match sma(&k[window - 1..], window) {
        smoothed if smoothed.is_empty() => vec![SENTINEL; n],
        smoothed => pad_front(smoothed, n),
    };

    Stochastic { k, d }
}
