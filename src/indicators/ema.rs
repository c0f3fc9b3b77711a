// =============================================================================
// Exponential Moving Average (EMA) and MACD
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = (close_t - EMA_{t-1}) * multiplier + EMA_{t-1}
//
// The first EMA value (index `period - 1`) is the SMA of the first `period`
// closes.
//
// MACD:
//   macd      = EMA(short) - EMA(long)            defined from index `long`
//   signal    = EMA(macd, signal)                 over macd's defined suffix
//   histogram = macd - signal                     defined from index `long + signal`
// =============================================================================

use super::{pad_front, sma, SENTINEL};

/// Compute the EMA series for `values` and look-back `period`.
///
/// Output has the input's length; indices before `period - 1` hold the
/// sentinel.  Returns an empty vec when `period == 0` or the input is shorter
/// than `period`.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    if period == 0 || n < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut out = vec![SENTINEL; n];
    out[period - 1] = sma(values, period)[period - 1];

    for i in period..n {
        let prev = out[i - 1];
        out[i] = (values[i] - prev) * multiplier + prev;
    }
    out
}

/// The three MACD series, each as long as the input.
#[derive(Debug, Clone, Default)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn is_empty(&self) -> bool {
        self.macd.is_empty()
    }
}

/// Moving Average Convergence/Divergence.
///
/// Requires `0 < short <= long`, `signal > 0` and at least `long + signal`
/// values; otherwise all three series are empty.
pub fn macd(values: &[f64], short: usize, long: usize, signal: usize) -> Macd {
    let n = values.len();
    if short == 0 || signal == 0 || short > long || n < long + signal {
        return Macd::default();
    }

    let short_ema = ema(values, short);
    let long_ema = ema(values, long);

    let mut macd_line = vec![SENTINEL; n];
    for i in long..n {
        macd_line[i] = short_ema[i] - long_ema[i];
    }

    let signal_line = pad_front(ema(&macd_line[long..], signal), n);

    let mut histogram = vec![SENTINEL; n];
    for i in long + signal..n {
        histogram[i] = macd_line[i] - signal_line[i];
    }

    Macd {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}
