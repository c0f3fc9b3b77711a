// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free transforms over price / volume series.  Every public
// function returns a series of the same length as its primary input, with the
// leading entries that lack enough history set to `SENTINEL` (NaN).  Undersized
// inputs and zero windows produce an empty series.  Inputs are never mutated.
//
// All arithmetic is f64; division by zero never yields an infinity — each
// indicator documents its own fallback.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod momentum;
pub mod psar;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use adx::adx;
pub use atr::{atr, chaikin_volatility, true_range};
pub use bollinger::{bollinger, BollingerBands};
pub use ema::{ema, macd, Macd};
pub use momentum::{momentum, returns};
pub use psar::parabolic_sar;
pub use rsi::rsi;
pub use sma::{hma, sma, vwma, wma};
pub use stochastic::{stochastic, Stochastic};

use crate::types::Candle;

/// Value emitted for indices with insufficient history.
pub const SENTINEL: f64 = f64::NAN;

pub fn is_sentinel(value: f64) -> bool {
    value.is_nan()
}

/// Prefix `values` with sentinels so that it ends at index `len - 1`.
pub(crate) fn pad_front(values: Vec<f64>, len: usize) -> Vec<f64> {
    let missing = len.saturating_sub(values.len());
    let mut out = Vec::with_capacity(len);
    out.resize(missing, SENTINEL);
    out.extend(values);
    out
}

fn defined(series: &[f64], i: usize) -> Option<f64> {
    series.get(i).copied().filter(|v| v.is_finite())
}

/// Fill the derived fields of every candle from the close series:
/// SMA(10), SMA(30), RSI(14) and the per-bar percentage return.
///
/// Fields stay `None` where the window has not filled yet.
pub fn annotate(candles: &mut [Candle]) {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let sma10 = sma(&closes, 10);
    let sma30 = sma(&closes, 30);
    let rsi14 = rsi(&closes, 14);
    let rets = returns(&closes);

    for (i, candle) in candles.iter_mut().enumerate() {
        candle.sma10 = defined(&sma10, i);
        candle.sma30 = defined(&sma30, i);
        candle.rsi14 = defined(&rsi14, i);
        candle.returns = defined(&rets, i);
    }
}
