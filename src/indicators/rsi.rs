// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// Step 1 — Sum gains / losses over the first `period` price changes.
// Step 2 — Seed average gain / average loss at index `period`.
// Step 3 — Apply Wilder's smoothing for every later index:
//            avg_gain = (prev_avg_gain * (period - 1) + gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + loss) / period
// Step 4 — RSI = 100 - 100 / (1 + avg_gain / avg_loss)
// =============================================================================

use super::SENTINEL;

/// Compute the RSI series for `closes` and `period`.
///
/// Output has the input's length; the first value sits at index `period`.
///
/// # Edge cases
/// - `period == 0` or fewer than `period + 1` closes => empty vec
/// - average loss zero => 100.0; both averages zero => 50.0
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    if period == 0 || n < period + 1 {
        return Vec::new();
    }

    let (sum_gain, sum_loss) = (1..=period).fold((0.0_f64, 0.0_f64), |(g, l), i| {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            (g + delta, l)
        } else {
            (g, l - delta)
        }
    });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    let mut out = vec![SENTINEL; n];
    out[period] = rsi_from_averages(avg_gain, avg_loss);

    for i in period + 1..n {
        let delta = closes[i] - closes[i - 1];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;
        out[i] = rsi_from_averages(avg_gain, avg_loss);
    }

    out
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
