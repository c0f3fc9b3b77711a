// =============================================================================
// Returns and Momentum
// =============================================================================
//
//   returns_i  = 100 * (p_i - p_{i-1}) / p_{i-1}
//   momentum_i = p_i - p_{i-w}

use super::SENTINEL;

/// Per-bar percentage return.  Index 0 holds the sentinel; a zero previous
/// price yields 0.0.
pub fn returns(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len());
    out.push(SENTINEL);
    for pair in values.windows(2) {
        let prev = pair[0];
        if prev == 0.0 {
            out.push(0.0);
        } else {
            out.push(100.0 * (pair[1] - prev) / prev);
        }
    }
    out
}

/// Absolute price change over `window` bars, first defined at index `window`.
///
/// Needs at least `window + 1` values.
pub fn momentum(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if window == 0 || n <= window {
        return Vec::new();
    }

    let mut out = vec![SENTINEL; n];
    for i in window..n {
        out[i] = values[i] - values[i - window];
    }
    out
}
