// =============================================================================
// Parabolic SAR (Wilder)
// =============================================================================
//
// State: direction, acceleration factor (AF), extreme point (EP).
// Start long with AF = 0.02, EP = first high, SAR_0 = first low.
//
// Each bar:
//   SAR_i = SAR_{i-1} + AF * (EP - SAR_{i-1})
//   reversal (long: low <= SAR, short: high >= SAR):
//       flip direction, SAR_i = previous EP, EP = this bar's extreme, AF = 0.02
//   continuation:
//       new extreme => EP = extreme, AF = min(AF + 0.02, 0.2)
// =============================================================================

const AF_STEP: f64 = 0.02;
const AF_MAX: f64 = 0.2;

/// SAR series for the given highs and lows.
///
/// Empty when the series are empty or their lengths differ.  Every index is
/// defined; index 0 is the first low.
pub fn parabolic_sar(high: &[f64], low: &[f64]) -> Vec<f64> {
    let n = high.len();
    if n == 0 || n != low.len() {
        return Vec::new();
    }

    let mut psar = Vec::with_capacity(n);
    psar.push(low[0]);

    let mut is_long = true;
    let mut af = AF_STEP;
    let mut ep = high[0];

    for i in 1..n {
        let prev = psar[i - 1];
        let mut sar = prev + af * (ep - prev);

        if is_long {
            if low[i] <= sar {
                is_long = false;
                sar = ep;
                ep = low[i];
                af = AF_STEP;
            } else if high[i] > ep {
                ep = high[i];
                af = (af + AF_STEP).min(AF_MAX);
            }
        } else if high[i] >= sar {
            is_long = true;
            sar = ep;
            ep = high[i];
            af = AF_STEP;
        } else if low[i] < ep {
            ep = low[i];
            af = (af + AF_STEP).min(AF_MAX);
        }

        psar.push(sar);
    }
    psar
}
