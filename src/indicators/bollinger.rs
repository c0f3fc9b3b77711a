// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), with σ the population standard deviation of
// the trailing `period` samples.  The Band Width (BBW) is the normalised
// distance: BBW = (upper - lower) / middle * 100.

use super::{sma, SENTINEL};

/// Upper, middle and lower band series, each as long as the input.
#[derive(Debug, Clone, Default)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

impl BollingerBands {
    pub fn is_empty(&self) -> bool {
        self.middle.is_empty()
    }

    /// Band width in percent of the middle band; 0.0 where the middle band is
    /// zero.
    pub fn width(&self) -> Vec<f64> {
        self.middle
            .iter()
            .zip(self.upper.iter().zip(&self.lower))
            .map(|(&m, (&u, &l))| {
                if m.is_nan() {
                    SENTINEL
                } else if m == 0.0 {
                    0.0
                } else {
                    (u - l) / m * 100.0
                }
            })
            .collect()
    }
}

/// Calculate Bollinger Bands for `closes`.
///
/// Empty when `period == 0` or fewer than `period` data points.
pub fn bollinger(closes: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let middle = sma(closes, period);
    if middle.is_empty() {
        return BollingerBands::default();
    }

    let n = closes.len();
    let mut upper = vec![SENTINEL; n];
    let mut lower = vec![SENTINEL; n];

    for i in period - 1..n {
        let mean = middle[i];
        let window = &closes[i + 1 - period..=i];
        let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
        let band = num_std * variance.sqrt();
        upper[i] = mean + band;
        lower[i] = mean - band;
    }

    BollingerBands {
        upper,
        middle,
        lower,
    }
}
