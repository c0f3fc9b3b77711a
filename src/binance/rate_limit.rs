// =============================================================================
// Request-Weight Tracker — observes Binance REST usage
// =============================================================================
//
// Binance caps request weight per IP at 6000 per minute and reports the running
// total in the `X-MBX-USED-WEIGHT-1M` response header.  Seeding fans out over
// every USDT pair at once, so the total climbs fast at startup.
//
// The tracker only observes: it records the latest header value and warns when
// usage crosses the threshold.  Enforcement stays with the exchange.
// =============================================================================

use std::sync::atomic::{AtomicU32, Ordering};

use reqwest::header::HeaderMap;
use tracing::{debug, warn};

pub const WEIGHT_HEADER: &str = "X-MBX-USED-WEIGHT-1M";

/// Documented per-minute ceiling.
const WEIGHT_LIMIT: u32 = 6000;
/// Usage above which every response logs a warning.
const WEIGHT_WARN_THRESHOLD: u32 = 4800;

pub struct WeightTracker {
    used_weight_1m: AtomicU32,
}

impl WeightTracker {
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
        }
    }

    /// Record the weight reported in `headers`, if any.
    pub fn update_from_headers(&self, headers: &HeaderMap) {
        let Some(w) = headers
            .get(WEIGHT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u32>().ok())
        else {
            return;
        };

        let prev = self.used_weight_1m.swap(w, Ordering::Relaxed);
        if w >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = w,
                limit = WEIGHT_LIMIT,
                "request weight crossed warning threshold"
            );
        } else if w >= WEIGHT_WARN_THRESHOLD {
            warn!(used_weight = w, "request weight remains above warning threshold");
        }
        debug!(used_weight_1m = w, "request weight updated from header");
    }

    pub fn used_weight(&self) -> u32 {
        self.used_weight_1m.load(Ordering::Relaxed)
    }
}

impl Default for WeightTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WeightTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightTracker")
            .field("used_weight_1m", &self.used_weight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(weight: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(WEIGHT_HEADER, HeaderValue::from_str(weight).unwrap());
        h
    }

    #[test]
    fn tracks_latest_header_value() {
        let t = WeightTracker::new();
        t.update_from_headers(&headers("120"));
        assert_eq!(t.used_weight(), 120);
        t.update_from_headers(&headers("5000"));
        assert_eq!(t.used_weight(), 5000);
        t.update_from_headers(&headers("3"));
        assert_eq!(t.used_weight(), 3);
    }

    #[test]
    fn ignores_missing_or_garbage_headers() {
        let t = WeightTracker::new();
        t.update_from_headers(&headers("42"));
        t.update_from_headers(&HeaderMap::new());
        t.update_from_headers(&headers("lots"));
        assert_eq!(t.used_weight(), 42);
    }
}
