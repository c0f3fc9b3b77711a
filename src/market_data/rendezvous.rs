// =============================================================================
// Trade-tick rendezvous — single-slot, latest-value handoff
// =============================================================================
//
// The trade worker publishes every trade price; the kline worker takes the
// newest one, if any, when an in-progress kline arrives.  Neither side ever
// waits:
//   - `publish` overwrites whatever tick is still unconsumed (drop-oldest).
//   - `try_take` returns the pending tick at most once, or `None`.
//
// Built on `tokio::sync::watch`, whose single slot and per-receiver "seen"
// version give exactly these semantics.
// =============================================================================

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeTick {
    pub price: f64,
    pub trade_id: u64,
}

pub struct TickSender {
    tx: watch::Sender<Option<TradeTick>>,
}

pub struct TickReceiver {
    rx: watch::Receiver<Option<TradeTick>>,
}

/// A connected producer/consumer pair for one symbol.
pub fn tick_channel() -> (TickSender, TickReceiver) {
    let (tx, rx) = watch::channel(None);
    (TickSender { tx }, TickReceiver { rx })
}

impl TickSender {
    /// Replace the pending tick.  Never blocks, never fails: a tick sent after
    /// the consumer is gone is simply discarded.
    pub fn publish(&self, tick: TradeTick) {
        self.tx.send_replace(Some(tick));
    }
}

impl TickReceiver {
    /// Take the newest tick published since the last take, without waiting.
    pub fn try_take(&mut self) -> Option<TradeTick> {
        match self.rx.has_changed() {
            Ok(true) => *self.rx.borrow_and_update(),
            // Nothing new, or the trade worker has exited.
            Ok(false) | Err(_) => None,
        }
    }
}
