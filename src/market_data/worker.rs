// =============================================================================
// Stream worker lifecycle — state machine, capped backoff, reconnect loop
// =============================================================================
//
//   Connecting ──subscribed──▶ Running ──stream ended / transport error──▶
//   Disconnected ──▶ Backoff(2^min(attempt, cap) s) ──▶ Connecting
//
//   Subscription rejected  ⇒ Fatal      (worker exits, not restarted)
//   Cancellation token     ⇒ Cancelled  (from any state, including backoff)
//
// `attempt` counts disconnects since the worker started; it is never reset,
// so a flapping upstream converges on the capped delay.
// =============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::PipelineError;

/// Largest exponent `BackoffPolicy` will ever shift by.
const MAX_SHIFT: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamRole {
    Trade,
    Kline,
    Depth,
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trade => "trade",
            Self::Kline => "kline",
            Self::Depth => "depth",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    Connecting,
    Running,
    Disconnected,
    Backoff { attempt: u32, delay: Duration },
    Fatal,
    Cancelled,
}

// =============================================================================
// BackoffPolicy
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    cap_exponent: u32,
}

impl BackoffPolicy {
    pub fn new(cap_exponent: u32) -> Self {
        Self {
            cap_exponent: cap_exponent.min(MAX_SHIFT),
        }
    }

    /// `2^min(attempt, cap)` seconds.
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(1u64 << attempt.min(self.cap_exponent))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(6)
    }
}

// =============================================================================
// StatusReporter
// =============================================================================

/// Publishes a worker's current state; observers subscribe for updates.
pub struct StatusReporter {
    role: StreamRole,
    symbol: String,
    tx: watch::Sender<WorkerState>,
}

impl StatusReporter {
    pub fn new(role: StreamRole, symbol: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(WorkerState::Connecting);
        Self {
            role,
            symbol: symbol.into(),
            tx,
        }
    }

    pub fn set(&self, state: WorkerState) {
        debug!(symbol = %self.symbol, stream = %self.role, state = ?state, "worker state");
        self.tx.send_replace(state);
    }

    pub fn current(&self) -> WorkerState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.tx.subscribe()
    }
}

// =============================================================================
// Reconnect loop
// =============================================================================

/// One connection's worth of work for a stream worker.
#[async_trait]
pub trait StreamSession: Send {
    fn role(&self) -> StreamRole;

    fn symbol(&self) -> &str;

    /// Subscribe, report `Running`, and process events until the upstream
    /// goes away.  `Ok(())` means the stream ended cleanly.
    async fn run_session(&mut self, status: &StatusReporter) -> Result<(), PipelineError>;
}

/// Drive `session` until it fails fatally or `cancel` fires.  Returns the
/// terminal state.
pub async fn run_with_reconnect<S: StreamSession>(
    session: &mut S,
    policy: BackoffPolicy,
    cancel: &CancellationToken,
    status: &StatusReporter,
) -> WorkerState {
    let role = session.role();
    let symbol = session.symbol().to_string();
    let mut attempt: u32 = 0;

    loop {
        status.set(WorkerState::Connecting);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            result = session.run_session(status) => result,
        };

        match outcome {
            Ok(()) => {
                warn!(symbol = %symbol, stream = %role, "stream ended, reconnecting");
            }
            Err(PipelineError::Cancelled) => {
                info!(symbol = %symbol, stream = %role, "worker cancelled");
                status.set(WorkerState::Cancelled);
                return WorkerState::Cancelled;
            }
            Err(e) if e.is_transient() => {
                warn!(symbol = %symbol, stream = %role, error = %e, "stream disconnected");
            }
            Err(e) => {
                error!(symbol = %symbol, stream = %role, error = %e, "worker stopped");
                status.set(WorkerState::Fatal);
                return WorkerState::Fatal;
            }
        }

        status.set(WorkerState::Disconnected);
        attempt = attempt.saturating_add(1);
        let delay = policy.delay(attempt);
        status.set(WorkerState::Backoff { attempt, delay });
        info!(
            symbol = %symbol,
            stream = %role,
            attempt,
            delay_secs = delay.as_secs(),
            "backing off before reconnect"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(symbol = %symbol, stream = %role, "worker cancelled during backoff");
                status.set(WorkerState::Cancelled);
                return WorkerState::Cancelled;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
