// =============================================================================
// Streaming engine — three workers per symbol
// =============================================================================
//
//   trade worker ──TradeTick──▶ kline worker      (single-slot rendezvous)
//        │                           │
//        ▼                           ▼
//   trade:<SYM>                 kline:<SYM>          depth worker ─▶ depth:<SYM>
//
// Each worker is the only writer of its window.
// =============================================================================

pub mod depth_stream;
pub mod kline_stream;
pub mod rendezvous;
pub mod trade_stream;
pub mod worker;

pub use depth_stream::DepthWorker;
pub use kline_stream::KlineWorker;
pub use rendezvous::tick_channel;
pub use trade_stream::TradeWorker;
pub use worker::{
    run_with_reconnect, BackoffPolicy, StatusReporter, StreamRole, StreamSession, WorkerState,
};
