// =============================================================================
// Depth worker — order-book updates to the depth window
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{error, info, warn};

use super::worker::{StatusReporter, StreamRole, StreamSession, WorkerState};
use crate::cache::{Cache, WindowKind};
use crate::error::{FeedError, PipelineError};
use crate::feed::{MarketFeed, RawDepth};
use crate::normalize::depth_from_book;

pub struct DepthWorker {
    symbol: String,
    feed: Arc<dyn MarketFeed>,
    cache: Cache,
    ttl: Duration,
}

impl DepthWorker {
    pub fn new(
        symbol: impl Into<String>,
        feed: Arc<dyn MarketFeed>,
        cache: Cache,
        ttl: Duration,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            feed,
            cache,
            ttl,
        }
    }

    /// Append one snapshot to `depth:<symbol>`.
    pub async fn handle(&self, raw: RawDepth) {
        let snapshot = match depth_from_book(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(symbol = %self.symbol, stream = "depth", error = %e, "dropping depth update");
                return;
            }
        };

        if let Err(e) = self
            .cache
            .append(WindowKind::Depth, &self.symbol, snapshot, self.ttl)
            .await
        {
            error!(symbol = %self.symbol, stream = "depth", error = %e, "cache write failed");
        }
    }
}

#[async_trait]
impl StreamSession for DepthWorker {
    fn role(&self) -> StreamRole {
        StreamRole::Depth
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    async fn run_session(&mut self, status: &StatusReporter) -> Result<(), PipelineError> {
        let mut events = self.feed.subscribe_depth(&self.symbol).await?;
        status.set(WorkerState::Running);
        info!(symbol = %self.symbol, stream = "depth", "depth stream connected");

        while let Some(item) = events.next().await {
            match item {
                Ok(raw) => self.handle(raw).await,
                Err(FeedError::Decode(msg)) => {
                    warn!(
                        symbol = %self.symbol,
                        stream = "depth",
                        error = %msg,
                        "undecodable depth event"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
