// =============================================================================
// USDT Feed — Main Entry Point
// =============================================================================
//
// Discovers every USDT spot pair on Binance, seeds the cache with recent
// history, then keeps trade, kline and depth windows live per symbol until
// Ctrl-C.  Exit code is non-zero when startup fails (cache unreachable,
// symbol discovery failed, nothing to ingest).
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use usdt_feed::binance::BinanceClient;
use usdt_feed::cache::{Cache, RedisStore};
use usdt_feed::config::{EnvSettings, PipelineConfig};
use usdt_feed::supervisor::Supervisor;

const CONFIG_PATH: &str = "pipeline_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("USDT Feed starting up");

    let config = PipelineConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        PipelineConfig::default()
    });
    let env = EnvSettings::from_env();
    info!(
        interval = %config.interval,
        seed_limit = config.seed_limit,
        cache_addr = %env.cache_addr,
        api_key = env.api_key.is_some(),
        secret_key = env.secret_key.is_some(),
        allow_list = ?env.symbols,
        "configuration resolved"
    );

    // ── 2. Cache ─────────────────────────────────────────────────────────
    let store = RedisStore::connect(&env.cache_addr, env.cache_pass.as_deref())
        .await
        .with_context(|| format!("failed to connect to cache at {}", env.cache_addr))?;
    let cache = Cache::new(Arc::new(store));

    // ── 3. Exchange client ───────────────────────────────────────────────
    let client = BinanceClient::new(
        env.api_key.as_deref(),
        config.rest_url.clone(),
        config.ws_url.clone(),
        config.http_timeout(),
    )?;

    // ── 4. Shutdown signal ───────────────────────────────────────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Ctrl-C received, shutting down"),
                Err(e) => error!(error = %e, "failed to listen for Ctrl-C, shutting down"),
            }
            cancel.cancel();
        });
    }

    // ── 5. Run ───────────────────────────────────────────────────────────
    let supervisor = Supervisor::new(Arc::new(client), cache, config, env.symbols, cancel);
    let exits = supervisor.run().await?;

    info!(workers = exits.len(), "USDT Feed stopped cleanly");
    Ok(())
}
