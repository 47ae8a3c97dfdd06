// =============================================================================
// Aurora Market Simulator — Main Entry Point
// =============================================================================
//
// Loads the sim config, publishes the default pair's market, then runs the
// refresh loop and the dashboard API until Ctrl+C.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use aurora_sim::app_state::AppState;
use aurora_sim::runtime_config::SimConfig;
use aurora_sim::{api, refresh};

const DEFAULT_CONFIG_PATH: &str = "sim_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Aurora Market Simulator starting up");

    let config_path =
        std::env::var("SIM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = SimConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        SimConfig::default()
    });
    config
        .apply_env_overrides()
        .context("invalid environment override")?;

    info!(
        pairs = config.pairs.len(),
        default_symbol = %config.default_symbol,
        tape_mode = %config.tape_mode,
        seed = ?config.seed,
        refresh_interval_ms = config.refresh_interval_ms,
        "Simulator configured"
    );

    let bind_addr = config.bind_addr.clone();

    // ── 2. Build shared state and publish the first snapshot ─────────────
    let state = Arc::new(AppState::new(config).context("failed to build app state")?);
    let first = state
        .refresh()
        .context("initial market generation failed")?;
    if let Some(snapshot) = first {
        info!(symbol = %snapshot.pair.symbol, version = snapshot.version, "Initial market published");
    }

    // ── 3. Market refresh loop ───────────────────────────────────────────
    tokio::spawn(refresh::run_refresh_loop(state.clone()));

    // ── 4. REST + WebSocket API server ───────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping");

    if let Err(e) = state.persist_config(&config_path) {
        error!(error = %e, "Failed to save sim config on shutdown");
    }

    info!(
        state_version = state.current_state_version(),
        ws_messages = state
            .ws_sequence_number
            .load(std::sync::atomic::Ordering::Relaxed),
        "Aurora Market Simulator shut down complete."
    );
    Ok(())
}
