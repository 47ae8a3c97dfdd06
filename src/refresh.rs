// =============================================================================
// Market Refresh Loop
// =============================================================================
//
// Regenerates and publishes the selected pair's market every
// `refresh_interval_ms`. A pair switch publishes on its own, so the loop only
// restarts its interval to keep the next regeneration a full period away.
// =============================================================================

use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::app_state::AppState;

/// Floor for the refresh period.
const MIN_REFRESH_INTERVAL_MS: u64 = 100;

/// Run the refresh loop until the task is dropped or aborted.
pub async fn run_refresh_loop(state: Arc<AppState>) {
    let period_ms = state
        .runtime_config
        .read()
        .refresh_interval_ms
        .max(MIN_REFRESH_INTERVAL_MS);
    info!(period_ms, "market refresh loop started");

    let mut ticker = interval(Duration::from_millis(period_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match state.refresh() {
                    Ok(Some(snapshot)) => {
                        debug!(symbol = %snapshot.pair.symbol, version = snapshot.version, "refresh tick");
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "market refresh failed");
                        state.push_error(format!("market refresh failed: {e}"));
                    }
                }
            }
            _ = state.selection_changed().notified() => {
                debug!("selection changed, refresh interval restarted");
                ticker.reset();
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::tests::test_state;

    #[tokio::test(start_paused = true)]
    async fn publishes_on_every_tick() {
        let state = Arc::new(test_state());
        state.refresh().unwrap();
        let start = state.current_state_version();

        let handle = tokio::spawn(run_refresh_loop(Arc::clone(&state)));
        tokio::time::sleep(Duration::from_millis(3 * 3_000 + 10)).await;
        handle.abort();

        assert_eq!(state.current_state_version(), start + 3);
        assert_eq!(state.snapshot().unwrap().pair.symbol, "BTC-USD");
    }

    #[tokio::test(start_paused = true)]
    async fn pair_switch_restarts_the_interval() {
        let state = Arc::new(test_state());
        state.refresh().unwrap();

        let handle = tokio::spawn(run_refresh_loop(Arc::clone(&state)));
        tokio::time::sleep(Duration::from_millis(2_000)).await;

        state.select_pair("SOL-USD").unwrap();
        let after_switch = state.current_state_version();

        // The original 3 s tick would have fired here.
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(state.current_state_version(), after_switch);

        // 3 s after the switch.
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(state.current_state_version(), after_switch + 1);
        assert_eq!(state.snapshot().unwrap().pair.symbol, "SOL-USD");

        handle.abort();
    }
}
