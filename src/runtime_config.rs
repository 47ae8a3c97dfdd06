// =============================================================================
// Runtime Configuration — simulator settings with atomic save
// =============================================================================
//
// Every tunable of the simulator lives here: refresh cadence, output sizes,
// trade model, RNG seed and the pair catalogue.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::market_data::candles::DEFAULT_CANDLE_COUNT;
use crate::market_data::orderbook::DEFAULT_BOOK_DEPTH;
use crate::market_data::pairs::default_pairs;
use crate::market_data::timeframe::Timeframe;
use crate::market_data::trade_tape::DEFAULT_TRADE_COUNT;
use crate::types::{TapeMode, TradingPair};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_refresh_interval_ms() -> u64 {
    3_000
}

fn default_candle_count() -> usize {
    DEFAULT_CANDLE_COUNT
}

fn default_order_book_depth() -> usize {
    DEFAULT_BOOK_DEPTH
}

fn default_trade_count() -> usize {
    DEFAULT_TRADE_COUNT
}

fn default_symbol() -> String {
    "BTC-USD".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

// =============================================================================
// SimConfig
// =============================================================================

/// Top-level configuration for the simulator.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    // --- Refresh loop -------------------------------------------------------

    /// Period of the market refresh loop.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    // --- Output sizes -------------------------------------------------------

    /// Candles per timeframe in every kline bundle.
    #[serde(default = "default_candle_count")]
    pub candle_count: usize,

    /// Levels per order-book side.
    #[serde(default = "default_order_book_depth")]
    pub order_book_depth: usize,

    /// Trades per tape.
    #[serde(default = "default_trade_count")]
    pub trade_count: usize,

    /// Simple or Biased trade model.
    #[serde(default)]
    pub tape_mode: TapeMode,

    // --- Randomness ---------------------------------------------------------

    /// Fixed RNG seed for reproducible runs; OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    // --- Markets ------------------------------------------------------------

    /// Pair selected at startup.
    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    /// Chart timeframe selected at startup.
    #[serde(default)]
    pub default_timeframe: Timeframe,

    /// Markets offered to the dashboard.
    #[serde(default = "default_pairs")]
    pub pairs: Vec<TradingPair>,

    // --- API ----------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            candle_count: default_candle_count(),
            order_book_depth: default_order_book_depth(),
            trade_count: default_trade_count(),
            tape_mode: TapeMode::default(),
            seed: None,
            default_symbol: default_symbol(),
            default_timeframe: Timeframe::default(),
            pairs: default_pairs(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sim config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse sim config from {}", path.display()))?;

        info!(
            path = %path.display(),
            pairs = config.pairs.len(),
            tape_mode = %config.tape_mode,
            refresh_interval_ms = config.refresh_interval_ms,
            "sim config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise sim config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "sim config saved (atomic)");
        Ok(())
    }

    /// Apply `SIM_SEED`, `SIM_BIND_ADDR` and `SIM_REFRESH_MS` overrides.
    /// A value that does not parse is an error.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(seed) = std::env::var("SIM_SEED") {
            self.seed = Some(
                seed.trim()
                    .parse()
                    .with_context(|| format!("SIM_SEED is not a u64: {seed}"))?,
            );
        }
        if let Ok(addr) = std::env::var("SIM_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }
        if let Ok(ms) = std::env::var("SIM_REFRESH_MS") {
            self.refresh_interval_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("SIM_REFRESH_MS is not a u64: {ms}"))?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.refresh_interval_ms, 3_000);
        assert_eq!(cfg.candle_count, 200);
        assert_eq!(cfg.order_book_depth, 10);
        assert_eq!(cfg.trade_count, 10);
        assert_eq!(cfg.tape_mode, TapeMode::Simple);
        assert_eq!(cfg.default_symbol, "BTC-USD");
        assert_eq!(cfg.default_timeframe, Timeframe::M15);
        assert_eq!(cfg.pairs.len(), 6);
        assert!(cfg.seed.is_none());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: SimConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.refresh_interval_ms, 3_000);
        assert_eq!(cfg.pairs.len(), 6);
        assert_eq!(cfg.bind_addr, "0.0.0.0:3001");
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "tape_mode": "Biased", "seed": 7, "default_timeframe": "1h" }"#;
        let cfg: SimConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.tape_mode, TapeMode::Biased);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.default_timeframe, Timeframe::H1);
        assert_eq!(cfg.trade_count, 10);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("aurora-sim-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sim_config.json");

        let mut cfg = SimConfig::default();
        cfg.seed = Some(99);
        cfg.trade_count = 3;
        cfg.save(&path).unwrap();

        let loaded = SimConfig::load(&path).unwrap();
        assert_eq!(loaded.seed, Some(99));
        assert_eq!(loaded.trade_count, 3);
        assert!(!path.with_extension("json.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(SimConfig::load("/definitely/not/here.json").is_err());
    }
}
