// =============================================================================
// Shared types used across the Aurora market simulator
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{SimError, SimResult};

/// Price substituted for pairs whose last price is zero or negative.
pub const DEFAULT_REFERENCE_PRICE: f64 = 1.0;

/// Snapshot of a tradable pair and its 24h statistics.
///
/// Treated as an immutable value: a refresh or a new selection replaces the
/// whole struct, fields are never patched individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPair {
    /// Display symbol, e.g. "BTC-USD".
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub last_price: f64,
    /// 24h change in percent.
    #[serde(default)]
    pub price_change_24h: f64,
    /// 24h traded volume in base units.
    #[serde(default)]
    pub volume_24h: f64,
    #[serde(default)]
    pub high_24h: f64,
    #[serde(default)]
    pub low_24h: f64,
    #[serde(default)]
    pub market_cap: f64,
}

impl TradingPair {
    /// The price every generator centres on.
    ///
    /// Non-positive prices are replaced by [`DEFAULT_REFERENCE_PRICE`] since the
    /// output is illustrative only. NaN or infinite prices are a caller bug and
    /// are rejected.
    pub fn reference_price(&self) -> SimResult<f64> {
        if !self.last_price.is_finite() {
            return Err(SimError::NonFinitePrice {
                symbol: self.symbol.clone(),
                value: self.last_price,
            });
        }
        if self.last_price <= 0.0 {
            warn!(
                symbol = %self.symbol,
                last_price = self.last_price,
                substitute = DEFAULT_REFERENCE_PRICE,
                "non-positive reference price, substituting default"
            );
            return Ok(DEFAULT_REFERENCE_PRICE);
        }
        Ok(self.last_price)
    }

    /// Copy of this pair with a new last price; everything else is kept.
    pub fn with_last_price(&self, last_price: f64) -> Self {
        Self {
            last_price,
            ..self.clone()
        }
    }
}

/// Aggressor side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Direction of a display position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Which trade model the tape generator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapeMode {
    /// Uniform side, profile-sized trades one minute apart.
    Simple,
    /// Weighted size buckets with side biased by the simulated price move.
    Biased,
}

impl Default for TapeMode {
    fn default() -> Self {
        Self::Simple
    }
}

impl std::fmt::Display for TapeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "Simple"),
            Self::Biased => write!(f, "Biased"),
        }
    }
}
