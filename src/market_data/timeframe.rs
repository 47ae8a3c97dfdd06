// =============================================================================
// Timeframes — supported candle periods
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// A supported candle period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    /// Every supported timeframe, shortest first.
    pub const ALL: [Timeframe; 7] = [
        Self::M1,
        Self::M5,
        Self::M15,
        Self::H1,
        Self::H4,
        Self::D1,
        Self::W1,
    ];

    pub fn duration_ms(self) -> i64 {
        match self {
            Self::M1 => MINUTE_MS,
            Self::M5 => 5 * MINUTE_MS,
            Self::M15 => 15 * MINUTE_MS,
            Self::H1 => HOUR_MS,
            Self::H4 => 4 * HOUR_MS,
            Self::D1 => DAY_MS,
            Self::W1 => 7 * DAY_MS,
        }
    }

    /// Scales asset volatility: short periods are damped, long ones amplified.
    /// Monotonic across [`Timeframe::ALL`].
    pub fn volatility_multiplier(self) -> f64 {
        match self {
            Self::M1 => 0.6,
            Self::M5 => 0.8,
            Self::M15 => 1.0,
            Self::H1 => 1.3,
            Self::H4 => 1.6,
            Self::D1 => 2.0,
            Self::W1 => 2.5,
        }
    }

    /// Start of the period containing `ts_ms`.
    pub fn align(self, ts_ms: i64) -> i64 {
        ts_ms.div_euclid(self.duration_ms()) * self.duration_ms()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
            Self::W1 => "1w",
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::M15
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tf| tf.as_str() == s.trim())
            .ok_or_else(|| SimError::UnknownTimeframe(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_agree() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.to_string().parse::<Timeframe>().unwrap(), tf);
        }
        assert!("2h".parse::<Timeframe>().is_err());
    }

    #[test]
    fn durations_and_multipliers_increase() {
        for pair in Timeframe::ALL.windows(2) {
            assert!(pair[0].duration_ms() < pair[1].duration_ms());
            assert!(pair[0].volatility_multiplier() < pair[1].volatility_multiplier());
        }
    }

    #[test]
    fn align_truncates_to_period() {
        let ts = 1_700_000_123_456;
        let aligned = Timeframe::H1.align(ts);
        assert_eq!(aligned % 3_600_000, 0);
        assert!(aligned <= ts && ts - aligned < 3_600_000);
    }

    #[test]
    fn serde_uses_short_names() {
        assert_eq!(serde_json::to_string(&Timeframe::H4).unwrap(), "\"4h\"");
        let tf: Timeframe = serde_json::from_str("\"1w\"").unwrap();
        assert_eq!(tf, Timeframe::W1);
    }
}
