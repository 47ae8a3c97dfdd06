// =============================================================================
// Asset Profiles — per-asset behavioural parameters
// =============================================================================
//
// Every generator scales its randomness by the traded asset: BTC moves less
// per candle than a small-cap, and a typical BTC order is a fraction of a coin
// while a typical ARB order is hundreds of tokens. Profiles are derived on
// demand from the base asset symbol; nothing is stored.
// =============================================================================

use rand::Rng;
use serde::Serialize;

/// Fixed behavioural parameters for one base asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssetProfile {
    /// Per-candle volatility before timeframe scaling (fraction of price).
    pub base_volatility: f64,
    /// Price distance between order-book levels (fraction of price).
    pub book_deviation: f64,
    /// Upper bound of a typical single order, in base units.
    pub typical_order_size: f64,
    /// 1m volume used when the pair carries no usable 24h volume.
    pub typical_volume_floor: f64,
}

/// Fallback for unknown assets: widest volatility and book spacing buckets.
const DEFAULT_PROFILE: AssetProfile = AssetProfile {
    base_volatility: 0.0015,
    book_deviation: 0.001,
    typical_order_size: 1.0,
    typical_volume_floor: 1000.0,
};

/// Order sizes are drawn from this fraction range of `typical_order_size`.
const ORDER_SIZE_RANGE: (f64, f64) = (0.5, 1.0);

impl AssetProfile {
    /// Draw one order size, uniform in `[0.5, 1.0] × typical_order_size`.
    pub fn sample_order_size<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.typical_order_size * rng.gen_range(ORDER_SIZE_RANGE.0..=ORDER_SIZE_RANGE.1)
    }
}

impl Default for AssetProfile {
    fn default() -> Self {
        DEFAULT_PROFILE
    }
}

/// Resolve the profile for a base asset symbol (case-insensitive).
///
/// Total: unknown symbols get [`DEFAULT_PROFILE`].
pub fn resolve(base: &str) -> AssetProfile {
    match base.trim().to_ascii_uppercase().as_str() {
        "BTC" => AssetProfile {
            base_volatility: 0.0008,
            book_deviation: 0.0002,
            typical_order_size: 0.05,
            typical_volume_floor: 2.0,
        },
        "ETH" => AssetProfile {
            base_volatility: 0.001,
            book_deviation: 0.0003,
            typical_order_size: 0.8,
            typical_volume_floor: 15.0,
        },
        "BNB" => AssetProfile {
            base_volatility: 0.0012,
            ..DEFAULT_PROFILE
        },
        "SOL" => AssetProfile {
            book_deviation: 0.0005,
            typical_order_size: 15.0,
            ..DEFAULT_PROFILE
        },
        "AVAX" => AssetProfile {
            typical_order_size: 20.0,
            ..DEFAULT_PROFILE
        },
        "ARB" => AssetProfile {
            typical_order_size: 500.0,
            ..DEFAULT_PROFILE
        },
        "OP" => AssetProfile {
            typical_order_size: 300.0,
            ..DEFAULT_PROFILE
        },
        _ => DEFAULT_PROFILE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn known_assets_resolve() {
        let btc = resolve("BTC");
        assert!((btc.base_volatility - 0.0008).abs() < f64::EPSILON);
        assert!((btc.typical_order_size - 0.05).abs() < f64::EPSILON);
        assert!((resolve("ARB").typical_order_size - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(resolve("eth"), resolve("ETH"));
    }

    #[test]
    fn unknown_asset_gets_widest_buckets() {
        let unknown = resolve("DOGE");
        assert_eq!(unknown, AssetProfile::default());
        for base in ["BTC", "ETH", "BNB", "SOL", "AVAX", "ARB", "OP"] {
            let p = resolve(base);
            assert!(unknown.base_volatility >= p.base_volatility, "{base}");
            assert!(unknown.book_deviation >= p.book_deviation, "{base}");
        }
    }

    #[test]
    fn order_sizes_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let btc = resolve("BTC");
        for _ in 0..1_000 {
            let size = btc.sample_order_size(&mut rng);
            assert!((0.025..=0.05).contains(&size), "size {size}");
        }
    }
}
