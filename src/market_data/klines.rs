// =============================================================================
// Kline Bundle — every supported timeframe for one pair
// =============================================================================
//
// Each timeframe is generated from its own `StdRng`, seeded with a draw from
// the caller's generator. Series therefore share no random state, yet the
// whole bundle is reproducible from a single seed.
// =============================================================================

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimResult;
use crate::market_data::candles::{generate_candle_series, CandleSeries};
use crate::market_data::timeframe::Timeframe;
use crate::types::TradingPair;

/// Candle series for every supported timeframe of one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlineBundle {
    pub symbol: String,
    /// Unix ms the bundle was generated for.
    pub generated_at: i64,
    pub series: BTreeMap<Timeframe, CandleSeries>,
}

impl KlineBundle {
    pub fn get(&self, timeframe: Timeframe) -> Option<&CandleSeries> {
        self.series.get(&timeframe)
    }

    pub fn timeframes(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.series.keys().copied()
    }
}

/// Generate one series per entry of [`Timeframe::ALL`].
///
/// All-or-nothing: if any timeframe fails the whole bundle is discarded.
pub fn generate_kline_bundle<R: Rng + ?Sized>(
    pair: &TradingPair,
    count: usize,
    now_ms: i64,
    rng: &mut R,
) -> SimResult<KlineBundle> {
    let seeds: Vec<(Timeframe, u64)> = Timeframe::ALL.iter().map(|&tf| (tf, rng.gen())).collect();

    let series = seeds
        .into_iter()
        .map(|(tf, seed)| {
            let mut local_rng = StdRng::seed_from_u64(seed);
            generate_candle_series(pair, tf, count, now_ms, &mut local_rng).map(|s| (tf, s))
        })
        .collect::<SimResult<BTreeMap<_, _>>>()?;

    debug!(
        symbol = %pair.symbol,
        timeframes = series.len(),
        per_series = count,
        "kline bundle generated"
    );

    Ok(KlineBundle {
        symbol: pair.symbol.clone(),
        generated_at: now_ms,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::pairs::{default_pairs, find_pair};

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn bundle_covers_all_timeframes() {
        let pair = find_pair(&default_pairs(), "ETH-USD").unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let bundle = generate_kline_bundle(&pair, 200, NOW, &mut rng).unwrap();
        assert_eq!(bundle.timeframes().collect::<Vec<_>>(), Timeframe::ALL.to_vec());
        for tf in Timeframe::ALL {
            let series = bundle.get(tf).unwrap();
            assert_eq!(series.len(), 200);
            assert!(series.is_well_formed());
        }
    }

    #[test]
    fn shape_is_stable_across_calls() {
        let pair = find_pair(&default_pairs(), "SOL-USD").unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        let a = generate_kline_bundle(&pair, 60, NOW, &mut rng).unwrap();
        let b = generate_kline_bundle(&pair, 60, NOW, &mut rng).unwrap();
        assert_eq!(a.timeframes().collect::<Vec<_>>(), b.timeframes().collect::<Vec<_>>());
        for tf in Timeframe::ALL {
            assert_eq!(a.get(tf).unwrap().len(), b.get(tf).unwrap().len());
        }
        // Values come from fresh draws.
        assert_ne!(a, b);
    }

    #[test]
    fn timeframes_do_not_share_random_state() {
        let pair = find_pair(&default_pairs(), "BTC-USD").unwrap();
        let bundle = generate_kline_bundle(&pair, 30, NOW, &mut StdRng::seed_from_u64(13)).unwrap();
        let m1: Vec<f64> = bundle.get(Timeframe::M1).unwrap().candles.iter().map(|c| c.close).collect();
        let m5: Vec<f64> = bundle.get(Timeframe::M5).unwrap().candles.iter().map(|c| c.close).collect();
        assert_ne!(m1, m5);
    }

    #[test]
    fn non_finite_pair_fails_whole_bundle() {
        let pair = find_pair(&default_pairs(), "BTC-USD").unwrap().with_last_price(f64::INFINITY);
        let mut rng = StdRng::seed_from_u64(14);
        assert!(generate_kline_bundle(&pair, 10, NOW, &mut rng).is_err());
    }

    #[test]
    fn serialises_with_timeframe_keys() {
        let pair = find_pair(&default_pairs(), "OP-USD").unwrap();
        let bundle = generate_kline_bundle(&pair, 2, NOW, &mut StdRng::seed_from_u64(15)).unwrap();
        let json = serde_json::to_value(&bundle).unwrap();
        assert!(json["series"]["1h"]["candles"].is_array());
        assert!(json["series"]["1w"].is_object());
    }
}
