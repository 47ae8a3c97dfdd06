// =============================================================================
// Candle Generator — synthetic OHLCV series for one (pair, timeframe)
// =============================================================================
//
// Model, per candle, as a fraction of the running price:
//
//   delta = trend + random_walk × session + mean_reversion + momentum
//
//   trend           direction × strength of the active trend segment. The
//                   series is split into four segments so that moves persist
//                   over many candles instead of looking like pure noise.
//   random_walk     uniform noise scaled by asset × timeframe volatility.
//   session         1.2 inside the active UTC windows (13–21h, 0–8h),
//                   0.8 otherwise.
//   mean_reversion  pull toward a lagging anchor of recent closes.
//   momentum        exponentially decayed sum of past random-walk terms,
//                   clamped to ±0.2 %.
//
// Highs and lows extend past the body by a random share of the move, so the
// OHLC invariant holds by construction. Volume is driven by the size of the
// move and the same session factor, so volatile candles carry more volume.
// =============================================================================

use chrono::{DateTime, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimResult;
use crate::market_data::asset_profile::{self, AssetProfile};
use crate::market_data::timeframe::{Timeframe, DAY_MS};
use crate::types::TradingPair;

// ---------------------------------------------------------------------------
// Model constants
// ---------------------------------------------------------------------------

/// Candles per series unless the caller asks otherwise.
pub const DEFAULT_CANDLE_COUNT: usize = 200;
/// Hard cap on candles per series; bounds the work of one refresh pass.
pub const MAX_CANDLE_COUNT: usize = 1_000;

/// Generated prices never fall below one cent.
pub const MIN_PRICE: f64 = 0.01;

const TREND_SEGMENTS: usize = 4;
const TREND_STRENGTH_MIN: f64 = 0.0001;
const TREND_STRENGTH_MAX: f64 = 0.0005;

const MEAN_REVERSION_RATE: f64 = 0.1;
/// Share of the gap to each new close that the reversion anchor closes.
const ANCHOR_FOLLOW_RATE: f64 = 0.05;

const MOMENTUM_DECAY: f64 = 0.95;
const MOMENTUM_MAX: f64 = 0.002;

const ACTIVE_SESSION_MULTIPLIER: f64 = 1.2;
const QUIET_SESSION_MULTIPLIER: f64 = 0.8;

/// How strongly volume reacts to the relative size of a move.
const VOLUME_MOVE_SENSITIVITY: f64 = 8.0;
const VOLUME_NOISE_MIN: f64 = 0.7;
const VOLUME_NOISE_MAX: f64 = 1.3;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle. `timestamp` is the period open in Unix ms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// `low ≤ min(open, close) ≤ max(open, close) ≤ high`, volume ≥ 0 and every
    /// field finite.
    pub fn is_consistent(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.low <= self.open.min(self.close)
            && self.high >= self.open.max(self.close)
            && self.low <= self.high
            && self.volume >= 0.0
    }
}

/// Ordered candles (oldest first) for one pair and timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Every candle consistent, spacing exactly one period, timestamps on
    /// period boundaries.
    pub fn is_well_formed(&self) -> bool {
        let step = self.timeframe.duration_ms();
        self.candles.iter().all(Candle::is_consistent)
            && self
                .candles
                .iter()
                .all(|c| self.timeframe.align(c.timestamp) == c.timestamp)
            && self
                .candles
                .windows(2)
                .all(|w| w[1].timestamp - w[0].timestamp == step)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct TrendSegment {
    direction: f64,
    strength: f64,
}

impl TrendSegment {
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            direction: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
            strength: rng.gen_range(TREND_STRENGTH_MIN..TREND_STRENGTH_MAX),
        }
    }

    fn effect(&self) -> f64 {
        self.direction * self.strength
    }
}

/// Volatility multiplier for the UTC hour of `ts_ms`.
pub fn session_multiplier(ts_ms: i64) -> f64 {
    let hour = DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .map(|dt| dt.hour())
        .unwrap_or(0);
    if (13..=21).contains(&hour) || hour <= 8 {
        ACTIVE_SESSION_MULTIPLIER
    } else {
        QUIET_SESSION_MULTIPLIER
    }
}

/// Per-period volume before noise: the pair's 24h volume spread evenly over
/// the day, or the profile floor when the pair has no usable volume.
fn base_volume(pair: &TradingPair, profile: &AssetProfile, timeframe: Timeframe) -> f64 {
    let periods_per_day = DAY_MS as f64 / timeframe.duration_ms() as f64;
    let apportioned = pair.volume_24h / periods_per_day;
    if apportioned.is_finite() && apportioned > 0.0 {
        apportioned
    } else {
        let minutes = timeframe.duration_ms() as f64 / Timeframe::M1.duration_ms() as f64;
        profile.typical_volume_floor * minutes.sqrt()
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate `count` candles ending at the period that contains `now_ms`.
///
/// The walk starts from the pair's reference price. `count` is capped at
/// [`MAX_CANDLE_COUNT`] and zero yields an empty series. Fails only when the
/// pair's price is not finite.
pub fn generate_candle_series<R: Rng + ?Sized>(
    pair: &TradingPair,
    timeframe: Timeframe,
    count: usize,
    now_ms: i64,
    rng: &mut R,
) -> SimResult<CandleSeries> {
    let reference = pair.reference_price()?;
    let count = count.min(MAX_CANDLE_COUNT);
    let mut series = CandleSeries {
        symbol: pair.symbol.clone(),
        timeframe,
        candles: Vec::with_capacity(count),
    };
    if count == 0 {
        return Ok(series);
    }

    let profile = asset_profile::resolve(&pair.base);
    let volatility = profile.base_volatility * timeframe.volatility_multiplier();
    let step = timeframe.duration_ms();
    let last_open = timeframe.align(now_ms);
    let volume_base = base_volume(pair, &profile, timeframe);

    let trends: Vec<TrendSegment> = (0..TREND_SEGMENTS)
        .map(|_| TrendSegment::random(rng))
        .collect();

    let mut prev_close = reference;
    let mut anchor = reference;
    let mut momentum = 0.0_f64;

    for i in 0..count {
        let timestamp = last_open - (count - 1 - i) as i64 * step;
        let trend = trends[(i * TREND_SEGMENTS / count).min(TREND_SEGMENTS - 1)];
        let session = session_multiplier(timestamp);

        let scale = prev_close;
        let random_walk = (rng.gen::<f64>() - 0.5) * volatility;
        let mean_reversion = MEAN_REVERSION_RATE * (anchor - prev_close) / anchor;
        momentum = (momentum * MOMENTUM_DECAY + random_walk).clamp(-MOMENTUM_MAX, MOMENTUM_MAX);

        let delta = scale * (trend.effect() + random_walk * session + mean_reversion + momentum);

        let open = prev_close;
        let close = (open + delta).max(MIN_PRICE);
        let body_high = open.max(close);
        let body_low = open.min(close);

        let range = delta.abs() * (1.0 + rng.gen::<f64>() * 0.5);
        let high = body_high + range * rng.gen::<f64>() * 0.5;
        let low = (body_low - range * rng.gen::<f64>() * 0.5).max(MIN_PRICE.min(body_low));

        let move_size = (delta / scale).abs();
        let volume = volume_base
            * rng.gen_range(VOLUME_NOISE_MIN..VOLUME_NOISE_MAX)
            * (1.0 + move_size * VOLUME_MOVE_SENSITIVITY * session);

        series.candles.push(Candle {
            timestamp,
            open: round2(open),
            high: round2(high),
            low: round2(low),
            close: round2(close),
            volume: volume.round(),
        });

        prev_close = close;
        anchor += (close - anchor) * ANCHOR_FOLLOW_RATE;
    }

    debug!(
        symbol = %pair.symbol,
        timeframe = %timeframe,
        count = series.len(),
        first_ts = series.candles.first().map(|c| c.timestamp),
        last_close = series.last().map(|c| c.close),
        "candle series generated"
    );

    Ok(series)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::market_data::pairs::{default_pairs, find_pair};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 2023-11-14T22:13:20Z
    const NOW: i64 = 1_700_000_000_000;

    fn btc() -> TradingPair {
        find_pair(&default_pairs(), "BTC-USD").unwrap()
    }

    #[test]
    fn ohlc_invariant_holds_for_every_pair_and_timeframe() {
        let mut rng = StdRng::seed_from_u64(1);
        for pair in default_pairs() {
            for tf in Timeframe::ALL {
                let series = generate_candle_series(&pair, tf, 200, NOW, &mut rng).unwrap();
                assert_eq!(series.len(), 200);
                for c in &series.candles {
                    assert!(c.is_consistent(), "{} {tf}: {c:?}", pair.symbol);
                }
            }
        }
    }

    #[test]
    fn spacing_is_exactly_one_period() {
        let mut rng = StdRng::seed_from_u64(2);
        for tf in Timeframe::ALL {
            let series = generate_candle_series(&btc(), tf, 50, NOW, &mut rng).unwrap();
            assert!(series.is_well_formed(), "{tf}");
            for w in series.candles.windows(2) {
                assert_eq!(w[1].timestamp - w[0].timestamp, tf.duration_ms());
            }
        }
    }

    #[test]
    fn hourly_series_ends_in_current_hour() {
        let mut rng = StdRng::seed_from_u64(3);
        let series = generate_candle_series(&btc(), Timeframe::H1, 200, NOW, &mut rng).unwrap();
        assert_eq!(series.len(), 200);
        let last = series.last().unwrap();
        assert_eq!(last.timestamp / 3_600_000, NOW / 3_600_000);
    }

    #[test]
    fn zero_count_is_empty() {
        let mut rng = StdRng::seed_from_u64(4);
        let series = generate_candle_series(&btc(), Timeframe::M1, 0, NOW, &mut rng).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.symbol, "BTC-USD");
    }

    #[test]
    fn count_is_capped() {
        let mut rng = StdRng::seed_from_u64(11);
        let series =
            generate_candle_series(&btc(), Timeframe::M1, 50_000, NOW, &mut rng).unwrap();
        assert_eq!(series.len(), MAX_CANDLE_COUNT);
        assert!(series.is_well_formed());
        assert_eq!(series.last().unwrap().timestamp, Timeframe::M1.align(NOW));
    }

    #[test]
    fn open_continues_previous_close() {
        let mut rng = StdRng::seed_from_u64(5);
        let series = generate_candle_series(&btc(), Timeframe::M5, 100, NOW, &mut rng).unwrap();
        for w in series.candles.windows(2) {
            assert_eq!(w[1].open, w[0].close);
        }
        // First open is the pair's price, rounded.
        assert_eq!(series.candles[0].open, round2(btc().last_price));
    }

    #[test]
    fn same_seed_same_series() {
        let a = generate_candle_series(&btc(), Timeframe::H4, 120, NOW, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = generate_candle_series(&btc(), Timeframe::H4, 120, NOW, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn volume_falls_back_to_profile_floor() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut pair = btc();
        pair.volume_24h = 0.0;
        let series = generate_candle_series(&pair, Timeframe::M1, 30, NOW, &mut rng).unwrap();
        // Floor for BTC is 2 per minute; noise keeps it at or above 0.7 × 2.
        assert!(series.candles.iter().all(|c| c.volume >= 1.0));
    }

    #[test]
    fn degenerate_price_still_produces_valid_candles() {
        let mut rng = StdRng::seed_from_u64(8);
        let pair = btc().with_last_price(-1.0);
        let series = generate_candle_series(&pair, Timeframe::D1, 200, NOW, &mut rng).unwrap();
        assert!(series.is_well_formed());
        assert!(series.candles.iter().all(|c| c.low >= 0.0));
    }

    #[test]
    fn non_finite_price_is_rejected() {
        let mut rng = StdRng::seed_from_u64(10);
        let pair = btc().with_last_price(f64::NAN);
        let err = generate_candle_series(&pair, Timeframe::M1, 10, NOW, &mut rng).unwrap_err();
        assert!(matches!(err, SimError::NonFinitePrice { .. }));
    }

    #[test]
    fn session_windows() {
        let hour = 3_600_000;
        assert_eq!(session_multiplier(14 * hour), ACTIVE_SESSION_MULTIPLIER);
        assert_eq!(session_multiplier(3 * hour), ACTIVE_SESSION_MULTIPLIER);
        assert_eq!(session_multiplier(10 * hour), QUIET_SESSION_MULTIPLIER);
        assert_eq!(session_multiplier(23 * hour), QUIET_SESSION_MULTIPLIER);
    }
}
