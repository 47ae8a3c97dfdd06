// =============================================================================
// Trade Tape Generator — recent trades, newest first
// =============================================================================
//
// Two models:
//
//   Simple  every slot independent: price within ±1 book deviation of the
//           reference, amount from the asset's order-size range, fair-coin
//           side, one trade per minute.
//
//   Biased  size drawn from weighted buckets (small 40 %, medium 30 %,
//           large 20 %, whale 10 %) with ±10 % variation, a small random
//           price move, and a buy probability that leans with that move.
//           One trade per second.
// =============================================================================

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimResult;
use crate::market_data::asset_profile::{self, AssetProfile};
use crate::types::{TapeMode, TradeSide, TradingPair};

/// Trades per tape unless configured otherwise.
pub const DEFAULT_TRADE_COUNT: usize = 10;

const SIMPLE_SPACING_MS: i64 = 60 * 1000;
const BIASED_SPACING_MS: i64 = 1000;

/// Bucket sizes are multiples of this many typical orders.
const BUCKET_UNIT_ORDERS: f64 = 10.0;
const BIASED_SIZE_VARIATION: f64 = 0.2;
/// Maximum relative price move of a biased trade (±0.05 %).
const BIASED_PRICE_RANGE: f64 = 0.001;
/// Buy probability shift per unit of relative price move.
const BIASED_SIDE_SENSITIVITY: f64 = 100.0;

/// Size bucket of a biased-tape trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeBucket {
    Small,
    Medium,
    Large,
    Whale,
}

impl SizeBucket {
    /// (bucket, probability), probabilities sum to 1.
    const WEIGHTS: [(SizeBucket, f64); 4] = [
        (Self::Small, 0.4),
        (Self::Medium, 0.3),
        (Self::Large, 0.2),
        (Self::Whale, 0.1),
    ];

    fn multiplier(self) -> f64 {
        match self {
            Self::Small => 0.1,
            Self::Medium => 0.5,
            Self::Large => 2.0,
            Self::Whale => 5.0,
        }
    }

    fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let draw = rng.gen::<f64>();
        let mut cumulative = 0.0;
        for (bucket, probability) in Self::WEIGHTS {
            cumulative += probability;
            if draw <= cumulative {
                return bucket;
            }
        }
        Self::Whale
    }
}

/// A single executed (simulated) trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub price: f64,
    pub amount: f64,
    pub side: TradeSide,
    /// Unix ms.
    pub timestamp: i64,
}

/// Recent trades for one pair, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTape {
    pub symbol: String,
    pub mode: TapeMode,
    pub trades: Vec<Trade>,
}

impl TradeTape {
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Timestamps non-increasing and every amount strictly positive.
    pub fn is_time_ordered(&self) -> bool {
        self.trades.iter().all(|t| t.amount > 0.0)
            && self.trades.windows(2).all(|w| w[0].timestamp >= w[1].timestamp)
    }

    /// Quote-volume share of buys, 0.5 for an empty tape.
    pub fn buy_volume_ratio(&self) -> f64 {
        let (buy, total) = self.trades.iter().fold((0.0, 0.0), |(buy, total), t| {
            let notional = t.price * t.amount;
            match t.side {
                TradeSide::Buy => (buy + notional, total + notional),
                TradeSide::Sell => (buy, total + notional),
            }
        });
        if total > 0.0 {
            buy / total
        } else {
            0.5
        }
    }

    /// Buy minus sell quote volume across the tape.
    pub fn volume_delta(&self) -> f64 {
        self.trades
            .iter()
            .map(|t| match t.side {
                TradeSide::Buy => t.price * t.amount,
                TradeSide::Sell => -t.price * t.amount,
            })
            .sum()
    }
}

fn simple_trade<R: Rng + ?Sized>(
    reference: f64,
    profile: &AssetProfile,
    rng: &mut R,
) -> (f64, f64, TradeSide, i64) {
    let price = reference * (1.0 + rng.gen_range(-1.0..=1.0) * profile.book_deviation);
    let amount = profile.sample_order_size(rng);
    let side = if rng.gen_bool(0.5) {
        TradeSide::Buy
    } else {
        TradeSide::Sell
    };
    (price, amount, side, SIMPLE_SPACING_MS)
}

fn biased_trade<R: Rng + ?Sized>(
    reference: f64,
    profile: &AssetProfile,
    rng: &mut R,
) -> (f64, f64, TradeSide, i64) {
    let bucket = SizeBucket::sample(rng);
    let base_size = bucket.multiplier() * profile.typical_order_size * BUCKET_UNIT_ORDERS;
    let amount = base_size * (1.0 + (rng.gen::<f64>() - 0.5) * BIASED_SIZE_VARIATION);

    let price_change = (rng.gen::<f64>() - 0.5) * BIASED_PRICE_RANGE;
    let price = reference * (1.0 + price_change);

    let buy_probability = (0.5 + price_change * BIASED_SIDE_SENSITIVITY).clamp(0.0, 1.0);
    let side = if rng.gen_bool(buy_probability) {
        TradeSide::Buy
    } else {
        TradeSide::Sell
    };
    (price, amount, side, BIASED_SPACING_MS)
}

/// Generate `count` trades ending at `now_ms`, newest first.
pub fn generate_trade_tape<R: Rng + ?Sized>(
    pair: &TradingPair,
    count: usize,
    mode: TapeMode,
    now_ms: i64,
    rng: &mut R,
) -> SimResult<TradeTape> {
    let reference = pair.reference_price()?;
    let profile = asset_profile::resolve(&pair.base);

    let mut trades: Vec<Trade> = (0..count)
        .map(|i| {
            let (price, amount, side, spacing) = match mode {
                TapeMode::Simple => simple_trade(reference, &profile, rng),
                TapeMode::Biased => biased_trade(reference, &profile, rng),
            };
            Trade {
                id: format!("trade-{now_ms}-{i}"),
                price,
                amount,
                side,
                timestamp: now_ms - i as i64 * spacing,
            }
        })
        .collect();

    trades.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let tape = TradeTape {
        symbol: pair.symbol.clone(),
        mode,
        trades,
    };
    debug!(
        symbol = %pair.symbol,
        mode = %mode,
        count = tape.len(),
        buy_ratio = tape.buy_volume_ratio(),
        "trade tape generated"
    );
    Ok(tape)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
