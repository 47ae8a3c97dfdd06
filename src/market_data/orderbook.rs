// =============================================================================
// Order Book Generator — synthetic two-sided depth snapshot
// =============================================================================
//
// Levels are spaced by the asset's book deviation with ±20 % jitter, so the
// raw ladder is not guaranteed to be monotonic. After sorting (asks ascending,
// bids descending) the running totals are rebuilt, making `total` the true
// cumulative depth from the touch down to that level.
// =============================================================================

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimResult;
use crate::market_data::asset_profile;
use crate::types::TradingPair;

/// Levels per side unless configured otherwise.
pub const DEFAULT_BOOK_DEPTH: usize = 10;
/// Hard cap on levels per side; keeps the deepest bid well above zero.
pub const MAX_BOOK_DEPTH: usize = 50;

const LEVEL_JITTER_MIN: f64 = 0.8;
const LEVEL_JITTER_MAX: f64 = 1.2;

/// One price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookEntry {
    pub price: f64,
    pub size: f64,
    /// Cumulative size from the best level through this one.
    pub total: f64,
}

/// Both sides of the book, best level first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Ascending by price.
    pub asks: Vec<OrderBookEntry>,
    /// Descending by price.
    pub bids: Vec<OrderBookEntry>,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|e| e.price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|e| e.price)
    }

    pub fn mid_price(&self) -> Option<f64> {
        Some((self.best_bid()? + self.best_ask()?) / 2.0)
    }

    /// Touch spread in basis points of the mid.
    pub fn spread_bps(&self) -> Option<f64> {
        let (bid, ask) = (self.best_bid()?, self.best_ask()?);
        let mid = (bid + ask) / 2.0;
        if mid > 0.0 {
            Some(((ask - bid) / mid) * 10_000.0)
        } else {
            None
        }
    }

    pub fn bid_depth(&self) -> f64 {
        self.bids.iter().map(|e| e.size).sum()
    }

    pub fn ask_depth(&self) -> f64 {
        self.asks.iter().map(|e| e.size).sum()
    }

    /// (bid depth − ask depth) / total depth, in [-1, 1]. Zero for an empty
    /// book.
    pub fn imbalance(&self) -> f64 {
        let (bid, ask) = (self.bid_depth(), self.ask_depth());
        let total = bid + ask;
        if total > 0.0 {
            (bid - ask) / total
        } else {
            0.0
        }
    }

    /// Asks strictly ascending, bids strictly descending, totals strictly
    /// increasing and every size positive.
    pub fn is_well_formed(&self) -> bool {
        let side_ok = |side: &[OrderBookEntry]| {
            side.iter().all(|e| e.size > 0.0 && e.price.is_finite())
                && side.windows(2).all(|w| w[1].total > w[0].total)
        };
        side_ok(&self.asks)
            && side_ok(&self.bids)
            && self.asks.windows(2).all(|w| w[1].price > w[0].price)
            && self.bids.windows(2).all(|w| w[1].price < w[0].price)
    }
}

/// Rebuild running totals in current order.
fn accumulate(side: &mut [OrderBookEntry]) {
    let mut running = 0.0;
    for entry in side.iter_mut() {
        running += entry.size;
        entry.total = running;
    }
}

/// Generate `depth` levels per side around the pair's reference price.
///
/// `depth` is capped at [`MAX_BOOK_DEPTH`]; zero gives an empty book.
pub fn generate_order_book<R: Rng + ?Sized>(
    pair: &TradingPair,
    depth: usize,
    rng: &mut R,
) -> SimResult<OrderBookSnapshot> {
    let reference = pair.reference_price()?;
    let profile = asset_profile::resolve(&pair.base);
    let depth = depth.min(MAX_BOOK_DEPTH);

    let mut build_side = |sign: f64| -> Vec<OrderBookEntry> {
        (0..depth)
            .map(|i| {
                let jitter = rng.gen_range(LEVEL_JITTER_MIN..=LEVEL_JITTER_MAX);
                let offset = profile.book_deviation * (i + 1) as f64 * jitter;
                OrderBookEntry {
                    price: reference * (1.0 + sign * offset),
                    size: profile.sample_order_size(&mut *rng),
                    total: 0.0,
                }
            })
            .collect()
    };

    let mut asks = build_side(1.0);
    let mut bids = build_side(-1.0);

    asks.sort_by(|a, b| a.price.total_cmp(&b.price));
    bids.sort_by(|a, b| b.price.total_cmp(&a.price));
    accumulate(&mut asks);
    accumulate(&mut bids);

    let book = OrderBookSnapshot { asks, bids };
    debug!(
        symbol = %pair.symbol,
        depth,
        best_bid = book.best_bid(),
        best_ask = book.best_ask(),
        spread_bps = book.spread_bps(),
        "order book generated"
    );
    Ok(book)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
