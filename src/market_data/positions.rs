// =============================================================================
// Display Positions — illustrative open positions for the selected pair
// =============================================================================
//
// Nothing here is tied to real orders. Each refresh re-creates the positions
// from fixed templates, with entry prices scattered around the pair's price
// and the mark taken from the current reference price.
// =============================================================================

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::{Builder, Uuid};

use crate::error::SimResult;
use crate::market_data::asset_profile;
use crate::types::{PositionSide, TradingPair};

/// Entry prices land within this many book deviations of the reference.
const ENTRY_SPREAD_DEVIATIONS: f64 = 20.0;

/// (side, size in typical orders, leverage)
const TEMPLATES: [(PositionSide, f64, u32); 3] = [
    (PositionSide::Long, 1.5, 10),
    (PositionSide::Short, 15.0, 5),
    (PositionSide::Long, 100.0, 3),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub pair: String,
    pub side: PositionSide,
    pub size: f64,
    pub entry_price: f64,
    pub mark_price: f64,
    pub pnl: f64,
    /// Unlevered return on entry notional, in percent.
    pub pnl_percentage: f64,
    pub leverage: u32,
}

impl Position {
    fn new(
        id: Uuid,
        pair: &str,
        side: PositionSide,
        size: f64,
        entry_price: f64,
        mark_price: f64,
        leverage: u32,
    ) -> Self {
        let per_unit = match side {
            PositionSide::Long => mark_price - entry_price,
            PositionSide::Short => entry_price - mark_price,
        };
        Self {
            id: id.to_string(),
            pair: pair.to_string(),
            side,
            size,
            entry_price,
            mark_price,
            pnl: per_unit * size,
            pnl_percentage: per_unit / entry_price * 100.0,
            leverage,
        }
    }

    pub fn notional(&self) -> f64 {
        self.size * self.mark_price
    }
}

/// Generate the display positions for `pair`, marked at its reference price.
pub fn generate_positions<R: Rng + ?Sized>(
    pair: &TradingPair,
    rng: &mut R,
) -> SimResult<Vec<Position>> {
    let mark = pair.reference_price()?;
    let profile = asset_profile::resolve(&pair.base);
    let spread = profile.book_deviation * ENTRY_SPREAD_DEVIATIONS;

    Ok(TEMPLATES
        .iter()
        .map(|&(side, units, leverage)| {
            let entry = mark * (1.0 + rng.gen_range(-1.0..=1.0) * spread);
            let id = Builder::from_random_bytes(rng.gen()).into_uuid();
            Position::new(
                id,
                &pair.symbol,
                side,
                units * profile.typical_order_size,
                entry,
                mark,
                leverage,
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::pairs::{default_pairs, find_pair};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn three_positions_marked_at_reference() {
        let pair = find_pair(&default_pairs(), "ETH-USD").unwrap();
        let mut rng = StdRng::seed_from_u64(41);
        let positions = generate_positions(&pair, &mut rng).unwrap();
        assert_eq!(positions.len(), 3);
        for p in &positions {
            assert_eq!(p.mark_price, pair.last_price);
            assert_eq!(p.pair, "ETH-USD");
            assert!(p.size > 0.0 && p.entry_price > 0.0);
            assert!((p.entry_price / pair.last_price - 1.0).abs() <= 0.0003 * 20.0 + 1e-12);
        }
        assert_eq!(positions[1].side, PositionSide::Short);
        assert_eq!(positions[0].leverage, 10);
    }

    #[test]
    fn pnl_sign_follows_side() {
        let long = Position::new(Uuid::nil(), "X", PositionSide::Long, 2.0, 100.0, 110.0, 1);
        assert!((long.pnl - 20.0).abs() < 1e-9);
        assert!((long.pnl_percentage - 10.0).abs() < 1e-9);

        let short = Position::new(Uuid::nil(), "X", PositionSide::Short, 2.0, 100.0, 110.0, 1);
        assert!((short.pnl + 20.0).abs() < 1e-9);
        assert!((short.notional() - 220.0).abs() < 1e-9);
    }

    #[test]
    fn same_seed_same_positions() {
        let pair = find_pair(&default_pairs(), "BTC-USD").unwrap();
        let a = generate_positions(&pair, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = generate_positions(&pair, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
        assert_eq!(Uuid::parse_str(&a[0].id).unwrap().get_version_num(), 4);
    }

    #[test]
    fn ids_are_unique() {
        let pair = find_pair(&default_pairs(), "SOL-USD").unwrap();
        let positions = generate_positions(&pair, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_ne!(positions[0].id, positions[1].id);
    }
}
