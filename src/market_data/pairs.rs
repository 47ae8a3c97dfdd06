// =============================================================================
// Pair Catalogue — the default set of simulated markets
// =============================================================================

use crate::types::TradingPair;

/// (symbol, base, last price, 24h change %, 24h volume, 24h range %, market cap)
const CATALOGUE: [(&str, &str, f64, f64, f64, f64, f64); 6] = [
    ("BTC-USD", "BTC", 43_250.25, -1.2, 12_580.45, 1.5, 843.5e9),
    ("ETH-USD", "ETH", 2_285.75, 2.5, 85_420.78, 2.0, 274.8e9),
    ("SOL-USD", "SOL", 98.45, 5.8, 458_750.25, 2.5, 42.5e9),
    ("AVAX-USD", "AVAX", 35.80, -0.8, 325_480.15, 1.8, 12.8e9),
    ("ARB-USD", "ARB", 1.85, 3.2, 854_620.35, 2.2, 2.4e9),
    ("OP-USD", "OP", 3.25, -2.1, 654_280.90, 2.0, 2.8e9),
];

/// The built-in pairs, all quoted in USD.
pub fn default_pairs() -> Vec<TradingPair> {
    CATALOGUE
        .iter()
        .map(|&(symbol, base, price, change, volume, range_pct, cap)| TradingPair {
            symbol: symbol.to_string(),
            base: base.to_string(),
            quote: "USD".to_string(),
            last_price: price,
            price_change_24h: change,
            volume_24h: volume,
            high_24h: price * (1.0 + range_pct / 100.0),
            low_24h: price * (1.0 - range_pct / 100.0),
            market_cap: cap,
        })
        .collect()
}

/// Look up a pair by symbol (case-insensitive).
pub fn find_pair(pairs: &[TradingPair], symbol: &str) -> Option<TradingPair> {
    pairs
        .iter()
        .find(|p| p.symbol.eq_ignore_ascii_case(symbol.trim()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_six_usd_pairs() {
        let pairs = default_pairs();
        assert_eq!(pairs.len(), 6);
        assert!(pairs.iter().all(|p| p.quote == "USD"));
        assert!(pairs.iter().all(|p| p.low_24h < p.last_price && p.last_price < p.high_24h));
    }

    #[test]
    fn find_is_case_insensitive() {
        let pairs = default_pairs();
        assert_eq!(find_pair(&pairs, "eth-usd").unwrap().base, "ETH");
        assert!(find_pair(&pairs, "DOGE-USD").is_none());
    }
}
