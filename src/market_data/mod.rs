// =============================================================================
// Market Data Module — synthetic market generators
// =============================================================================
//
// Pure, synchronous generators. Randomness is always injected by the caller
// so every output can be reproduced from a seed.

pub mod asset_profile;
pub mod candles;
pub mod klines;
pub mod orderbook;
pub mod pairs;
pub mod positions;
pub mod timeframe;
pub mod trade_tape;

pub use asset_profile::AssetProfile;
pub use candles::{Candle, CandleSeries};
pub use klines::KlineBundle;
pub use orderbook::{OrderBookEntry, OrderBookSnapshot};
pub use positions::Position;
pub use timeframe::Timeframe;
pub use trade_tape::{Trade, TradeTape};
