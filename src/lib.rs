// =============================================================================
// Aurora Market Simulator
// =============================================================================
//
// Synthetic market data for a trading dashboard: candles on every timeframe,
// order-book depth, a recent-trades tape and display positions, regenerated on
// a timer and published atomically per selected pair.
// =============================================================================

pub mod api;
pub mod app_state;
pub mod clock;
pub mod error;
pub mod market_data;
pub mod refresh;
pub mod runtime_config;
pub mod types;

pub use app_state::{AppState, MarketSnapshot};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SimError, SimResult};
pub use market_data::asset_profile::resolve as resolve_asset_profile;
pub use market_data::candles::generate_candle_series;
pub use market_data::klines::generate_kline_bundle;
pub use market_data::orderbook::generate_order_book;
pub use market_data::pairs::default_pairs;
pub use market_data::positions::generate_positions;
pub use market_data::trade_tape::generate_trade_tape;
pub use runtime_config::SimConfig;
pub use types::{TapeMode, TradingPair};
