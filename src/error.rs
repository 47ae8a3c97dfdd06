// =============================================================================
// Simulator Errors
// =============================================================================
//
// Generation is total over valid input, so the taxonomy is small: a pair whose
// price cannot be used at all, and lookups that name something we do not
// know about.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// The pair's reference price is NaN or infinite. Callers must reject such
    /// pairs before generation; nothing is produced for them.
    #[error("pair {symbol} has a non-finite reference price ({value})")]
    NonFinitePrice { symbol: String, value: f64 },

    #[error("unknown trading pair: {0}")]
    UnknownPair(String),

    #[error("unknown timeframe: {0}")]
    UnknownTimeframe(String),
}

pub type SimResult<T> = Result<T, SimError>;
