//! Bar source port.

use crate::domain::bar::Bar;
use crate::domain::error::ConfluenceError;

/// Supplies the bar history of one (symbol, timeframe) pair.
///
/// Implementations return bars in strictly increasing timestamp order and
/// report a missing table as [`ConfluenceError::DataUnavailable`].
pub trait BarSource: Sync {
    fn fetch_bars(&self, symbol: &str, timeframe: &str) -> Result<Vec<Bar>, ConfluenceError>;
}
