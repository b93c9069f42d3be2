//! Timeframe identifiers.
//!
//! Accepts both the prefix form used in data file names (`M1`, `M15`, `H1`,
//! `H4`, `D1`) and the suffix form used by most charting tools (`15m`, `1h`,
//! `4h`, `1D`).

use crate::domain::error::ConfluenceError;
use chrono::Duration;

pub fn parse_timeframe(id: &str) -> Result<Duration, ConfluenceError> {
    let id = id.trim();
    let unknown = || ConfluenceError::invalid_input(format!("unknown timeframe '{}'", id));

    let (unit, digits) = match id.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => (c, &id[1..]),
        Some(_) => {
            let c = id.chars().last().ok_or_else(unknown)?;
            (c, &id[..id.len() - c.len_utf8()])
        }
        None => return Err(unknown()),
    };

    let count: i64 = digits.parse().map_err(|_| unknown())?;
    if count <= 0 {
        return Err(unknown());
    }

    let period = match unit.to_ascii_lowercase() {
        'm' => Duration::try_minutes(count),
        'h' => Duration::try_hours(count),
        'd' => Duration::try_days(count),
        'w' => Duration::try_weeks(count),
        _ => None,
    };
    period.ok_or_else(unknown)
}
