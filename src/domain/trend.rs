//! Moving-average trend classification.

use crate::domain::error::ConfluenceError;
use crate::domain::indicator::sma::rolling_mean;
use std::fmt;

pub const DEFAULT_SHORT_WINDOW: usize = 3;
pub const DEFAULT_LONG_WINDOW: usize = 5;
const SIDEWAYS_THRESHOLD: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Uptrend => write!(f, "uptrend"),
            Trend::Downtrend => write!(f, "downtrend"),
            Trend::Sideways => write!(f, "sideways"),
        }
    }
}

/// Compares the short and long simple moving averages at the last close.
pub fn detect_trend(closes: &[f64], short: usize, long: usize) -> Result<Trend, ConfluenceError> {
    if short == 0 || short >= long {
        return Err(ConfluenceError::invalid_input(format!(
            "trend windows must satisfy 0 < short < long, got {} and {}",
            short, long
        )));
    }
    if closes.len() < long {
        return Err(ConfluenceError::insufficient(
            "trend detection",
            closes.len(),
            long,
        ));
    }

    let last = |period| rolling_mean(closes, period).last().copied().flatten();
    let (Some(short_ma), Some(long_ma)) = (last(short), last(long)) else {
        return Err(ConfluenceError::insufficient("trend detection", closes.len(), long));
    };

    let diff = short_ma - long_ma;
    Ok(if diff > SIDEWAYS_THRESHOLD {
        Trend::Uptrend
    } else if diff < -SIDEWAYS_THRESHOLD {
        Trend::Downtrend
    } else {
        Trend::Sideways
    })
}
