//! Last-candle direction signal with symmetric stop and target.

use crate::domain::bar::Bar;
use crate::domain::error::ConfluenceError;
use std::fmt;

pub const DEFAULT_OFFSET: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "Buy"),
            Direction::Sell => write!(f, "Sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleSignal {
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
}

/// Buy when the last candle closed above its open, otherwise sell. Stop and
/// target sit `offset` (a fraction) away from the close, rounded to cents.
pub fn candle_signal(bars: &[Bar], offset: f64) -> Result<CandleSignal, ConfluenceError> {
    if !(offset.is_finite() && offset > 0.0 && offset < 1.0) {
        return Err(ConfluenceError::invalid_input(format!(
            "signal offset must be in (0, 1), got {}",
            offset
        )));
    }
    let last = bars
        .last()
        .ok_or_else(|| ConfluenceError::insufficient("candle signal", 0, 1))?;

    let price = last.close;
    let (direction, stop, target) = if last.close > last.open {
        (Direction::Buy, price * (1.0 - offset), price * (1.0 + offset))
    } else {
        (Direction::Sell, price * (1.0 + offset), price * (1.0 - offset))
    };

    Ok(CandleSignal {
        direction,
        entry: price,
        stop: round_cents(stop),
        target: round_cents(target),
    })
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
