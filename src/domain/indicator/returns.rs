//! Simple one-period return: R[i] = C[i] / C[i-1] - 1.
//! Warmup: the first bar is invalid.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_returns(bars: &[Bar]) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                IndicatorPoint::invalid(bar.timestamp)
            } else {
                IndicatorPoint::valid(bar.timestamp, bar.close / bars[i - 1].close - 1.0)
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Return,
        values,
    }
}
