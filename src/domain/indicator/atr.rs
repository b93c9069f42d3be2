//! Average True Range as a plain rolling mean of true range.
//!
//! TR[0] = H[0] - L[0]; TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|)
//! ATR(n)[i] = mean(TR[i-n+1..=i])
//! Warmup: first (n-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::indicator::sma::rolling_mean;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let values = rolling_mean(&tr_values, period)
        .into_iter()
        .zip(bars)
        .map(|(mean, bar)| match mean {
            Some(v) => IndicatorPoint::valid(bar.timestamp, v),
            None => IndicatorPoint::invalid(bar.timestamp),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
