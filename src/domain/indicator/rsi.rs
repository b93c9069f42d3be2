//! RSI (Relative Strength Index) with exponential smoothing.
//!
//! Average gain/loss follow the recursive exponential average with
//! alpha = 1/n (centre of mass n-1), seeded with the first price change:
//! - avg[1] = x[1]
//! - avg[i] = (1 - alpha) * avg[i-1] + alpha * x[i]
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: the first bar is invalid (no price change yet).

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: bars
                .iter()
                .map(|b| IndicatorPoint::invalid(b.timestamp))
                .collect(),
        };
    }

    let alpha = 1.0 / period as f64;
    let mut values = Vec::with_capacity(bars.len());
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            values.push(IndicatorPoint::invalid(bar.timestamp));
            continue;
        }

        let change = bar.close - bars[i - 1].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if i == 1 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain = (1.0 - alpha) * avg_gain + alpha * gain;
            avg_loss = (1.0 - alpha) * avg_loss + alpha * loss;
        }

        values.push(IndicatorPoint::valid(
            bar.timestamp,
            rsi_from_averages(avg_gain, avg_loss),
        ));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn rsi_empty_bars() {
        assert!(calculate_rsi(&[], 14).values.is_empty());
    }

    #[test]
    fn rsi_first_bar_invalid() {
        let series = calculate_rsi(&make_bars(&[100.0, 101.0]), 14);
        assert!(!series.values[0].valid);
        assert!(series.values[1].valid);
    }

    #[test]
    fn rsi_all_gains_saturates() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&make_bars(&closes), 14);
        for point in series.values.iter().skip(1) {
            assert!((point.value - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&make_bars(&closes), 14);
        let last = series.values.last().unwrap();
        assert!(last.value.abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_flat_series_saturates() {
        let series = calculate_rsi(&make_bars(&[50.0; 10]), 14);
        assert!((series.values[9].value - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_exponential_recursion() {
        // period 2 => alpha 0.5
        // i=1: gain 1, loss 0 -> 100
        // i=2: avg_gain 0.5, avg_loss 0.5 -> 50
        // i=3: avg_gain 0.25 + 1.0 = 1.25, avg_loss 0.25 -> 100 - 100/6
        let series = calculate_rsi(&make_bars(&[1.0, 2.0, 1.0, 3.0]), 2);
        assert!((series.values[1].value - 100.0).abs() < 1e-12);
        assert!((series.values[2].value - 50.0).abs() < 1e-12);
        assert!((series.values[3].value - (100.0 - 100.0 / 6.0)).abs() < 1e-12);
    }

    #[test]
    fn rsi_in_range() {
        let closes: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&make_bars(&closes), 14);
        for point in series.values.iter().filter(|p| p.valid) {
            assert!((0.0..=100.0).contains(&point.value), "RSI {} out of range", point.value);
        }
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&make_bars(&[100.0, 101.0]), 0);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
