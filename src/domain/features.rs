//! Feature engine: turns one bar series into a table of indicator rows.

use crate::domain::bar::{validate_bars, Bar};
use crate::domain::error::ConfluenceError;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::returns::calculate_returns;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use chrono::NaiveDateTime;
use rayon::prelude::*;
use tracing::debug;

/// Column names of a feature row, in the order `FeatureRow::values` emits them.
pub const FEATURE_NAMES: [&str; 4] = ["return", "moving_average", "oscillator", "volatility_range"];

pub const DEFAULT_LOOKBACK: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureWindows {
    pub moving_average: usize,
    pub oscillator: usize,
    pub volatility: usize,
}

impl FeatureWindows {
    pub fn uniform(window: usize) -> Self {
        Self {
            moving_average: window,
            oscillator: window,
            volatility: window,
        }
    }

    /// Bars needed before every feature is defined.
    pub fn required_bars(&self) -> usize {
        2.max(self.moving_average)
            .max(self.oscillator)
            .max(self.volatility)
    }

    fn validate(&self) -> Result<(), ConfluenceError> {
        for (name, w) in [
            ("moving_average", self.moving_average),
            ("oscillator", self.oscillator),
            ("volatility", self.volatility),
        ] {
            if w == 0 {
                return Err(ConfluenceError::invalid_input(format!(
                    "{} window must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl Default for FeatureWindows {
    fn default() -> Self {
        Self::uniform(DEFAULT_LOOKBACK)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub timestamp: NaiveDateTime,
    pub ret: f64,
    pub moving_average: f64,
    /// Bounded to [0, 100].
    pub oscillator: f64,
    /// Never negative.
    pub volatility_range: f64,
}

impl FeatureRow {
    pub fn values(&self) -> [f64; 4] {
        [
            self.ret,
            self.moving_average,
            self.oscillator,
            self.volatility_range,
        ]
    }
}

/// Computes the feature table for one timeframe.
///
/// Leading rows whose indicators are still warming up are dropped, so the
/// first row is the first bar with every field defined.
pub fn compute_features(
    bars: &[Bar],
    windows: &FeatureWindows,
) -> Result<Vec<FeatureRow>, ConfluenceError> {
    windows.validate()?;
    validate_bars(bars)?;

    let required = windows.required_bars();
    if bars.len() < required {
        return Err(ConfluenceError::insufficient(
            "feature lookback",
            bars.len(),
            required,
        ));
    }

    let returns = calculate_returns(bars);
    let sma = calculate_sma(bars, windows.moving_average);
    let rsi = calculate_rsi(bars, windows.oscillator);
    let atr = calculate_atr(bars, windows.volatility);

    let rows: Vec<FeatureRow> = (0..bars.len())
        .filter(|&i| {
            returns.values[i].valid && sma.values[i].valid && rsi.values[i].valid && atr.values[i].valid
        })
        .map(|i| FeatureRow {
            timestamp: bars[i].timestamp,
            ret: returns.values[i].value,
            moving_average: sma.values[i].value,
            oscillator: rsi.values[i].value,
            volatility_range: atr.values[i].value,
        })
        .collect();

    if rows.is_empty() {
        return Err(ConfluenceError::insufficient(
            "feature lookback",
            bars.len(),
            required,
        ));
    }

    Ok(rows)
}

/// Computes feature tables for every timeframe, fanned out over the rayon
/// pool when `parallel` is set.
///
/// Output order matches input order. The first failing timeframe aborts the
/// whole stage.
pub fn compute_all_features(
    inputs: &[(String, Vec<Bar>)],
    windows: &FeatureWindows,
    parallel: bool,
) -> Result<Vec<(String, Vec<FeatureRow>)>, ConfluenceError> {
    let compute = |(timeframe, bars): &(String, Vec<Bar>)| -> Result<_, ConfluenceError> {
        let rows = compute_features(bars, windows)?;
        debug!(
            timeframe = %timeframe,
            bars = bars.len(),
            rows = rows.len(),
            "computed features"
        );
        Ok((timeframe.clone(), rows))
    };

    if parallel {
        inputs.par_iter().map(compute).collect()
    } else {
        inputs.iter().map(compute).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{make_bars, ts};

    fn wavy_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.7).sin() * 5.0;
                Bar {
                    timestamp: ts(i),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.5,
                    close,
                }
            })
            .collect()
    }

    #[test]
    fn drops_warmup_rows() {
        let bars = wavy_bars(30);
        let rows = compute_features(&bars, &FeatureWindows::default()).unwrap();
        // warmup = max(1, 13, 13) = 13
        assert_eq!(rows.len(), 17);
        assert_eq!(rows[0].timestamp, bars[13].timestamp);
        assert_eq!(rows.last().unwrap().timestamp, bars[29].timestamp);
    }

    #[test]
    fn independent_windows_set_warmup() {
        let bars = wavy_bars(30);
        let windows = FeatureWindows {
            moving_average: 5,
            oscillator: 14,
            volatility: 10,
        };
        let rows = compute_features(&bars, &windows).unwrap();
        assert_eq!(rows[0].timestamp, bars[9].timestamp);
    }

    #[test]
    fn window_of_one_still_needs_a_return() {
        let bars = wavy_bars(5);
        let rows = compute_features(&bars, &FeatureWindows::uniform(1)).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].timestamp, bars[1].timestamp);
    }

    #[test]
    fn too_few_bars_is_insufficient_data() {
        let bars = wavy_bars(13);
        let err = compute_features(&bars, &FeatureWindows::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfluenceError::InsufficientData {
                available: 13,
                required: 14,
                ..
            }
        ));
    }

    #[test]
    fn zero_window_is_invalid() {
        let bars = wavy_bars(30);
        let windows = FeatureWindows {
            moving_average: 0,
            ..FeatureWindows::default()
        };
        assert!(matches!(
            compute_features(&bars, &windows),
            Err(ConfluenceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn missing_price_is_invalid_input() {
        let mut bars = wavy_bars(30);
        bars[10].high = f64::NAN;
        assert!(matches!(
            compute_features(&bars, &FeatureWindows::default()),
            Err(ConfluenceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn zero_close_is_invalid_input() {
        let mut bars = wavy_bars(30);
        bars[20].close = 0.0;
        assert!(matches!(
            compute_features(&bars, &FeatureWindows::default()),
            Err(ConfluenceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn negative_prices_are_invalid_input() {
        let closes: Vec<f64> = (0..30).map(|i| -100.0 - i as f64).collect();
        assert!(matches!(
            compute_features(&make_bars(&closes), &FeatureWindows::default()),
            Err(ConfluenceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn field_values_match_indicators() {
        let closes: Vec<f64> = (1..=5).map(|i| i as f64).collect();
        let rows = compute_features(&make_bars(&closes), &FeatureWindows::uniform(3)).unwrap();
        let last = rows.last().unwrap();
        assert!((last.ret - 0.25).abs() < 1e-12);
        assert!((last.moving_average - 4.0).abs() < 1e-12);
        assert!((last.oscillator - 100.0).abs() < 1e-12);
        // flat bars: TR = |close - prev_close| = 1
        assert!((last.volatility_range - 1.0).abs() < 1e-12);
    }

    #[test]
    fn all_features_keeps_order() {
        let inputs = vec![
            ("M1".to_string(), wavy_bars(40)),
            ("M15".to_string(), wavy_bars(30)),
            ("H1".to_string(), wavy_bars(20)),
        ];
        let out = compute_all_features(&inputs, &FeatureWindows::default(), true).unwrap();
        let names: Vec<&str> = out.iter().map(|(tf, _)| tf.as_str()).collect();
        assert_eq!(names, vec!["M1", "M15", "H1"]);
        assert_eq!(out[2].1.len(), 7);
    }

    #[test]
    fn sequential_matches_parallel() {
        let inputs = vec![
            ("M1".to_string(), wavy_bars(40)),
            ("H1".to_string(), wavy_bars(25)),
        ];
        let windows = FeatureWindows::default();
        assert_eq!(
            compute_all_features(&inputs, &windows, false).unwrap(),
            compute_all_features(&inputs, &windows, true).unwrap()
        );
    }

    #[test]
    fn all_features_propagates_failure() {
        let inputs = vec![
            ("M1".to_string(), wavy_bars(40)),
            ("H1".to_string(), wavy_bars(5)),
        ];
        assert!(matches!(
            compute_all_features(&inputs, &FeatureWindows::default(), true),
            Err(ConfluenceError::InsufficientData { .. })
        ));
    }
}
