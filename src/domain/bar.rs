//! Price bar representation.

use crate::domain::error::ConfluenceError;
use chrono::NaiveDateTime;

/// One open/high/low/close bar of a single timeframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    fn is_physical(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
            && self.high >= self.low
    }
}

/// Checks that every bar carries finite, strictly positive prices with
/// high >= low and that timestamps are strictly increasing.
pub fn validate_bars(bars: &[Bar]) -> Result<(), ConfluenceError> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.is_physical() {
            return Err(ConfluenceError::invalid_input(format!(
                "bar at {} has missing or non-physical prices",
                bar.timestamp
            )));
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(ConfluenceError::invalid_input(format!(
                "timestamps not strictly increasing at {}",
                bar.timestamp
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_bar() -> Bar {
        Bar {
            timestamp: ts(15),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
        }
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // |110-70| = 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar();
        // |90-130| = 40
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_accepts_ordered_bars() {
        let mut second = sample_bar();
        second.timestamp = ts(16);
        assert!(validate_bars(&[sample_bar(), second]).is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_timestamp() {
        let err = validate_bars(&[sample_bar(), sample_bar()]).unwrap_err();
        assert!(matches!(err, ConfluenceError::InvalidInput { .. }));
    }

    #[test]
    fn validate_rejects_nan_close() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(matches!(
            validate_bars(&[bar]),
            Err(ConfluenceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_and_negative_prices() {
        let mut zero = sample_bar();
        zero.low = 0.0;
        assert!(validate_bars(&[zero]).is_err());

        let negative = Bar {
            timestamp: ts(15),
            open: -5.0,
            high: -4.0,
            low: -6.0,
            close: -5.5,
        };
        assert!(matches!(
            validate_bars(&[negative]),
            Err(ConfluenceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let mut bar = sample_bar();
        bar.low = 120.0;
        assert!(validate_bars(&[bar]).is_err());
    }
}
