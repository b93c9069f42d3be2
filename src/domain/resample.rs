//! Aggregates bars into a coarser timeframe (e.g. 1h into 4h).
//!
//! Buckets start at multiples of the target duration counted from midnight
//! of the first bar's day, so periods that do not divide a day (e.g. 7h)
//! line up with the data rather than with the Unix epoch.
//! open = first, high = max, low = min, close = last. Empty buckets are
//! absent from the output.

use crate::domain::bar::{validate_bars, Bar};
use crate::domain::error::ConfluenceError;
use chrono::{Duration, NaiveDateTime, NaiveTime};

pub fn resample(bars: &[Bar], period: Duration) -> Result<Vec<Bar>, ConfluenceError> {
    let secs = period.num_seconds();
    if secs <= 0 {
        return Err(ConfluenceError::invalid_input(
            "resample period must be positive",
        ));
    }
    validate_bars(bars)?;
    let Some(first) = bars.first() else {
        return Ok(Vec::new());
    };
    let origin = first.timestamp.date().and_time(NaiveTime::MIN);

    let mut out: Vec<Bar> = Vec::new();
    for bar in bars {
        let start = bucket_start(bar.timestamp, origin, secs)?;
        match out.last_mut() {
            Some(current) if current.timestamp == start => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
            }
            _ => out.push(Bar {
                timestamp: start,
                ..*bar
            }),
        }
    }
    Ok(out)
}

fn bucket_start(
    timestamp: NaiveDateTime,
    origin: NaiveDateTime,
    secs: i64,
) -> Result<NaiveDateTime, ConfluenceError> {
    let elapsed = (timestamp - origin).num_seconds();
    let floored = elapsed.div_euclid(secs) * secs;
    Duration::try_seconds(floored)
        .and_then(|offset| origin.checked_add_signed(offset))
        .ok_or_else(|| ConfluenceError::invalid_input(format!("timestamp {} out of range", timestamp)))
}
