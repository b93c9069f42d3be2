#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
pub use confluence::domain::bar::Bar;
use confluence::domain::error::ConfluenceError;
use confluence::ports::data_port::BarSource;
use std::collections::HashMap;
use std::io::Write;

/// In-memory bar source keyed by timeframe.
pub struct MockBarSource {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockBarSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, timeframe: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(timeframe.to_string(), bars);
        self
    }

    pub fn with_error(mut self, timeframe: &str, reason: &str) -> Self {
        self.errors.insert(timeframe.to_string(), reason.to_string());
        self
    }
}

impl BarSource for MockBarSource {
    fn fetch_bars(&self, symbol: &str, timeframe: &str) -> Result<Vec<Bar>, ConfluenceError> {
        if let Some(reason) = self.errors.get(timeframe) {
            return Err(ConfluenceError::DataUnavailable {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(timeframe).cloned().unwrap_or_default())
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(timestamp: NaiveDateTime, close: f64) -> Bar {
    Bar {
        timestamp,
        open: close - 0.3,
        high: close + 0.7,
        low: close - 0.8,
        close,
    }
}

/// `n` bars spaced `step_minutes` apart with a deterministic oscillating close.
pub fn wavy_bars(n: usize, step_minutes: i64) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + (x * 0.9).sin() * 3.0 + (x * 0.21).cos() * 1.5;
            make_bar(start() + Duration::minutes(step_minutes * i as i64), close)
        })
        .collect()
}

pub fn bars_from_closes(closes: &[f64], step_minutes: i64) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(start() + Duration::minutes(step_minutes * i as i64), c))
        .collect()
}

pub fn write_bar_csv(path: &std::path::Path, bars: &[Bar]) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "Date,Open,High,Low,Close,Volume").unwrap();
    for bar in bars {
        writeln!(
            file,
            "{},{},{},{},{},1000",
            bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
            bar.open,
            bar.high,
            bar.low,
            bar.close
        )
        .unwrap();
    }
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
