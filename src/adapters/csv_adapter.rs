//! CSV file bar source.
//!
//! Reads `<base_path>/<symbol>_<timeframe>.csv`. Columns are matched by header
//! name, case-insensitively; unknown columns such as volume are ignored.

use crate::domain::bar::{validate_bars, Bar};
use crate::domain::error::ConfluenceError;
use crate::ports::data_port::BarSource;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const TIMESTAMP_HEADERS: [&str; 3] = ["date", "datetime", "timestamp"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub struct CsvBarSource {
    base_path: PathBuf,
}

impl CsvBarSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, timeframe))
    }
}

impl BarSource for CsvBarSource {
    fn fetch_bars(&self, symbol: &str, timeframe: &str) -> Result<Vec<Bar>, ConfluenceError> {
        let path = self.csv_path(symbol, timeframe);
        let file = File::open(&path).map_err(|e| ConfluenceError::DataUnavailable {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            reason: format!("failed to open {}: {}", path.display(), e),
        })?;
        read_bars(file)
    }
}

/// Reads a bar CSV from disk.
pub fn read_bars_file(path: &Path) -> Result<Vec<Bar>, ConfluenceError> {
    let file = File::open(path)?;
    read_bars(file)
}

/// Parses and validates a bar table from any reader.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, ConfluenceError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| ConfluenceError::invalid_input(format!("CSV header error: {}", e)))?
        .clone();
    let find = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let require = |name: &'static str, idx: Option<usize>| {
        idx.ok_or_else(|| ConfluenceError::invalid_input(format!("missing {} column", name)))
    };

    let ts_idx = require("date", find(&TIMESTAMP_HEADERS[..]))?;
    let open_idx = require("open", find(&["open"][..]))?;
    let high_idx = require("high", find(&["high"][..]))?;
    let low_idx = require("low", find(&["low"][..]))?;
    let close_idx = require("close", find(&["close"][..]))?;

    let mut bars = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result
            .map_err(|e| ConfluenceError::invalid_input(format!("CSV parse error: {}", e)))?;
        let row = line + 2;

        let field = |idx: usize, name: &str| {
            record
                .get(idx)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ConfluenceError::invalid_input(format!("row {}: missing {}", row, name)))
        };
        let price = |idx: usize, name: &str| -> Result<f64, ConfluenceError> {
            field(idx, name)?.parse::<f64>().map_err(|e| {
                ConfluenceError::invalid_input(format!("row {}: invalid {} value: {}", row, name, e))
            })
        };

        bars.push(Bar {
            timestamp: parse_timestamp(field(ts_idx, "date")?).ok_or_else(|| {
                ConfluenceError::invalid_input(format!("row {}: invalid timestamp", row))
            })?,
            open: price(open_idx, "open")?,
            high: price(high_idx, "high")?,
            low: price(low_idx, "low")?,
            close: price(close_idx, "close")?,
        });
    }

    validate_bars(&bars)?;
    Ok(bars)
}

/// Writes bars with a `date,open,high,low,close` header.
pub fn write_bars(path: &Path, bars: &[Bar]) -> Result<(), ConfluenceError> {
    let mut wtr = csv::Writer::from_path(path).map_err(csv_io)?;
    wtr.write_record(["date", "open", "high", "low", "close"])
        .map_err(csv_io)?;
    for bar in bars {
        wtr.write_record([
            bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
        ])
        .map_err(csv_io)?;
    }
    wtr.flush()?;
    Ok(())
}

fn csv_io(e: csv::Error) -> ConfluenceError {
    ConfluenceError::Io(std::io::Error::other(e))
}

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
