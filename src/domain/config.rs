//! Pipeline configuration and its validation.
//!
//! Values come from a [`ConfigPort`]; every field is checked before any bar
//! data is read.

use crate::domain::aggregator::LogisticConfig;
use crate::domain::error::ConfluenceError;
use crate::domain::features::{FeatureWindows, DEFAULT_LOOKBACK};
use crate::domain::money::DEFAULT_RISK_PERCENT;
use crate::domain::split::DEFAULT_TEST_SIZE;
use crate::ports::config_port::ConfigPort;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub symbol: String,
    /// First entry is the finest timeframe; it drives the label.
    pub timeframes: Vec<String>,
    pub data_path: PathBuf,
    pub windows: FeatureWindows,
    /// Compute per-timeframe features on the rayon pool.
    pub parallel: bool,
    pub test_size: usize,
    pub model: LogisticConfig,
    /// Percent of capital risked per position.
    pub risk_percent: f64,
}

impl PipelineConfig {
    pub fn new(symbol: impl Into<String>, timeframes: Vec<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframes,
            data_path: PathBuf::from("data"),
            windows: FeatureWindows::default(),
            parallel: true,
            test_size: DEFAULT_TEST_SIZE,
            model: LogisticConfig::default(),
            risk_percent: DEFAULT_RISK_PERCENT,
        }
    }

    pub fn finest_timeframe(&self) -> Option<&str> {
        self.timeframes.first().map(String::as_str)
    }
}

/// Splits a comma separated timeframe list, rejecting blanks and duplicates.
pub fn parse_timeframes(input: &str) -> Result<Vec<String>, ConfluenceError> {
    let mut timeframes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let tf = token.trim();
        if tf.is_empty() {
            return Err(invalid("data", "timeframes", "empty entry in timeframe list"));
        }
        if !seen.insert(tf.to_string()) {
            return Err(invalid(
                "data",
                "timeframes",
                &format!("duplicate timeframe {}", tf),
            ));
        }
        timeframes.push(tf.to_string());
    }

    Ok(timeframes)
}

pub fn build_pipeline_config(config: &dyn ConfigPort) -> Result<PipelineConfig, ConfluenceError> {
    let symbol = config
        .get_string("data", "symbol")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing("data", "symbol"))?;

    let timeframes = config
        .get_string("data", "timeframes")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| missing("data", "timeframes"))
        .and_then(|s| parse_timeframes(&s))?;

    let mut cfg = PipelineConfig::new(symbol, timeframes);

    if let Some(path) = config.get_string("data", "data_path") {
        cfg.data_path = PathBuf::from(path.trim());
    }

    let lookback = get_count(config, "features", "lookback_window", DEFAULT_LOOKBACK as i64)?;
    cfg.windows = FeatureWindows {
        moving_average: get_count(config, "features", "moving_average_window", lookback as i64)?,
        oscillator: get_count(config, "features", "oscillator_window", lookback as i64)?,
        volatility: get_count(config, "features", "volatility_window", lookback as i64)?,
    };

    cfg.parallel = config.get_bool("features", "parallel", true);

    cfg.test_size = get_count(config, "model", "test_size", DEFAULT_TEST_SIZE as i64)?;
    let defaults = LogisticConfig::default();
    cfg.model = LogisticConfig {
        c: config.get_double("model", "regularization", defaults.c),
        max_iter: get_count(config, "model", "max_iter", defaults.max_iter as i64)?,
        tolerance: config.get_double("model", "tolerance", defaults.tolerance),
    };
    cfg.risk_percent = config.get_double("risk", "risk_fraction", DEFAULT_RISK_PERCENT);

    validate_pipeline_config(&cfg)?;
    Ok(cfg)
}

/// Checks an assembled config, including one altered by CLI overrides.
pub fn validate_pipeline_config(cfg: &PipelineConfig) -> Result<(), ConfluenceError> {
    if cfg.symbol.trim().is_empty() {
        return Err(missing("data", "symbol"));
    }
    if cfg.timeframes.is_empty() {
        return Err(missing("data", "timeframes"));
    }
    let unique: HashSet<&String> = cfg.timeframes.iter().collect();
    if unique.len() != cfg.timeframes.len() {
        return Err(invalid("data", "timeframes", "timeframes must be unique"));
    }

    for (key, value) in [
        ("moving_average_window", cfg.windows.moving_average),
        ("oscillator_window", cfg.windows.oscillator),
        ("volatility_window", cfg.windows.volatility),
    ] {
        if value == 0 {
            return Err(invalid("features", key, "window must be at least 1"));
        }
    }

    if cfg.test_size == 0 {
        return Err(invalid("model", "test_size", "test_size must be at least 1"));
    }
    if cfg.model.max_iter == 0 {
        return Err(invalid("model", "max_iter", "max_iter must be at least 1"));
    }
    if !(cfg.model.c.is_finite() && cfg.model.c > 0.0) {
        return Err(invalid("model", "regularization", "regularization must be positive"));
    }
    if !(cfg.model.tolerance.is_finite() && cfg.model.tolerance > 0.0) {
        return Err(invalid("model", "tolerance", "tolerance must be positive"));
    }
    if !(cfg.risk_percent > 0.0 && cfg.risk_percent <= 100.0) {
        return Err(invalid(
            "risk",
            "risk_fraction",
            "risk_fraction must be in (0, 100] percent",
        ));
    }
    Ok(())
}

fn get_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<usize, ConfluenceError> {
    let value = config.get_int(section, key, default);
    usize::try_from(value).map_err(|_| invalid(section, key, "must not be negative"))
}

fn missing(section: &str, key: &str) -> ConfluenceError {
    ConfluenceError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> ConfluenceError {
    ConfluenceError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn load(content: &str) -> Result<PipelineConfig, ConfluenceError> {
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        build_pipeline_config(&adapter)
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = load("[data]\nsymbol = XAUUSD\ntimeframes = M1, M15, H1\n").unwrap();
        assert_eq!(cfg.symbol, "XAUUSD");
        assert_eq!(cfg.timeframes, vec!["M1", "M15", "H1"]);
        assert_eq!(cfg.finest_timeframe(), Some("M1"));
        assert_eq!(cfg.data_path, PathBuf::from("data"));
        assert_eq!(cfg.windows, FeatureWindows::uniform(14));
        assert!(cfg.parallel);
        assert_eq!(cfg.test_size, 100);
        assert_eq!(cfg.model.max_iter, 1000);
        assert_eq!(cfg.risk_percent, 1.0);
    }

    #[test]
    fn lookback_sets_all_windows_and_overrides_win() {
        let cfg = load(
            "[data]\nsymbol = X\ntimeframes = H1\n\
             [features]\nlookback_window = 10\noscillator_window = 7\nparallel = false\n",
        )
        .unwrap();
        assert_eq!(cfg.windows.moving_average, 10);
        assert_eq!(cfg.windows.oscillator, 7);
        assert_eq!(cfg.windows.volatility, 10);
        assert!(!cfg.parallel);
    }

    #[test]
    fn full_config() {
        let cfg = load(
            "[data]\nsymbol = EURUSD\ntimeframes = M5,H1\ndata_path = /tmp/bars\n\
             [model]\ntest_size = 50\nmax_iter = 200\nregularization = 0.5\n\
             [risk]\nrisk_fraction = 2.0\n",
        )
        .unwrap();
        assert_eq!(cfg.data_path, PathBuf::from("/tmp/bars"));
        assert_eq!(cfg.test_size, 50);
        assert_eq!(cfg.model.max_iter, 200);
        assert_eq!(cfg.model.c, 0.5);
        assert_eq!(cfg.risk_percent, 2.0);
    }

    #[test]
    fn missing_symbol() {
        let err = load("[data]\ntimeframes = H1\n").unwrap_err();
        assert!(matches!(err, ConfluenceError::ConfigMissing { ref key, .. } if key == "symbol"));
    }

    #[test]
    fn missing_timeframes() {
        let err = load("[data]\nsymbol = X\n").unwrap_err();
        assert!(matches!(err, ConfluenceError::ConfigMissing { ref key, .. } if key == "timeframes"));
    }

    #[test]
    fn duplicate_timeframes() {
        let err = load("[data]\nsymbol = X\ntimeframes = H1,M1,H1\n").unwrap_err();
        assert!(matches!(err, ConfluenceError::ConfigInvalid { .. }));
    }

    #[test]
    fn zero_window_rejected() {
        let err = load("[data]\nsymbol = X\ntimeframes = H1\n[features]\nvolatility_window = 0\n")
            .unwrap_err();
        assert!(matches!(err, ConfluenceError::ConfigInvalid { ref key, .. } if key == "volatility_window"));
    }

    #[test]
    fn negative_test_size_rejected() {
        let err = load("[data]\nsymbol = X\ntimeframes = H1\n[model]\ntest_size = -5\n").unwrap_err();
        assert!(matches!(err, ConfluenceError::ConfigInvalid { ref key, .. } if key == "test_size"));
    }

    #[test]
    fn risk_fraction_bounds() {
        let err = load("[data]\nsymbol = X\ntimeframes = H1\n[risk]\nrisk_fraction = 0\n").unwrap_err();
        assert!(matches!(err, ConfluenceError::ConfigInvalid { ref section, .. } if section == "risk"));
    }

    #[test]
    fn parse_timeframes_rejects_blank_entry() {
        assert!(parse_timeframes("M1,,H1").is_err());
        assert_eq!(parse_timeframes(" M1 ,H1").unwrap(), vec!["M1", "H1"]);
    }
}
