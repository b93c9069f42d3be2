//! End-to-end workflow: bars -> features -> alignment -> labels -> split ->
//! classifier -> per-row probabilities.

use crate::domain::aggregator::{Aggregator, LogisticRegression, PredictionRow};
use crate::domain::align::align;
use crate::domain::bar::Bar;
use crate::domain::config::{validate_pipeline_config, PipelineConfig};
use crate::domain::error::ConfluenceError;
use crate::domain::features::compute_all_features;
use crate::domain::label::label;
use crate::domain::money::MoneyManager;
use crate::domain::split::split;
use crate::ports::data_port::BarSource;
use tracing::info;

/// Loads every configured timeframe from `source` and runs the pipeline.
pub fn run_workflow(
    cfg: &PipelineConfig,
    source: &dyn BarSource,
) -> Result<Vec<PredictionRow>, ConfluenceError> {
    validate_pipeline_config(cfg)?;

    let mut inputs: Vec<(String, Vec<Bar>)> = Vec::with_capacity(cfg.timeframes.len());
    for tf in &cfg.timeframes {
        let bars = source.fetch_bars(&cfg.symbol, tf)?;
        info!(symbol = %cfg.symbol, timeframe = %tf, bars = bars.len(), "loaded bars");
        inputs.push((tf.clone(), bars));
    }

    predict_from_bars(cfg, &inputs)
}

/// Runs the pipeline on bars that are already loaded, in configured order.
pub fn predict_from_bars(
    cfg: &PipelineConfig,
    inputs: &[(String, Vec<Bar>)],
) -> Result<Vec<PredictionRow>, ConfluenceError> {
    let finest = inputs
        .first()
        .map(|(tf, _)| tf.clone())
        .ok_or_else(|| ConfluenceError::invalid_input("no timeframes supplied"))?;

    let features = compute_all_features(inputs, &cfg.windows, cfg.parallel)?;
    let aligned = align(&features)?;
    info!(rows = aligned.len(), columns = aligned.columns.len(), "aligned features");

    let labeled = label(aligned, &finest)?;
    let split = split(labeled, cfg.test_size)?;

    let mut aggregator = Aggregator::new(LogisticRegression::new(cfg.model));
    aggregator.train(&split.train)?;
    let predictions = aggregator.predict(&split.test)?;

    info!(predictions = predictions.len(), "scored test rows");
    Ok(predictions)
}

/// Sizing rule configured with the pipeline's risk fraction.
pub fn money_manager(cfg: &PipelineConfig) -> Result<MoneyManager, ConfluenceError> {
    MoneyManager::new(cfg.risk_percent)
}
