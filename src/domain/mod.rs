//! Core domain types and logic.

pub mod aggregator;
pub mod align;
pub mod bar;
pub mod config;
pub mod error;
pub mod features;
pub mod indicator;
pub mod label;
pub mod money;
pub mod pipeline;
pub mod resample;
pub mod signal;
pub mod split;
pub mod timeframe;
pub mod trend;
