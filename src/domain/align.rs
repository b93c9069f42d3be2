//! Timeframe aligner: inner-joins per-timeframe feature tables on timestamp.

use crate::domain::error::ConfluenceError;
use crate::domain::features::{FeatureRow, FEATURE_NAMES};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub timestamp: NaiveDateTime,
    pub values: Vec<f64>,
}

/// Wide table of features from every timeframe. Column `j` of every row is
/// named `columns[j]`, i.e. `<timeframe>_<feature>`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    pub columns: Vec<String>,
    pub rows: Vec<AlignedRow>,
}

impl AlignedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

pub fn column_name(timeframe: &str, feature: &str) -> String {
    format!("{}_{}", timeframe, feature)
}

/// Keeps only timestamps present in every table. Rows come out in the order
/// of the first table, which is chronological for validated input.
pub fn align(tables: &[(String, Vec<FeatureRow>)]) -> Result<AlignedTable, ConfluenceError> {
    let (first_tf, first_rows) = tables
        .first()
        .ok_or_else(|| ConfluenceError::invalid_input("no timeframes to align"))?;

    let mut seen = HashSet::new();
    for (tf, _) in tables {
        if !seen.insert(tf.as_str()) {
            return Err(ConfluenceError::invalid_input(format!(
                "duplicate timeframe '{}'",
                tf
            )));
        }
    }

    let columns: Vec<String> = tables
        .iter()
        .flat_map(|(tf, _)| FEATURE_NAMES.iter().map(move |f| column_name(tf, f)))
        .collect();

    let indexes: Vec<HashMap<NaiveDateTime, &FeatureRow>> = tables[1..]
        .iter()
        .map(|(_, rows)| rows.iter().map(|r| (r.timestamp, r)).collect())
        .collect();

    let rows: Vec<AlignedRow> = first_rows
        .iter()
        .filter_map(|row| {
            let mut values = Vec::with_capacity(columns.len());
            values.extend(row.values());
            for index in &indexes {
                values.extend(index.get(&row.timestamp)?.values());
            }
            Some(AlignedRow {
                timestamp: row.timestamp,
                values,
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(ConfluenceError::EmptyAlignment {
            timeframes: tables.iter().map(|(tf, _)| tf.clone()).collect(),
        });
    }

    tracing::debug!(
        finest = %first_tf,
        timeframes = tables.len(),
        rows = rows.len(),
        "aligned timeframes"
    );

    Ok(AlignedTable { columns, rows })
}
