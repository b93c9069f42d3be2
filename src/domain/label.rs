//! Labeler: attaches the next-period direction of the finest timeframe.

use crate::domain::align::{column_name, AlignedTable};
use crate::domain::error::ConfluenceError;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub timestamp: NaiveDateTime,
    pub features: Vec<f64>,
    /// 1 when the finest timeframe's next return is strictly positive.
    pub target: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    pub columns: Vec<String>,
    pub rows: Vec<LabeledRow>,
}

impl LabeledTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.rows.iter().filter(|r| r.target == 1).count()
    }
}

/// target[t] = 1 iff `<finest>_return` of row t+1 is > 0. The last row has
/// no successor and is dropped.
pub fn label(aligned: AlignedTable, finest_timeframe: &str) -> Result<LabeledTable, ConfluenceError> {
    let return_col = column_name(finest_timeframe, "return");
    let idx = aligned.column_index(&return_col).ok_or_else(|| {
        ConfluenceError::invalid_input(format!("aligned table has no column '{}'", return_col))
    })?;

    let next_returns: Vec<f64> = aligned.rows.iter().skip(1).map(|r| r.values[idx]).collect();

    let rows: Vec<LabeledRow> = aligned
        .rows
        .into_iter()
        .zip(next_returns)
        .map(|(row, next)| LabeledRow {
            timestamp: row.timestamp,
            features: row.values,
            target: u8::from(next > 0.0),
        })
        .collect();

    let table = LabeledTable {
        columns: aligned.columns,
        rows,
    };
    tracing::debug!(
        rows = table.len(),
        positives = table.positives(),
        "labeled rows"
    );
    Ok(table)
}
