//! Chronological train/test split.

use crate::domain::error::ConfluenceError;
use crate::domain::label::{LabeledRow, LabeledTable};

pub const DEFAULT_TEST_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct Split {
    pub columns: Vec<String>,
    pub train: Vec<LabeledRow>,
    pub test: Vec<LabeledRow>,
}

/// `test` is the last `test_size` rows, `train` everything before them.
pub fn split(labeled: LabeledTable, test_size: usize) -> Result<Split, ConfluenceError> {
    if test_size == 0 {
        return Err(ConfluenceError::invalid_input("test size must be at least 1"));
    }
    if labeled.len() <= test_size {
        return Err(ConfluenceError::insufficient(
            "train/test split",
            labeled.len(),
            test_size + 1,
        ));
    }

    let LabeledTable { columns, mut rows } = labeled;
    let test = rows.split_off(rows.len() - test_size);

    tracing::info!(train = rows.len(), test = test.len(), "split labeled rows");

    Ok(Split {
        columns,
        train: rows,
        test,
    })
}
