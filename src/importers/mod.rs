//! CSV importers. Rows are validated and inserted independently; a batch
//! commits when at least one row made it in, and rolls back entirely
//! when every row failed.

pub mod degiro;
pub mod snapshot_csv;

use serde::Serialize;

pub use degiro::import_degiro_csv;
pub use snapshot_csv::import_snapshot_csv;

/// One rejected CSV row.
#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub message: String,
}

/// Outcome of one import batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub successes: usize,
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn reject(&mut self, row: usize, message: impl Into<String>) {
        self.failures.push(ImportFailure {
            row,
            message: message.into(),
        });
    }

    /// True when the batch was rolled back (nothing inserted).
    pub fn rolled_back(&self) -> bool {
        self.successes == 0
    }
}
