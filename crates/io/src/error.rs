use std::path::PathBuf;

use thiserror::Error;

pub type IoResult<T> = Result<T, IoError>;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Workbook open/read/write failure (calamine or rust_xlsxwriter).
    #[error("workbook error: {0}")]
    Workbook(String),

    #[error("sheet '{sheet}' not found (available: {})", available.join(", "))]
    SheetNotFound { sheet: String, available: Vec<String> },

    #[error("{source_name}: missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    /// Writing would drop rows that were read but not kept in the table.
    #[error("{}: duplicate rows for {} would be lost on write; remove them first", path.display(), ecus.join(", "))]
    DuplicateRows { path: PathBuf, ecus: Vec<String> },

    #[error("{0}")]
    Unsupported(String),
}
