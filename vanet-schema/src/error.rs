use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading an input table.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("cannot open table {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}
