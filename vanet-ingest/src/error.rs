use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The top-level input does not exist.
    #[error("input path does not exist: {0}")]
    MissingInput(PathBuf),

    #[error("cannot walk input tree: {0}")]
    Walk(#[from] walkdir::Error),
}
