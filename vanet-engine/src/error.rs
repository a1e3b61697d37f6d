use std::path::PathBuf;

use thiserror::Error;
use tokio::task::JoinError;
use vanet_ingest::IngestError;
use vanet_risk::RiskError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("input not found: {0}")]
    MissingInput(PathBuf),

    #[error("ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("collision-risk analysis failed: {0}")]
    Risk(#[from] RiskError),

    #[error("cannot write table: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid log pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("run scheduler closed: {0}")]
    Scheduler(#[from] tokio::sync::AcquireError),

    #[error("analysis task failed: {0}")]
    Join(#[from] JoinError),
}
