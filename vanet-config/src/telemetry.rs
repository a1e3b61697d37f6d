//! Observability configuration.
//!
//! Parameters for instrumentation:
//! - Log verbosity (overridden by `RUST_LOG`)
//! - Optional Prometheus text dump after each command

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Default tracing level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    #[validate(custom(function = validation::validate_log_level))]
    pub log_level: String,

    /// Where to write the metrics exposition, if anywhere.
    #[serde(default)]
    pub metrics_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_file: None,
        }
    }
}
