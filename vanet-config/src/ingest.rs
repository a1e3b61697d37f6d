//! Input discovery parameters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct IngestConfig {
    /// Sweep definition used to filter sweep-point directories.
    #[serde(default = "default_sweep_config")]
    pub sweep_config: PathBuf,

    /// Extension of tabular input files, without the dot.
    #[serde(default = "default_file_extension")]
    #[validate(custom(function = validation::validate_extension))]
    pub file_extension: String,

    /// Upper bound on runs analyzed concurrently.
    #[serde(default = "default_max_parallel_runs")]
    #[validate(range(min = 1, max = 4096))]
    pub max_parallel_runs: usize,
}

fn default_sweep_config() -> PathBuf {
    PathBuf::from("analysis/mode2_loss/sweep_config.yaml")
}

fn default_file_extension() -> String {
    "csv".into()
}

fn default_max_parallel_runs() -> usize {
    num_cpus::get()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sweep_config: default_sweep_config(),
            file_extension: default_file_extension(),
            max_parallel_runs: default_max_parallel_runs(),
        }
    }
}
