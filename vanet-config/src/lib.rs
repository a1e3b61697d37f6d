//! # Vanet Configuration System
//!
//! Layered configuration for the telemetry analysis pipeline.
//!
//! ## Features
//! - **Single source of truth**: every metric threshold lives in one validated tree
//! - **Layering**: defaults, YAML files and `VANET_*` environment variables
//! - **Sweep definitions**: parsing of parameter-sweep YAML into point ids

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod behavior;
mod comm;
mod error;
mod ingest;
mod risk;
pub mod sweep;
mod telemetry;
mod validation;

pub use behavior::BehaviorConfig;
pub use comm::{CommConfig, ReactionConfig};
pub use error::ConfigError;
pub use ingest::IngestConfig;
pub use risk::RiskConfig;
pub use sweep::{SweepConfig, SweepPoint};
pub use telemetry::TelemetryConfig;

/// Top-level configuration container for all analysis stages.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Braking, stop and jerk detection thresholds.
    #[validate(nested)]
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// Reliability metric parameters.
    #[validate(nested)]
    #[serde(default)]
    pub comm: CommConfig,

    /// Emergency reaction parameters.
    #[validate(nested)]
    #[serde(default)]
    pub reaction: ReactionConfig,

    /// Collision-risk thresholds.
    #[validate(nested)]
    #[serde(default)]
    pub risk: RiskConfig,

    /// Input discovery and parallelism.
    #[validate(nested)]
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Logging and metrics output.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AnalysisConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/vanet.yaml` - Base settings. If missing, defaults are used.
    /// 3. `config/<VANET_ENV>.yaml` - Environment-specific overrides.
    /// 4. `VANET_*` environment variables (`__` separates sections).
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(AnalysisConfig::default()));

        if Path::new("config/vanet.yaml").exists() {
            figment = figment.merge(Yaml::file("config/vanet.yaml"));
        }

        let env = std::env::var("VANET_ENV").unwrap_or_else(|_| "default".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::finish(figment)
    }

    /// Load configuration from a specific file on top of the defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment =
            Figment::from(Serialized::defaults(AnalysisConfig::default())).merge(Yaml::file(path));
        Self::finish(figment)
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed("VANET_").ignore(&["ENV"]).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn full_config_validation() {
        let config = AnalysisConfig::default();
        config.validate().expect("Default config should validate");
        assert_eq!(config.behavior.brake_decel_mps2, -2.0);
        assert_eq!(config.reaction.emergency_tx_id, 2);
        assert_eq!(config.risk.ttc_threshold_s, 1.5);
        assert!(config.ingest.max_parallel_runs >= 1);
    }

    #[test]
    fn environment_override() {
        std::env::set_var("VANET_RISK__GAP_THRESHOLD_M", "3.5");
        let config = AnalysisConfig::load().unwrap();
        std::env::remove_var("VANET_RISK__GAP_THRESHOLD_M");
        assert_eq!(config.risk.gap_threshold_m, 3.5);
    }

    #[test]
    fn file_overrides_defaults_partially() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "reaction:\n  emergency_tx_id: 7\ncomm:\n  latency_max_s: 5.0").unwrap();
        let config = AnalysisConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.reaction.emergency_tx_id, 7);
        assert_eq!(config.comm.latency_max_s, 5.0);
        assert_eq!(config.behavior, BehaviorConfig::default());
    }

    #[test]
    fn rejects_positive_brake_threshold() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "behavior:\n  brake_decel_mps2: 1.0").unwrap();
        let err = AnalysisConfig::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = AnalysisConfig::load_from_path("/no/such/vanet.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
