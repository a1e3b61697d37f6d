//! Communication and reaction metric parameters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Parameters of the reliability engine.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct CommConfig {
    /// Upper (exclusive) bound of an accepted tx→rx latency (s).
    #[serde(default = "default_latency_max")]
    #[validate(range(exclusive_min = 0.0, max = 3600.0))]
    pub latency_max_s: f64,
}

fn default_latency_max() -> f64 {
    10.0
}

impl Default for CommConfig {
    fn default() -> Self {
        Self {
            latency_max_s: default_latency_max(),
        }
    }
}

/// Parameters of the reaction-delay engine.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct ReactionConfig {
    /// Station id of the emergency vehicle whose alerts start the clock.
    #[serde(default = "default_emergency_tx_id")]
    pub emergency_tx_id: u32,
}

fn default_emergency_tx_id() -> u32 {
    2
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            emergency_tx_id: default_emergency_tx_id(),
        }
    }
}
