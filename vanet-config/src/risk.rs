//! Collision-risk thresholds.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

#[derive(Debug, Serialize, Deserialize, Validate, Clone, Copy, PartialEq)]
pub struct RiskConfig {
    /// Same-lane bumper gap below which a pair is counted as risky (m).
    #[serde(default = "default_gap_threshold")]
    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub gap_threshold_m: f64,

    /// Time-to-collision below which a closing pair is counted as risky (s).
    #[serde(default = "default_ttc_threshold")]
    #[validate(range(exclusive_min = 0.0, max = 600.0))]
    pub ttc_threshold_s: f64,
}

fn default_gap_threshold() -> f64 {
    2.0
}
fn default_ttc_threshold() -> f64 {
    1.5
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            gap_threshold_m: default_gap_threshold(),
            ttc_threshold_s: default_ttc_threshold(),
        }
    }
}
