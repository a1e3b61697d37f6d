//! Driving-behavior detection thresholds.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Thresholds used by the per-vehicle behavior engine.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct BehaviorConfig {
    /// Longitudinal acceleration at or below which a sample counts as braking (m/s²).
    #[serde(default = "default_brake_decel")]
    #[validate(range(min = -20.0, exclusive_max = 0.0))]
    pub brake_decel_mps2: f64,

    /// Minimum time extent of a deceleration run to count as a brake (s).
    #[serde(default = "default_brake_min_duration")]
    #[validate(range(min = 0.0, max = 60.0))]
    pub brake_min_duration_s: f64,

    /// Speed loss within the look-ahead window that counts as a brake (m/s).
    #[serde(default = "default_speed_drop")]
    #[validate(range(exclusive_min = 0.0, max = 50.0))]
    pub speed_drop_mps: f64,

    /// Look-ahead window for the speed-drop detector (s).
    #[serde(default = "default_speed_drop_window")]
    #[validate(range(exclusive_min = 0.0, max = 60.0))]
    pub speed_drop_window_s: f64,

    /// Speed below which a vehicle is considered stopped (m/s).
    #[serde(default = "default_stop_speed")]
    #[validate(range(exclusive_min = 0.0, max = 10.0))]
    pub stop_speed_mps: f64,

    /// Minimum time extent of a stop (s).
    #[serde(default = "default_stop_min_duration")]
    #[validate(range(min = 0.0, max = 600.0))]
    pub stop_min_duration_s: f64,
}

fn default_brake_decel() -> f64 {
    -2.0
}
fn default_brake_min_duration() -> f64 {
    0.2
}
fn default_speed_drop() -> f64 {
    2.0
}
fn default_speed_drop_window() -> f64 {
    1.0
}
fn default_stop_speed() -> f64 {
    0.5
}
fn default_stop_min_duration() -> f64 {
    1.0
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            brake_decel_mps2: default_brake_decel(),
            brake_min_duration_s: default_brake_min_duration(),
            speed_drop_mps: default_speed_drop(),
            speed_drop_window_s: default_speed_drop_window(),
            stop_speed_mps: default_stop_speed(),
            stop_min_duration_s: default_stop_min_duration(),
        }
    }
}
