//! ## vanet-core::time
//! **Run-relative clocks**
//!
//! Simulation writers do not agree on a time base. CAM state tables carry
//! absolute milliseconds per vehicle, message logs are already in seconds,
//! and some physical-layer dumps mix milliseconds and microseconds.
//!
//! ### Heuristic:
//! - A raw value above [`MICROSECOND_THRESHOLD`] is taken as microseconds,
//!   anything at or below it as milliseconds. This is an approximation: a
//!   millisecond clock running past 100 s is misread as microseconds.

use std::collections::HashMap;

use crate::model::VehicleStateSample;

/// Raw timestamps strictly greater than this are treated as microseconds.
pub const MICROSECOND_THRESHOLD: f64 = 1e5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    Microseconds,
}

impl TimeUnit {
    pub fn infer(raw: f64) -> Self {
        if raw > MICROSECOND_THRESHOLD {
            TimeUnit::Microseconds
        } else {
            TimeUnit::Milliseconds
        }
    }

    pub fn to_seconds(self, raw: f64) -> f64 {
        match self {
            TimeUnit::Milliseconds => raw / 1e3,
            TimeUnit::Microseconds => raw / 1e6,
        }
    }
}

/// Converts a raw timestamp of unknown unit to seconds. NaN stays NaN.
pub fn heuristic_seconds(raw: f64) -> f64 {
    if raw.is_nan() {
        return f64::NAN;
    }
    TimeUnit::infer(raw).to_seconds(raw)
}

pub fn millis_to_seconds(raw: f64) -> f64 {
    raw / 1e3
}

/// Rebases `t_s` of every sample to seconds since the earliest finite
/// `timestamp_ms` of the same (run, vehicle). Samples with no finite
/// timestamp in their group get NaN.
pub fn rebase_vehicle_clocks(samples: &mut [VehicleStateSample]) {
    let mut origin: HashMap<(String, Option<String>), f64> = HashMap::new();
    for s in samples.iter() {
        if !s.timestamp_ms.is_finite() {
            continue;
        }
        origin
            .entry((s.run_id.clone(), s.vehicle_id.clone()))
            .and_modify(|m| *m = m.min(s.timestamp_ms))
            .or_insert(s.timestamp_ms);
    }

    for s in samples.iter_mut() {
        s.t_s = match origin.get(&(s.run_id.clone(), s.vehicle_id.clone())) {
            Some(min) if s.timestamp_ms.is_finite() => millis_to_seconds(s.timestamp_ms - min),
            _ => f64::NAN,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tech;

    fn sample(run: &str, vehicle: &str, ts: f64) -> VehicleStateSample {
        VehicleStateSample {
            run_id: run.into(),
            tech: Tech::NrV2x,
            vehicle_id: Some(vehicle.into()),
            timestamp_ms: ts,
            t_s: f64::NAN,
            lat: f64::NAN,
            lon: f64::NAN,
            heading_deg: f64::NAN,
            speed_mps: f64::NAN,
            accel_mps2: f64::NAN,
            source_cam_id: Some(vehicle.into()),
            message_id: None,
        }
    }

    #[test]
    fn unit_threshold() {
        assert_eq!(TimeUnit::infer(1e5), TimeUnit::Milliseconds);
        assert_eq!(TimeUnit::infer(1e5 + 1.0), TimeUnit::Microseconds);
        assert!((heuristic_seconds(2500.0) - 2.5).abs() < 1e-12);
        assert!((heuristic_seconds(2_500_000.0) - 2.5).abs() < 1e-12);
        assert!(heuristic_seconds(f64::NAN).is_nan());
    }

    #[test]
    fn rebases_per_run_and_vehicle() {
        let mut samples = vec![
            sample("r1", "a", 5000.0),
            sample("r1", "a", 4000.0),
            sample("r1", "b", 9000.0),
            sample("r2", "a", 100.0),
            sample("r1", "b", f64::NAN),
        ];
        rebase_vehicle_clocks(&mut samples);
        assert_eq!(samples[0].t_s, 1.0);
        assert_eq!(samples[1].t_s, 0.0);
        assert_eq!(samples[2].t_s, 0.0);
        assert_eq!(samples[3].t_s, 0.0);
        assert!(samples[4].t_s.is_nan());
    }
}
