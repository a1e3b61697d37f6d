//! ## vanet-metrics::behavior
//! **Per-vehicle driving-behavior indicators**
//!
//! Samples of one (run, tech, vehicle) are ordered by run-relative time and
//! reduced to speed/deceleration extremes, jerk, first braking time, path
//! length and stop count.
//!
//! ### Braking:
//! - by deceleration: the earliest maximal run of samples at or below the
//!   deceleration threshold lasting at least the minimum duration
//! - by speed drop: the earliest sample whose speed exceeds the minimum
//!   speed within the following look-ahead window by the drop threshold
//!
//! The reported brake time is the earlier of the two.

use std::collections::BTreeMap;

use serde::Serialize;
use vanet_config::BehaviorConfig;
use vanet_core::geo::haversine_m;
use vanet_core::model::{Tech, VehicleStateSample};
use vanet_core::stats::{nan_max, nan_mean, nan_median, nan_min, nan_percentile};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorMetric {
    pub run_id: String,
    pub tech: Tech,
    pub vehicle_id: Option<String>,
    pub min_speed: f64,
    pub max_decel: f64,
    pub time_to_first_brake: f64,
    pub max_abs_jerk: f64,
    pub mean_abs_jerk: f64,
    pub path_length_m: f64,
    pub stop_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorRunMetric {
    pub run_id: String,
    pub tech: Tech,
    pub vehicles: usize,
    pub min_speed_median: f64,
    pub min_speed_p10: f64,
    pub min_speed_p90: f64,
    pub max_decel_median: f64,
    pub max_decel_p10: f64,
    pub max_decel_p90: f64,
    pub time_to_first_brake_median: f64,
    pub time_to_first_brake_p10: f64,
    pub time_to_first_brake_p90: f64,
    pub stop_count_mean: f64,
}

/// Slack for time differences of millisecond stamps rebased to seconds.
const EXTENT_TOLERANCE_S: f64 = 1e-9;

/// Maximal runs of `mask` lasting at least `min_extent`, as `(start, end)`
/// times. A run starts at its first sample and ends at the first sample
/// after it, or at the last sample when the mask holds to the end.
pub fn sustained_intervals(t: &[f64], mask: &[bool], min_extent: f64) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for i in 0..=t.len() {
        let inside = i < t.len() && mask[i];
        match (inside, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                let t0 = t[s];
                let t1 = if i < t.len() { t[i] } else { t[i - 1] };
                if t1 - t0 + EXTENT_TOLERANCE_S >= min_extent {
                    out.push((t0, t1));
                }
                start = None;
            }
            _ => {}
        }
    }
    out
}

/// Δaccel/Δt between consecutive samples; NaN where Δt ≤ 0.
pub fn jerk(t: &[f64], accel: &[f64]) -> Vec<f64> {
    t.windows(2)
        .zip(accel.windows(2))
        .map(|(tw, aw)| {
            let dt = tw[1] - tw[0];
            if dt > 0.0 {
                (aw[1] - aw[0]) / dt
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Sum of finite great-circle legs; NaN for fewer than two samples.
pub fn path_length(lat: &[f64], lon: &[f64]) -> f64 {
    if lat.len() < 2 {
        return f64::NAN;
    }
    (1..lat.len())
        .map(|i| haversine_m(lat[i - 1], lon[i - 1], lat[i], lon[i]))
        .filter(|d| d.is_finite())
        .sum()
}

pub struct BehaviorEngine {
    config: BehaviorConfig,
}

impl BehaviorEngine {
    pub fn new(config: BehaviorConfig) -> Self {
        Self { config }
    }

    pub fn brake_by_decel(&self, t: &[f64], accel: &[f64]) -> f64 {
        if t.len() < 2 {
            return f64::NAN;
        }
        let mask: Vec<bool> = accel
            .iter()
            .map(|a| *a <= self.config.brake_decel_mps2)
            .collect();
        sustained_intervals(t, &mask, self.config.brake_min_duration_s)
            .first()
            .map_or(f64::NAN, |(start, _)| *start)
    }

    pub fn brake_by_speed_drop(&self, t: &[f64], speed: &[f64]) -> f64 {
        if t.len() < 2 {
            return f64::NAN;
        }
        let mut j = 0;
        for i in 0..t.len() {
            j = j.max(i);
            while j < t.len() && t[j] - t[i] <= self.config.speed_drop_window_s {
                j += 1;
            }
            let window_min = nan_min(speed[i..j].iter().copied());
            if speed[i] - window_min >= self.config.speed_drop_mps {
                return t[i];
            }
        }
        f64::NAN
    }

    pub fn stop_count(&self, t: &[f64], speed: &[f64]) -> u32 {
        if t.len() < 2 {
            return 0;
        }
        let mask: Vec<bool> = speed
            .iter()
            .map(|v| *v < self.config.stop_speed_mps)
            .collect();
        sustained_intervals(t, &mask, self.config.stop_min_duration_s).len() as u32
    }

    /// Metrics of one vehicle; `samples` may be in any order.
    pub fn vehicle_metric(&self, samples: &[&VehicleStateSample]) -> Option<BehaviorMetric> {
        let first = samples.first()?;
        let mut ordered = samples.to_vec();
        ordered.sort_by(|a, b| a.t_s.total_cmp(&b.t_s));

        let t: Vec<f64> = ordered.iter().map(|s| s.t_s).collect();
        let speed: Vec<f64> = ordered.iter().map(|s| s.speed_mps).collect();
        let accel: Vec<f64> = ordered.iter().map(|s| s.accel_mps2).collect();
        let lat: Vec<f64> = ordered.iter().map(|s| s.lat).collect();
        let lon: Vec<f64> = ordered.iter().map(|s| s.lon).collect();

        let abs_jerk: Vec<f64> = jerk(&t, &accel).into_iter().map(f64::abs).collect();
        let brake = nan_min([
            self.brake_by_decel(&t, &accel),
            self.brake_by_speed_drop(&t, &speed),
        ]);

        Some(BehaviorMetric {
            run_id: first.run_id.clone(),
            tech: first.tech,
            vehicle_id: first.vehicle_id.clone(),
            min_speed: nan_min(speed.iter().copied()),
            max_decel: nan_min(accel.iter().copied()),
            time_to_first_brake: brake,
            max_abs_jerk: nan_max(abs_jerk.iter().copied()),
            mean_abs_jerk: nan_mean(abs_jerk.iter().copied()),
            path_length_m: path_length(&lat, &lon),
            stop_count: self.stop_count(&t, &speed),
        })
    }

    /// One row per (run, tech, vehicle), in key order.
    pub fn vehicle_metrics(&self, samples: &[VehicleStateSample]) -> Vec<BehaviorMetric> {
        let mut groups: BTreeMap<(&str, Tech, Option<&str>), Vec<&VehicleStateSample>> =
            BTreeMap::new();
        for s in samples {
            groups
                .entry((s.run_id.as_str(), s.tech, s.vehicle_id.as_deref()))
                .or_default()
                .push(s);
        }
        groups
            .values()
            .filter_map(|g| self.vehicle_metric(g))
            .collect()
    }
}

/// Run-level aggregation of the vehicle table.
pub fn run_summary(vehicles: &[BehaviorMetric]) -> Vec<BehaviorRunMetric> {
    let mut groups: BTreeMap<(&str, Tech), Vec<&BehaviorMetric>> = BTreeMap::new();
    for m in vehicles {
        groups.entry((m.run_id.as_str(), m.tech)).or_default().push(m);
    }

    groups
        .into_iter()
        .map(|((run_id, tech), g)| {
            let col = |f: fn(&BehaviorMetric) -> f64| g.iter().map(|m| f(m)).collect::<Vec<_>>();
            let min_speed = col(|m| m.min_speed);
            let max_decel = col(|m| m.max_decel);
            let brake = col(|m| m.time_to_first_brake);
            let stops = col(|m| f64::from(m.stop_count));
            BehaviorRunMetric {
                run_id: run_id.to_string(),
                tech,
                vehicles: g.len(),
                min_speed_median: nan_median(min_speed.iter().copied()),
                min_speed_p10: nan_percentile(min_speed.iter().copied(), 10.0),
                min_speed_p90: nan_percentile(min_speed.iter().copied(), 90.0),
                max_decel_median: nan_median(max_decel.iter().copied()),
                max_decel_p10: nan_percentile(max_decel.iter().copied(), 10.0),
                max_decel_p90: nan_percentile(max_decel.iter().copied(), 90.0),
                time_to_first_brake_median: nan_median(brake.iter().copied()),
                time_to_first_brake_p10: nan_percentile(brake.iter().copied(), 10.0),
                time_to_first_brake_p90: nan_percentile(brake.iter().copied(), 90.0),
                stop_count_mean: nan_mean(stops),
            }
        })
        .collect()
}
