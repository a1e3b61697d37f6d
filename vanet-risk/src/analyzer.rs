//! ## vanet-risk::analyzer
//! **Rear-end risk proxies per timestep**
//!
//! Only adjacent same-lane pairs are candidates: vehicles are ordered by
//! lane position and each (rear, front) neighbour pair with a positive gap
//! contributes a gap and, when the rear vehicle is faster, a time to
//! collision.

use vanet_config::RiskConfig;

use crate::netstate::{LaneVehicle, Timestep};

/// Minimum gap and TTC of one timestep. `None` when no pair qualified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSample {
    pub time_s: f64,
    pub min_gap_m: Option<f64>,
    pub min_ttc_s: Option<f64>,
    pub vehicles: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSummary {
    pub timesteps: u64,
    pub mean_vehicles: f64,
    pub min_gap_m: Option<f64>,
    pub min_ttc_s: Option<f64>,
    pub risky_gap_events: u64,
    pub risky_ttc_events: u64,
}

impl RiskSummary {
    pub const HEADER: [&'static str; 6] = [
        "timesteps",
        "mean_vehicles",
        "min_gap_m",
        "min_ttc_s",
        "risky_gap_events",
        "risky_ttc_events",
    ];

    /// Summary row with floats at three decimals and empty cells for undefined minima.
    pub fn record(&self) -> [String; 6] {
        let fixed = |v: Option<f64>| v.map(|v| format!("{v:.3}")).unwrap_or_default();
        [
            self.timesteps.to_string(),
            format!("{:.3}", self.mean_vehicles),
            fixed(self.min_gap_m),
            fixed(self.min_ttc_s),
            self.risky_gap_events.to_string(),
            self.risky_ttc_events.to_string(),
        ]
    }
}

impl RiskSample {
    pub const HEADER: [&'static str; 4] = ["time_s", "min_gap_m", "min_ttc_s", "vehicles"];

    pub fn record(&self) -> [String; 4] {
        let cell = |v: Option<f64>| v.map(|v| format!("{v:?}")).unwrap_or_default();
        [
            format!("{:?}", self.time_s),
            cell(self.min_gap_m),
            cell(self.min_ttc_s),
            self.vehicles.to_string(),
        ]
    }
}

fn min_opt(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.min(v)))
}

/// Accumulates risk counters over a stream of timesteps.
#[derive(Debug, Clone)]
pub struct RiskAnalyzer {
    thresholds: RiskConfig,
    timesteps: u64,
    vehicle_total: u64,
    min_gap_m: Option<f64>,
    min_ttc_s: Option<f64>,
    risky_gap_events: u64,
    risky_ttc_events: u64,
}

impl RiskAnalyzer {
    pub fn new(thresholds: RiskConfig) -> Self {
        Self {
            thresholds,
            timesteps: 0,
            vehicle_total: 0,
            min_gap_m: None,
            min_ttc_s: None,
            risky_gap_events: 0,
            risky_ttc_events: 0,
        }
    }

    pub fn observe(&mut self, step: &Timestep) -> RiskSample {
        let mut gap_t: Option<f64> = None;
        let mut ttc_t: Option<f64> = None;

        for vehicles in step.lanes.values().filter(|v| v.len() >= 2) {
            let mut ordered: Vec<&LaneVehicle> = vehicles.iter().collect();
            ordered.sort_by(|a, b| a.pos.total_cmp(&b.pos));

            for pair in ordered.windows(2) {
                let (rear, front) = (pair[0], pair[1]);
                let gap = front.pos - rear.pos;
                if gap <= 0.0 {
                    continue;
                }
                gap_t = min_opt(gap_t, gap);
                if gap < self.thresholds.gap_threshold_m {
                    self.risky_gap_events += 1;
                }

                let closing = rear.speed - front.speed;
                if closing > 0.0 {
                    let ttc = gap / closing;
                    ttc_t = min_opt(ttc_t, ttc);
                    if ttc < self.thresholds.ttc_threshold_s {
                        self.risky_ttc_events += 1;
                    }
                }
            }
        }

        if let Some(g) = gap_t {
            self.min_gap_m = min_opt(self.min_gap_m, g);
        }
        if let Some(t) = ttc_t {
            self.min_ttc_s = min_opt(self.min_ttc_s, t);
        }

        let vehicles = step.vehicle_count();
        self.timesteps += 1;
        self.vehicle_total += vehicles as u64;

        RiskSample {
            time_s: step.time_s,
            min_gap_m: gap_t,
            min_ttc_s: ttc_t,
            vehicles,
        }
    }

    pub fn finish(&self) -> RiskSummary {
        RiskSummary {
            timesteps: self.timesteps,
            mean_vehicles: if self.timesteps == 0 {
                0.0
            } else {
                self.vehicle_total as f64 / self.timesteps as f64
            },
            min_gap_m: self.min_gap_m,
            min_ttc_s: self.min_ttc_s,
            risky_gap_events: self.risky_gap_events,
            risky_ttc_events: self.risky_ttc_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn veh(id: &str, pos: f64, speed: f64) -> LaneVehicle {
        LaneVehicle {
            id: id.into(),
            pos,
            x: pos,
            y: 0.0,
            speed,
        }
    }

    fn step(time_s: f64, lanes: Vec<(&str, Vec<LaneVehicle>)>) -> Timestep {
        Timestep {
            time_s,
            lanes: lanes
                .into_iter()
                .map(|(id, v)| (id.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn closing_pair_above_thresholds() {
        let mut analyzer = RiskAnalyzer::new(RiskConfig::default());
        // Document order is front first; ordering is by pos.
        let sample = analyzer.observe(&step(
            0.0,
            vec![("e_0", vec![veh("front", 15.0, 9.0), veh("rear", 10.0, 12.0)])],
        ));
        assert_eq!(sample.min_gap_m, Some(5.0));
        let ttc = sample.min_ttc_s.unwrap();
        assert!((ttc - 5.0 / 3.0).abs() < 1e-12);

        let summary = analyzer.finish();
        assert_eq!(summary.risky_gap_events, 0);
        assert_eq!(summary.risky_ttc_events, 0);
        assert_eq!(summary.record()[3], "1.667");
    }

    #[test]
    fn counts_risky_pairs_and_skips_lone_vehicles() {
        let mut analyzer = RiskAnalyzer::new(RiskConfig::default());
        analyzer.observe(&step(
            1.0,
            vec![
                ("a_0", vec![veh("1", 0.0, 20.0), veh("2", 1.5, 10.0), veh("3", 1.5, 5.0)]),
                ("b_0", vec![veh("4", 0.0, 30.0)]),
            ],
        ));
        let sample = analyzer.observe(&step(2.0, vec![("b_0", vec![veh("4", 0.0, 30.0)])]));
        assert_eq!(sample.min_gap_m, None);
        assert_eq!(sample.min_ttc_s, None);
        assert_eq!(sample.record()[1], "");

        let summary = analyzer.finish();
        // One positive-gap pair; the co-located pair is ignored.
        assert_eq!(summary.risky_gap_events, 1);
        assert_eq!(summary.risky_ttc_events, 1);
        assert_eq!(summary.min_gap_m, Some(1.5));
        assert_eq!(summary.min_ttc_s, Some(0.15));
        assert_eq!(summary.timesteps, 2);
        assert_eq!(summary.mean_vehicles, 2.5);
    }

    #[test]
    fn empty_stream_summary() {
        let summary = RiskAnalyzer::new(RiskConfig::default()).finish();
        assert_eq!(
            summary.record(),
            ["0", "0.000", "", "", "0", "0"].map(String::from)
        );
    }
}
