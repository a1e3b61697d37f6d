//! ## vanet-metrics::correlate
//! **Joining metric families into causal evidence**
//!
//! Vehicle level: behavior ⋈ comm on (run, tech, vehicle), then left joins
//! with AoI and reaction delay. Run level: every comm run row, left-joined
//! with the behavior, reaction and latency summaries of the same run.
//!
//! The causal statement contrasts the best- and worst-PRR runs. It is a
//! description of the data, not a statistical test.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use vanet_core::model::{Run, RunKey, Tech};

use crate::behavior::{BehaviorMetric, BehaviorRunMetric};
use crate::comm::{AoiMetric, CommRunMetric, CommVehicleMetric, LatencyRunMetric};
use crate::reaction::{ReactionRunMetric, ReactionVehicleMetric};

pub const INSUFFICIENT: &str = "Insufficient sweep data to compute causal statement.";

/// Sweep knobs reported when they take more than one value across runs.
pub const SWEEP_PARAMS: [&str; 6] = [
    "txPower",
    "mcs",
    "enableSensing",
    "slThresPsschRsrp",
    "enableChannelRandomness",
    "channelUpdatePeriod",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossVehicleRow {
    pub run_id: String,
    pub tech: Tech,
    pub vehicle_id: String,
    pub min_speed: f64,
    pub max_decel: f64,
    pub time_to_first_brake: f64,
    pub max_abs_jerk: f64,
    pub mean_abs_jerk: f64,
    pub path_length_m: f64,
    pub stop_count: u32,
    pub sent: u64,
    pub received: u64,
    pub prr: f64,
    pub aoi_mean_s: f64,
    pub aoi_p95_s: f64,
    pub aoi_max_s: f64,
    pub reaction_delay_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossRunRow {
    pub run_id: String,
    pub tech: Tech,
    pub sweep_point: Option<String>,
    pub sent: u64,
    pub received: u64,
    pub prr: f64,
    pub vehicles: Option<usize>,
    pub min_speed_median: f64,
    pub max_decel_median: f64,
    pub time_to_first_brake_median: f64,
    pub stop_count_mean: f64,
    pub reaction_delay_median: f64,
    pub reaction_delay_p90: f64,
    pub reaction_received_frac: f64,
    pub latency_mean_s: f64,
    pub latency_p95_s: f64,
    pub latency_samples: Option<usize>,
}

type VehicleKey<'a> = (&'a str, Tech, &'a str);

pub fn cross_vehicle(
    behavior: &[BehaviorMetric],
    comm: &[CommVehicleMetric],
    aoi: &[AoiMetric],
    reaction: &[ReactionVehicleMetric],
) -> Vec<CrossVehicleRow> {
    let comm: HashMap<VehicleKey, &CommVehicleMetric> = comm
        .iter()
        .map(|c| ((c.run_id.as_str(), c.tech, c.vehicle_id.as_str()), c))
        .collect();
    let aoi: HashMap<VehicleKey, &AoiMetric> = aoi
        .iter()
        .map(|a| ((a.run_id.as_str(), a.tech, a.vehicle_id.as_str()), a))
        .collect();
    let reaction: HashMap<VehicleKey, f64> = reaction
        .iter()
        .map(|r| {
            (
                (r.run_id.as_str(), r.tech, r.vehicle_id.as_str()),
                r.reaction_delay_s,
            )
        })
        .collect();

    behavior
        .iter()
        .filter_map(|b| {
            let key = (b.run_id.as_str(), b.tech, b.vehicle_id.as_deref()?);
            let c = comm.get(&key)?;
            let a = aoi.get(&key);
            Some(CrossVehicleRow {
                run_id: b.run_id.clone(),
                tech: b.tech,
                vehicle_id: key.2.to_string(),
                min_speed: b.min_speed,
                max_decel: b.max_decel,
                time_to_first_brake: b.time_to_first_brake,
                max_abs_jerk: b.max_abs_jerk,
                mean_abs_jerk: b.mean_abs_jerk,
                path_length_m: b.path_length_m,
                stop_count: b.stop_count,
                sent: c.sent,
                received: c.received,
                prr: c.prr,
                aoi_mean_s: a.map_or(f64::NAN, |a| a.aoi_mean_s),
                aoi_p95_s: a.map_or(f64::NAN, |a| a.aoi_p95_s),
                aoi_max_s: a.map_or(f64::NAN, |a| a.aoi_max_s),
                reaction_delay_s: reaction.get(&key).copied().unwrap_or(f64::NAN),
            })
        })
        .collect()
}

fn by_run<'a, T>(
    rows: &'a [T],
    key: impl Fn(&'a T) -> (&'a str, Tech),
) -> HashMap<(&'a str, Tech), &'a T> {
    rows.iter().map(|r| (key(r), r)).collect()
}

pub fn cross_run(
    comm: &[CommRunMetric],
    behavior: &[BehaviorRunMetric],
    reaction: &[ReactionRunMetric],
    latency: &[LatencyRunMetric],
    runs: &BTreeMap<RunKey, Run>,
) -> Vec<CrossRunRow> {
    let behavior = by_run(behavior, |r| (r.run_id.as_str(), r.tech));
    let reaction = by_run(reaction, |r| (r.run_id.as_str(), r.tech));
    let latency = by_run(latency, |r| (r.run_id.as_str(), r.tech));

    comm.iter()
        .map(|c| {
            let key = (c.run_id.as_str(), c.tech);
            let b = behavior.get(&key);
            let r = reaction.get(&key);
            let l = latency.get(&key);
            CrossRunRow {
                run_id: c.run_id.clone(),
                tech: c.tech,
                sweep_point: runs
                    .get(&RunKey::new(c.run_id.clone(), c.tech))
                    .and_then(|run| run.sweep_point.clone()),
                sent: c.sent,
                received: c.received,
                prr: c.prr,
                vehicles: b.map(|b| b.vehicles),
                min_speed_median: b.map_or(f64::NAN, |b| b.min_speed_median),
                max_decel_median: b.map_or(f64::NAN, |b| b.max_decel_median),
                time_to_first_brake_median: b.map_or(f64::NAN, |b| b.time_to_first_brake_median),
                stop_count_mean: b.map_or(f64::NAN, |b| b.stop_count_mean),
                reaction_delay_median: r.map_or(f64::NAN, |r| r.reaction_delay_median),
                reaction_delay_p90: r.map_or(f64::NAN, |r| r.reaction_delay_p90),
                reaction_received_frac: r.map_or(f64::NAN, |r| r.reaction_received_frac),
                latency_mean_s: l.map_or(f64::NAN, |l| l.latency_mean_s),
                latency_p95_s: l.map_or(f64::NAN, |l| l.latency_p95_s),
                latency_samples: l.map(|l| l.latency_samples),
            }
        })
        .collect()
}

/// `{:.3}` with Python-style spelling of non-finite values.
pub fn fmt3(v: f64) -> String {
    if v.is_nan() {
        "nan".into()
    } else if v.is_infinite() {
        let s = if v > 0.0 { "inf" } else { "-inf" };
        s.to_string()
    } else {
        format!("{v:.3}")
    }
}

/// Lowest- and highest-PRR rows among those with a finite PRR.
fn prr_extremes<'a, T>(rows: &[(&'a CommRunMetric, &'a T)]) -> Option<(&'a T, f64, &'a T, f64)> {
    let mut finite: Vec<_> = rows.iter().filter(|(c, _)| c.prr.is_finite()).collect();
    finite.sort_by(|a, b| a.0.prr.total_cmp(&b.0.prr));
    let &&(low_c, low) = finite.first()?;
    let &&(high_c, high) = finite.last()?;
    Some((low, low_c.prr, high, high_c.prr))
}

fn joined<'a, T>(
    comm: &'a [CommRunMetric],
    other: &'a [T],
    key: impl Fn(&'a T) -> (&'a str, Tech),
) -> Vec<(&'a CommRunMetric, &'a T)> {
    let comm = by_run(comm, |c| (c.run_id.as_str(), c.tech));
    other
        .iter()
        .filter_map(|o| comm.get(&key(o)).map(|c| (*c, o)))
        .collect()
}

pub fn causal_statement(
    comm: &[CommRunMetric],
    behavior: &[BehaviorRunMetric],
    reaction: &[ReactionRunMetric],
) -> String {
    let with_reaction = joined(comm, reaction, |r| (r.run_id.as_str(), r.tech));
    if let Some((low, low_prr, high, high_prr)) = prr_extremes(&with_reaction) {
        return format!(
            "When PRR drops from {} to {}, p90 reaction delay increases from {}s to {}s, \
             indicating delayed cooperative response under degraded communication.",
            fmt3(high_prr),
            fmt3(low_prr),
            fmt3(high.reaction_delay_p90),
            fmt3(low.reaction_delay_p90),
        );
    }

    let with_behavior = joined(comm, behavior, |b| (b.run_id.as_str(), b.tech));
    if let Some((low, low_prr, high, high_prr)) = prr_extremes(&with_behavior) {
        return format!(
            "When PRR drops from {} to {}, median time_to_first_brake increases from {}s to {}s \
             and median max_decel shifts from {} to {} m/s^2, indicating later and harsher \
             responses under degraded communication.",
            fmt3(high_prr),
            fmt3(low_prr),
            fmt3(high.time_to_first_brake_median),
            fmt3(low.time_to_first_brake_median),
            fmt3(high.max_decel_median),
            fmt3(low.max_decel_median),
        );
    }

    INSUFFICIENT.to_string()
}

/// Known sweep knobs with more than one distinct value (absent counts as a value).
pub fn varying_sweep_params(metadata: &[BTreeMap<String, String>]) -> Vec<&'static str> {
    SWEEP_PARAMS
        .into_iter()
        .filter(|param| metadata.iter().any(|m| m.contains_key(*param)))
        .filter(|param| {
            let distinct: BTreeSet<Option<&String>> =
                metadata.iter().map(|m| m.get(*param)).collect();
            distinct.len() > 1
        })
        .collect()
}

/// Contents of `causal_statement.txt`.
pub fn causal_report(statement: &str, varied: &[&str]) -> String {
    let varied = if varied.is_empty() {
        "(no parameter variations detected in run metadata)".to_string()
    } else {
        varied.join(", ")
    };
    format!("Sweep varied: {varied}\n\n{statement}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comm_run(run: &str, prr: f64) -> CommRunMetric {
        CommRunMetric {
            run_id: run.into(),
            tech: Tech::NrV2x,
            sent: 100,
            received: (prr * 100.0) as u64,
            prr,
        }
    }

    fn reaction_run(run: &str, p90: f64) -> ReactionRunMetric {
        ReactionRunMetric {
            run_id: run.into(),
            tech: Tech::NrV2x,
            reaction_delay_median: p90 / 2.0,
            reaction_delay_p10: 0.0,
            reaction_delay_p90: p90,
            reaction_received_frac: 1.0,
        }
    }

    fn behavior_run(run: &str, brake: f64, decel: f64) -> BehaviorRunMetric {
        BehaviorRunMetric {
            run_id: run.into(),
            tech: Tech::NrV2x,
            vehicles: 3,
            min_speed_median: 1.0,
            min_speed_p10: 0.5,
            min_speed_p90: 2.0,
            max_decel_median: decel,
            max_decel_p10: decel,
            max_decel_p90: decel,
            time_to_first_brake_median: brake,
            time_to_first_brake_p10: brake,
            time_to_first_brake_p90: brake,
            stop_count_mean: 0.0,
        }
    }

    #[test]
    fn reaction_statement() {
        let comm = [comm_run("a", 0.95), comm_run("b", 0.40), comm_run("c", f64::NAN)];
        let reaction = [reaction_run("a", 0.3), reaction_run("b", 1.25), reaction_run("c", 9.0)];
        let s = causal_statement(&comm, &[], &reaction);
        assert_eq!(
            s,
            "When PRR drops from 0.950 to 0.400, p90 reaction delay increases from 0.300s to \
             1.250s, indicating delayed cooperative response under degraded communication."
        );
    }

    #[test]
    fn falls_back_to_behavior() {
        let comm = [comm_run("a", 0.9), comm_run("b", 0.5)];
        let behavior = [behavior_run("a", 1.0, -3.0), behavior_run("b", 2.5, -6.0)];
        let reaction = [reaction_run("zzz", 1.0)];
        let s = causal_statement(&comm, &behavior, &reaction);
        assert!(s.starts_with("When PRR drops from 0.900 to 0.500, median time_to_first_brake"));
        assert!(s.contains("from 1.000s to 2.500s"));
        assert!(s.contains("from -3.000 to -6.000 m/s^2"));
    }

    #[test]
    fn insufficient() {
        assert_eq!(causal_statement(&[], &[], &[]), INSUFFICIENT);
        assert_eq!(fmt3(f64::NAN), "nan");
    }

    #[test]
    fn vehicle_join_is_inner_on_comm() {
        let behavior = vec![
            BehaviorMetric {
                run_id: "r".into(),
                tech: Tech::NrV2x,
                vehicle_id: Some("1".into()),
                min_speed: 0.0,
                max_decel: -3.0,
                time_to_first_brake: 1.0,
                max_abs_jerk: 1.0,
                mean_abs_jerk: 0.5,
                path_length_m: 10.0,
                stop_count: 0,
            },
            BehaviorMetric {
                vehicle_id: Some("9".into()),
                ..BehaviorMetric {
                    run_id: "r".into(),
                    tech: Tech::NrV2x,
                    vehicle_id: None,
                    min_speed: 0.0,
                    max_decel: 0.0,
                    time_to_first_brake: f64::NAN,
                    max_abs_jerk: 0.0,
                    mean_abs_jerk: 0.0,
                    path_length_m: 0.0,
                    stop_count: 0,
                }
            },
        ];
        let comm = vec![CommVehicleMetric {
            run_id: "r".into(),
            tech: Tech::NrV2x,
            vehicle_id: "1".into(),
            sent: 10,
            received: 8,
            prr: 0.8,
            msg_type: "CAM".into(),
        }];
        let reaction = vec![ReactionVehicleMetric {
            run_id: "r".into(),
            tech: Tech::NrV2x,
            vehicle_id: "1".into(),
            reaction_delay_s: 0.7,
        }];
        let rows = cross_vehicle(&behavior, &comm, &[], &reaction);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].prr, 0.8);
        assert_eq!(rows[0].reaction_delay_s, 0.7);
        assert!(rows[0].aoi_mean_s.is_nan());
    }

    #[test]
    fn run_join_keeps_every_comm_row() {
        let comm = [comm_run("a", 0.9), comm_run("b", 0.5)];
        let latency = [LatencyRunMetric {
            run_id: "b".into(),
            tech: Tech::NrV2x,
            latency_mean_s: 0.01,
            latency_p95_s: 0.02,
            latency_max_s: 0.05,
            latency_samples: 40,
        }];
        let rows = cross_run(&comm, &[], &[], &latency, &BTreeMap::new());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].latency_samples, None);
        assert_eq!(rows[1].latency_samples, Some(40));
        assert!(rows[1].reaction_delay_p90.is_nan());
    }

    #[test]
    fn varying_params() {
        let meta = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        let metadata = vec![
            meta(&[("txPower", "23"), ("mcs", "5")]),
            meta(&[("txPower", "10"), ("mcs", "5")]),
            meta(&[("txPower", "10"), ("mcs", "5"), ("enableSensing", "true")]),
        ];
        assert_eq!(varying_sweep_params(&metadata), ["txPower", "enableSensing"]);
        assert_eq!(
            causal_report(INSUFFICIENT, &[]),
            "Sweep varied: (no parameter variations detected in run metadata)\n\n\
             Insufficient sweep data to compute causal statement.\n"
        );
    }
}
