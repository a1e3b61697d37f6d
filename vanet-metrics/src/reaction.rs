//! ## vanet-metrics::reaction
//! **First-reception delay from the emergency vehicle**
//!
//! The reaction delay of a vehicle is the earliest time it successfully
//! received anything sent by the emergency station. Every sender or
//! receiver id in the run's message log except the emergency id itself is a
//! candidate; vehicles that never heard the emergency station get NaN.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use vanet_core::model::{MessageEvent, Tech};
use vanet_core::stats::{nan_median, nan_percentile};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionVehicleMetric {
    pub run_id: String,
    pub tech: Tech,
    pub vehicle_id: String,
    pub reaction_delay_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionRunMetric {
    pub run_id: String,
    pub tech: Tech,
    pub reaction_delay_median: f64,
    pub reaction_delay_p10: f64,
    pub reaction_delay_p90: f64,
    pub reaction_received_frac: f64,
}

pub struct ReactionEngine {
    emergency_id: String,
}

impl ReactionEngine {
    pub fn new(emergency_tx_id: u32) -> Self {
        Self {
            emergency_id: emergency_tx_id.to_string(),
        }
    }

    pub fn vehicle_delays(&self, events: &[MessageEvent]) -> Vec<ReactionVehicleMetric> {
        let mut universe: BTreeMap<(&str, Tech), BTreeSet<&str>> = BTreeMap::new();
        let mut first_rx: BTreeMap<((&str, Tech), &str), f64> = BTreeMap::new();

        for e in events {
            let run = (e.run_id.as_str(), e.tech);
            let ids = universe.entry(run).or_default();
            ids.extend(e.tx_id.as_deref());
            ids.extend(e.rx_id.as_deref());

            let from_emergency = e.tx_id.as_deref() == Some(self.emergency_id.as_str());
            if !(e.is_reception() && from_emergency && e.rx_t_s.is_finite()) {
                continue;
            }
            if let Some(rx) = e.rx_id.as_deref() {
                first_rx
                    .entry((run, rx))
                    .and_modify(|t| *t = t.min(e.rx_t_s))
                    .or_insert(e.rx_t_s);
            }
        }

        let mut rows = Vec::new();
        for (run @ (run_id, tech), ids) in universe {
            for vehicle in ids {
                if vehicle == self.emergency_id {
                    continue;
                }
                rows.push(ReactionVehicleMetric {
                    run_id: run_id.to_string(),
                    tech,
                    vehicle_id: vehicle.to_string(),
                    reaction_delay_s: first_rx.get(&(run, vehicle)).copied().unwrap_or(f64::NAN),
                });
            }
        }
        rows
    }
}

/// Summary per run; runs where nobody heard the emergency station are omitted.
pub fn run_summary(vehicles: &[ReactionVehicleMetric]) -> Vec<ReactionRunMetric> {
    let mut groups: BTreeMap<(&str, Tech), Vec<f64>> = BTreeMap::new();
    for v in vehicles {
        groups
            .entry((v.run_id.as_str(), v.tech))
            .or_default()
            .push(v.reaction_delay_s);
    }

    groups
        .into_iter()
        .filter_map(|((run_id, tech), delays)| {
            let finite = delays.iter().filter(|d| d.is_finite()).count();
            if finite == 0 {
                return None;
            }
            Some(ReactionRunMetric {
                run_id: run_id.to_string(),
                tech,
                reaction_delay_median: nan_median(delays.iter().copied()),
                reaction_delay_p10: nan_percentile(delays.iter().copied(), 10.0),
                reaction_delay_p90: nan_percentile(delays.iter().copied(), 90.0),
                reaction_received_frac: finite as f64 / delays.len() as f64,
            })
        })
        .collect()
}
