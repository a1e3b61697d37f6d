//! # Vanet Metric Engines
//!
//! Crate for the per-vehicle and per-run metric families and their
//! cross-correlation.
//!
//! ### Key Submodules:
//! - `behavior`: braking, stops, jerk and path length from kinematics
//! - `comm`: PRR, age of information and latency from message logs
//! - `reaction`: first-reception delay from the emergency vehicle
//! - `correlate`: joins of the above and the causal statement

pub mod behavior;
pub mod comm;
pub mod correlate;
pub mod reaction;

use std::collections::BTreeMap;

use vanet_config::AnalysisConfig;
use vanet_core::model::{MessageEvent, Run, RunKey, VehicleStateSample};

pub use behavior::{BehaviorEngine, BehaviorMetric, BehaviorRunMetric};
pub use comm::{
    AoiMetric, CommEngine, CommMetrics, CommRunMetric, CommVehicleMetric, LatencyRunMetric,
    LatencyWindow,
};
pub use correlate::{CrossRunRow, CrossVehicleRow};
pub use reaction::{ReactionEngine, ReactionRunMetric, ReactionVehicleMetric};

/// Every metric table derived from the typed records of one or more runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTables {
    pub behavior_vehicle: Vec<BehaviorMetric>,
    pub behavior_run: Vec<BehaviorRunMetric>,
    pub comm_vehicle: Vec<CommVehicleMetric>,
    pub comm_run: Vec<CommRunMetric>,
    pub aoi_vehicle: Vec<AoiMetric>,
    pub latency_run: Vec<LatencyRunMetric>,
    pub reaction_vehicle: Vec<ReactionVehicleMetric>,
    pub reaction_run: Vec<ReactionRunMetric>,
}

impl MetricTables {
    pub fn compute(
        samples: &[VehicleStateSample],
        events: &[MessageEvent],
        config: &AnalysisConfig,
    ) -> Self {
        let behavior_vehicle =
            BehaviorEngine::new(config.behavior.clone()).vehicle_metrics(samples);
        let behavior_run = behavior::run_summary(&behavior_vehicle);

        let comm = CommEngine::new(LatencyWindow::up_to(config.comm.latency_max_s)).compute(events);

        let reaction_vehicle =
            ReactionEngine::new(config.reaction.emergency_tx_id).vehicle_delays(events);
        let reaction_run = reaction::run_summary(&reaction_vehicle);

        tracing::debug!(
            vehicles = behavior_vehicle.len(),
            comm_runs = comm.runs.len(),
            latency_runs = comm.latency.len(),
            reaction_runs = reaction_run.len(),
            "metric families computed"
        );

        Self {
            behavior_vehicle,
            behavior_run,
            comm_vehicle: comm.vehicles,
            comm_run: comm.runs,
            aoi_vehicle: comm.aoi,
            latency_run: comm.latency,
            reaction_vehicle,
            reaction_run,
        }
    }

    /// Appends the tables of another, disjoint set of runs.
    pub fn extend(&mut self, other: MetricTables) {
        self.behavior_vehicle.extend(other.behavior_vehicle);
        self.behavior_run.extend(other.behavior_run);
        self.comm_vehicle.extend(other.comm_vehicle);
        self.comm_run.extend(other.comm_run);
        self.aoi_vehicle.extend(other.aoi_vehicle);
        self.latency_run.extend(other.latency_run);
        self.reaction_vehicle.extend(other.reaction_vehicle);
        self.reaction_run.extend(other.reaction_run);
    }

    /// Merges per-run results in run-key order.
    pub fn merge_ordered(parts: BTreeMap<RunKey, MetricTables>) -> Self {
        parts.into_values().fold(Self::default(), |mut acc, part| {
            acc.extend(part);
            acc
        })
    }
}

/// Cross-family joins and the causal summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossTables {
    pub vehicle: Vec<CrossVehicleRow>,
    pub run: Vec<CrossRunRow>,
    pub statement: String,
    pub varied_params: Vec<&'static str>,
}

impl CrossTables {
    pub fn correlate(
        tables: &MetricTables,
        runs: &BTreeMap<RunKey, Run>,
        metadata: &[BTreeMap<String, String>],
    ) -> Self {
        Self {
            vehicle: correlate::cross_vehicle(
                &tables.behavior_vehicle,
                &tables.comm_vehicle,
                &tables.aoi_vehicle,
                &tables.reaction_vehicle,
            ),
            run: correlate::cross_run(
                &tables.comm_run,
                &tables.behavior_run,
                &tables.reaction_run,
                &tables.latency_run,
                runs,
            ),
            statement: correlate::causal_statement(
                &tables.comm_run,
                &tables.behavior_run,
                &tables.reaction_run,
            ),
            varied_params: correlate::varying_sweep_params(metadata),
        }
    }

    pub fn report(&self) -> String {
        correlate::causal_report(&self.statement, &self.varied_params)
    }
}
