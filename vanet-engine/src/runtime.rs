/*!
# Runtime Engine

Entry points of the `analyze` and `collision-risk` commands. Frontends
share these so that ingestion, metric computation and output layout stay
identical however the pipeline is started.

Metric computation is partitioned by run: each run's records are moved
into a blocking task, bounded by `ingest.max_parallel_runs`, and the
per-run tables are merged back in run-key order.
*/

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use opentelemetry::KeyValue;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument};

use vanet_config::{AnalysisConfig, RiskConfig};
use vanet_core::model::{MessageEvent, RunKey, RunScoped, VehicleStateSample};
use vanet_ingest::Ingestor;
use vanet_metrics::{CrossTables, MetricTables};
use vanet_risk::RiskSummary;
use vanet_telemetry::{EventLogger, MetricsRecorder};

use crate::error::EngineError;
use crate::output;

/// What one `analyze` invocation produced.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub runs: usize,
    pub written: Vec<PathBuf>,
    pub statement: String,
}

#[derive(Default)]
struct RunRecords {
    samples: Vec<VehicleStateSample>,
    events: Vec<MessageEvent>,
}

fn partition(
    samples: Vec<VehicleStateSample>,
    events: Vec<MessageEvent>,
) -> BTreeMap<RunKey, RunRecords> {
    let mut runs: BTreeMap<RunKey, RunRecords> = BTreeMap::new();
    for s in samples {
        runs.entry(s.run_key()).or_default().samples.push(s);
    }
    for e in events {
        runs.entry(e.run_key()).or_default().events.push(e);
    }
    runs
}

async fn compute_per_run(
    runs: BTreeMap<RunKey, RunRecords>,
    config: &AnalysisConfig,
) -> Result<MetricTables, EngineError> {
    let permits = Arc::new(Semaphore::new(config.ingest.max_parallel_runs.max(1)));
    let config = Arc::new(config.clone());
    let mut tasks = JoinSet::new();

    for (key, records) in runs {
        let permit = permits.clone().acquire_owned().await?;
        let config = Arc::clone(&config);
        tasks.spawn_blocking(move || {
            let _permit = permit;
            let tables = MetricTables::compute(&records.samples, &records.events, &config);
            (key, tables)
        });
    }

    let mut parts = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (key, tables) = joined?;
        parts.insert(key, tables);
    }
    Ok(MetricTables::merge_ordered(parts))
}

/// Ingests `input`, computes every metric family and writes all tables into `out`.
#[instrument(level = "info", name = "run_analysis", skip_all, fields(input = %input.display(), out = %out.display()))]
pub async fn run_analysis(
    input: &Path,
    out: &Path,
    config: &AnalysisConfig,
    metrics: &MetricsRecorder,
) -> Result<AnalysisReport, EngineError> {
    if !input.exists() {
        return Err(EngineError::MissingInput(input.to_path_buf()));
    }
    fs::create_dir_all(out)?;

    let mut dataset = Ingestor::new(&config.ingest, metrics).ingest(input)?;
    let mut written = output::write_dataset(out, &dataset)?;
    let runs = partition(
        std::mem::take(&mut dataset.vehicle_state),
        std::mem::take(&mut dataset.messages),
    );
    let run_count = runs.len();
    info!(runs = run_count, "computing metrics");

    let tables = compute_per_run(runs, config).await?;
    metrics.runs_analyzed.inc_by(run_count as u64);

    let metadata: Vec<_> = dataset.metadata.iter().map(|m| m.flattened()).collect();
    let cross = CrossTables::correlate(&tables, &dataset.runs, &metadata);

    written.extend(output::write_metrics(out, &tables)?);
    written.extend(output::write_cross(out, &cross)?);

    EventLogger::log_event(
        "analysis_complete",
        vec![
            KeyValue::new("runs", run_count as i64),
            KeyValue::new("tables_written", written.len() as i64),
            KeyValue::new("out", out.display().to_string()),
        ],
    );

    Ok(AnalysisReport {
        runs: run_count,
        written,
        statement: cross.statement,
    })
}

/// Streams a netstate dump through the risk analyzer on the blocking pool.
#[instrument(level = "info", name = "run_collision_risk", skip_all, fields(netstate = %netstate.display()))]
pub async fn run_collision_risk(
    netstate: &Path,
    out_dir: &Path,
    thresholds: RiskConfig,
) -> Result<RiskSummary, EngineError> {
    if !netstate.exists() {
        return Err(EngineError::MissingInput(netstate.to_path_buf()));
    }
    let netstate = netstate.to_path_buf();
    let out_dir = out_dir.to_path_buf();
    let summary = tokio::task::spawn_blocking(move || {
        vanet_risk::analyze_netstate(&netstate, thresholds, &out_dir)
    })
    .await??;
    Ok(summary)
}
