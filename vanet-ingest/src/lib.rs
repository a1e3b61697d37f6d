//! vanet-ingest
//!
//! Turns an input file or directory into a [`Dataset`] of typed records.
//! Files are discovered, filtered by the active sweep, attributed to a run,
//! classified and decoded once. A file that cannot be read or recognized is
//! logged, counted and skipped; only a missing top-level input is fatal.

pub mod discovery;
pub mod error;
pub mod metadata;
pub mod resolver;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::instrument;
use vanet_config::IngestConfig;
use vanet_core::model::{
    CoexistenceSample, CommStatRow, MessageEvent, PhyLinkSample, Run, RunKey, VehicleStateSample,
};
use vanet_core::time::rebase_vehicle_clocks;
use vanet_schema::{decode, Table, TypedTable};
use vanet_telemetry::{EventLogger, MetricsRecorder};

pub use discovery::{discover_files, SweepFilter};
pub use error::IngestError;
pub use metadata::{load_metadata, metadata_table, MetadataRecord};
pub use resolver::{extract_sweep_point_id, parse_run_id, RunResolver};

/// Every record decoded from one input, grouped by record family.
#[derive(Debug, Default, Clone)]
pub struct Dataset {
    pub runs: BTreeMap<RunKey, Run>,
    pub vehicle_state: Vec<VehicleStateSample>,
    pub comm_stats: Vec<CommStatRow>,
    pub phy_links: Vec<PhyLinkSample>,
    pub coexistence: Vec<CoexistenceSample>,
    pub messages: Vec<MessageEvent>,
    pub metadata: Vec<MetadataRecord>,
}

impl Dataset {
    fn absorb(&mut self, table: TypedTable) {
        match table {
            TypedTable::VehicleState(rows) => self.vehicle_state.extend(rows),
            TypedTable::AsaEvent(rows) | TypedTable::NodePrr(rows) => self.comm_stats.extend(rows),
            TypedTable::MessageLog(rows) => self.messages.extend(rows),
            TypedTable::PhyLink(rows) => self.phy_links.extend(rows),
            TypedTable::CoexistencePhy(rows) => self.coexistence.extend(rows),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vehicle_state.is_empty()
            && self.comm_stats.is_empty()
            && self.phy_links.is_empty()
            && self.coexistence.is_empty()
            && self.messages.is_empty()
    }
}

/// Outcome of one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Decoded { kind: &'static str, records: usize },
    Filtered,
    Unrecognized,
    Unreadable(String),
}

pub struct Ingestor<'a> {
    config: &'a IngestConfig,
    metrics: &'a MetricsRecorder,
}

impl<'a> Ingestor<'a> {
    pub fn new(config: &'a IngestConfig, metrics: &'a MetricsRecorder) -> Self {
        Self { config, metrics }
    }

    #[instrument(level = "info", name = "ingest", skip(self, input), fields(input = %input.display()))]
    pub fn ingest(&self, input: &Path) -> Result<Dataset, IngestError> {
        let files = discover_files(input, &self.config.file_extension)?;
        let filter = SweepFilter::for_input(input, &self.config.sweep_config);
        let metadata = load_metadata(input);
        let resolver = RunResolver::new(&metadata);

        let mut dataset = Dataset {
            metadata,
            ..Dataset::default()
        };
        let mut decoded_files = 0usize;
        for path in &files {
            match self.ingest_file(path, &filter, &resolver, &mut dataset) {
                FileOutcome::Decoded { kind, records } => {
                    decoded_files += 1;
                    self.metrics.inc_files_ingested();
                    self.metrics.add_records(kind, records);
                    tracing::debug!(path = %path.display(), kind, records, "decoded table");
                }
                FileOutcome::Filtered => {
                    self.metrics.inc_files_skipped();
                    tracing::debug!(path = %path.display(), "outside active sweep");
                }
                FileOutcome::Unrecognized => {
                    self.metrics.inc_files_skipped();
                    tracing::debug!(path = %path.display(), "unrecognized table");
                }
                FileOutcome::Unreadable(reason) => {
                    self.metrics.inc_files_skipped();
                    EventLogger::log_warning(
                        "file_skipped",
                        vec![
                            KeyValue::new("path", path.display().to_string()),
                            KeyValue::new("reason", reason),
                        ],
                    );
                }
            }
        }

        rebase_vehicle_clocks(&mut dataset.vehicle_state);

        EventLogger::log_event(
            "ingest_complete",
            vec![
                KeyValue::new("files_seen", files.len() as i64),
                KeyValue::new("files_decoded", decoded_files as i64),
                KeyValue::new("runs", dataset.runs.len() as i64),
                KeyValue::new("sweep_filter", filter.is_active()),
            ],
        );
        Ok(dataset)
    }

    fn ingest_file(
        &self,
        path: &Path,
        filter: &SweepFilter,
        resolver: &RunResolver,
        dataset: &mut Dataset,
    ) -> FileOutcome {
        if !filter.admits(path) {
            return FileOutcome::Filtered;
        }
        let started = Instant::now();
        let table = match Table::read_path(path) {
            Ok(table) => table,
            Err(e) => return FileOutcome::Unreadable(e.to_string()),
        };
        let run = resolver.resolve(path);
        let decoded = decode(&table, &run.key);
        self.metrics
            .file_parse_seconds
            .observe(started.elapsed().as_secs_f64());

        let Some(decoded) = decoded else {
            return FileOutcome::Unrecognized;
        };
        let outcome = FileOutcome::Decoded {
            kind: decoded.kind().as_str(),
            records: decoded.len(),
        };
        dataset.runs.entry(run.key.clone()).or_insert(run);
        dataset.absorb(decoded);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn write(dir: &Path, rel: &str, body: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[traced_test]
    #[test]
    fn ingests_mixed_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "eva_nrv2x-veh1.csv",
            "messageId,camId,timestamp,latitude,longitude,heading,speed,acceleration\n\
             2,1,1000,45.0,7.0,0,10,0\n\
             2,1,1500,45.0,7.0001,0,9,-2.5\n",
        );
        write(
            dir.path(),
            "eva_nrv2x-MSG.csv",
            "vehicle_id,msg_seq,tx_t_s,rx_t_s,rx_ok,msg_type,tx_id,rx_id\n\
             2,0,0.0,,0,CAM,2,\n\
             1,0,0.0,0.05,1,CAM,2,1\n",
        );
        write(dir.path(), "junk.csv", "foo,bar\n1,2\n");
        write(dir.path(), "broken.csv", "a,b\n\"unterminated\n");

        let metrics = MetricsRecorder::new().unwrap();
        let config = IngestConfig::default();
        let dataset = Ingestor::new(&config, &metrics).ingest(dir.path()).unwrap();

        assert_eq!(dataset.vehicle_state.len(), 2);
        assert_eq!(dataset.vehicle_state[1].t_s, 0.5);
        assert_eq!(dataset.messages.len(), 2);
        assert_eq!(dataset.runs.len(), 1);
        let key = dataset.runs.keys().next().unwrap();
        assert_eq!(key.run_id, "eva_nrv2x");
        assert_eq!(metrics.files_ingested.get(), 2);
        assert!(metrics.files_skipped.get() >= 1);
        assert!(logs_contain("ingest_complete"));
    }

    #[test]
    fn single_file_input() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "n.csv", "node_id,prr\n3,0.9\n");
        let metrics = MetricsRecorder::new().unwrap();
        let config = IngestConfig::default();
        let dataset = Ingestor::new(&config, &metrics)
            .ingest(&dir.path().join("n.csv"))
            .unwrap();
        assert_eq!(dataset.comm_stats.len(), 1);
        assert_eq!(dataset.comm_stats[0].prr, 0.9);
    }

    #[test]
    fn missing_input() {
        let metrics = MetricsRecorder::new().unwrap();
        let config = IngestConfig::default();
        let err = Ingestor::new(&config, &metrics)
            .ingest(Path::new("/definitely/missing"))
            .unwrap_err();
        assert!(matches!(err, IngestError::MissingInput(_)));
    }
}
