//! ## vanet-engine::output
//! **Result tables on disk**
//!
//! Every table is written only when it has rows, so an output directory
//! lists exactly the record families and metrics that were computed.
//! Undefined floats are written as `NaN`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use vanet_ingest::{metadata_table, Dataset};
use vanet_metrics::{CrossTables, MetricTables};

use crate::error::EngineError;

pub const CAUSAL_STATEMENT_FILE: &str = "causal_statement.txt";

/// Serializes `rows` to `dir/name`. Returns the path when anything was written.
pub fn write_rows<T: Serialize>(
    dir: &Path,
    name: &str,
    rows: &[T],
) -> Result<Option<PathBuf>, EngineError> {
    if rows.is_empty() {
        return Ok(None);
    }
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "table written");
    Ok(Some(path))
}

fn write_records(
    dir: &Path,
    name: &str,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<Option<PathBuf>, EngineError> {
    if rows.is_empty() {
        return Ok(None);
    }
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(Some(path))
}

/// Normalized record tables plus `run_metadata.csv`.
pub fn write_dataset(dir: &Path, dataset: &Dataset) -> Result<Vec<PathBuf>, EngineError> {
    let (headers, rows) = metadata_table(&dataset.metadata);
    Ok([
        write_rows(dir, "vehicle_state.csv", &dataset.vehicle_state)?,
        write_rows(dir, "comm_stats.csv", &dataset.comm_stats)?,
        write_rows(dir, "sionna_phy.csv", &dataset.phy_links)?,
        write_rows(dir, "coexistence_phy.csv", &dataset.coexistence)?,
        write_rows(dir, "msg_log.csv", &dataset.messages)?,
        write_records(dir, "run_metadata.csv", &headers, &rows)?,
    ]
    .into_iter()
    .flatten()
    .collect())
}

pub fn write_metrics(dir: &Path, tables: &MetricTables) -> Result<Vec<PathBuf>, EngineError> {
    Ok([
        write_rows(dir, "behavior_metrics_vehicle.csv", &tables.behavior_vehicle)?,
        write_rows(dir, "behavior_metrics_run.csv", &tables.behavior_run)?,
        write_rows(dir, "comm_metrics_vehicle.csv", &tables.comm_vehicle)?,
        write_rows(dir, "comm_metrics_run.csv", &tables.comm_run)?,
        write_rows(dir, "aoi_metrics_vehicle.csv", &tables.aoi_vehicle)?,
        write_rows(dir, "latency_metrics_run.csv", &tables.latency_run)?,
        write_rows(dir, "reaction_metrics_vehicle.csv", &tables.reaction_vehicle)?,
        write_rows(dir, "reaction_metrics_run.csv", &tables.reaction_run)?,
    ]
    .into_iter()
    .flatten()
    .collect())
}

/// Cross tables when non-empty; the causal statement is always written.
pub fn write_cross(dir: &Path, cross: &CrossTables) -> Result<Vec<PathBuf>, EngineError> {
    let mut written: Vec<PathBuf> = [
        write_rows(dir, "cross_vehicle.csv", &cross.vehicle)?,
        write_rows(dir, "cross_run.csv", &cross.run)?,
    ]
    .into_iter()
    .flatten()
    .collect();

    let statement = dir.join(CAUSAL_STATEMENT_FILE);
    fs::write(&statement, cross.report())?;
    written.push(statement);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        id: Option<String>,
        value: f64,
    }

    #[test]
    fn empty_tables_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<Row> = Vec::new();
        assert_eq!(write_rows(dir.path(), "x.csv", &rows).unwrap(), None);
        assert!(!dir.path().join("x.csv").exists());
    }

    #[test]
    fn missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let rows = [
            Row {
                id: Some("2".into()),
                value: 0.5,
            },
            Row {
                id: None,
                value: f64::NAN,
            },
        ];
        let path = write_rows(dir.path(), "x.csv", &rows).unwrap().unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "id,value\n2,0.5\n,NaN\n"
        );
    }
}
