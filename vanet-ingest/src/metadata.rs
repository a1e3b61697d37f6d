//! ## vanet-ingest::metadata
//! **Per-run `metadata.json` records**
//!
//! Sweep runners drop a `metadata.json` next to each run's artifacts. Every
//! such file under the input is loaded; unparseable ones are skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use walkdir::WalkDir;

pub const METADATA_FILE: &str = "metadata.json";
pub const METADATA_PATH_KEY: &str = "metadata_path";

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    pub path: PathBuf,
    pub fields: Map<String, Value>,
}

impl MetadataRecord {
    /// Parses a JSON object. Non-object documents are rejected.
    pub fn from_json(path: PathBuf, text: &str) -> Result<Self, serde_json::Error> {
        let fields: Map<String, Value> = serde_json::from_str(text)?;
        Ok(Self { path, fields })
    }

    pub fn field(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(render)
    }

    pub fn run_id(&self) -> Option<String> {
        self.field("run_id").filter(|id| !id.is_empty())
    }

    /// Scalar view of the record, including its source path.
    pub fn flattened(&self) -> BTreeMap<String, String> {
        let mut out: BTreeMap<String, String> = self
            .fields
            .iter()
            .filter_map(|(k, v)| render(v).map(|v| (k.clone(), v)))
            .collect();
        out.insert(
            METADATA_PATH_KEY.into(),
            self.path.to_string_lossy().into_owned(),
        );
        out
    }
}

/// Strings are taken verbatim, `null` is absent, everything else is JSON text.
fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Loads every `metadata.json` below `root`, in path order.
pub fn load_metadata(root: &Path) -> Vec<MetadataRecord> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut records = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == METADATA_FILE)
    {
        let path = entry.into_path();
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                MetadataRecord::from_json(path.clone(), &text).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(record) => records.push(record),
            Err(error) => tracing::warn!(path = %path.display(), %error, "skipping metadata file"),
        }
    }
    records
}

/// Rows of `run_metadata.csv`: union of keys, `run_id` first, rest sorted.
pub fn metadata_table(records: &[MetadataRecord]) -> (Vec<String>, Vec<Vec<String>>) {
    let flat: Vec<BTreeMap<String, String>> =
        records.iter().map(MetadataRecord::flattened).collect();
    let mut keys: BTreeSet<String> = flat.iter().flat_map(|m| m.keys().cloned()).collect();

    let mut headers = Vec::with_capacity(keys.len());
    if keys.remove("run_id") {
        headers.push("run_id".to_string());
    }
    headers.extend(keys);

    let rows = flat
        .iter()
        .map(|m| {
            headers
                .iter()
                .map(|h| m.get(h).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    (headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("sweep/p1");
        let bad = dir.path().join("sweep/p2");
        std::fs::create_dir_all(&good).unwrap();
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(good.join(METADATA_FILE), r#"{"run_id":"p1","mcs":5}"#).unwrap();
        std::fs::write(bad.join(METADATA_FILE), "{not json").unwrap();

        let records = load_metadata(dir.path());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].run_id().as_deref(), Some("p1"));
        assert_eq!(records[0].field("mcs").as_deref(), Some("5"));
    }

    #[test]
    fn table_has_union_of_keys() {
        let a = MetadataRecord::from_json("a/metadata.json".into(), r#"{"run_id":"a","mcs":5}"#)
            .unwrap();
        let b = MetadataRecord::from_json(
            "b/metadata.json".into(),
            r#"{"run_id":"b","txPower":23,"enableSensing":true}"#,
        )
        .unwrap();
        let (headers, rows) = metadata_table(&[a, b]);
        assert_eq!(
            headers,
            ["run_id", "enableSensing", "mcs", "metadata_path", "txPower"]
        );
        assert_eq!(rows[0], ["a", "", "5", "a/metadata.json", ""]);
        assert_eq!(rows[1], ["b", "true", "", "b/metadata.json", "23"]);
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(MetadataRecord::from_json("m.json".into(), "[1,2]").is_err());
    }
}
