//! ## vanet-ingest::discovery
//! **Input file enumeration and sweep filtering**

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use vanet_config::SweepConfig;
use walkdir::WalkDir;

use crate::error::IngestError;
use crate::resolver::{extract_sweep_point_id, SWEEP_SEGMENT};

/// A single file is taken as is; a directory is walked recursively for
/// files with `extension`, returned in sorted path order.
pub fn discover_files(input: &Path, extension: &str) -> Result<Vec<PathBuf>, IngestError> {
    if !input.exists() {
        return Err(IngestError::MissingInput(input.to_path_buf()));
    }
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input) {
        let entry = entry?;
        let matches = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if entry.file_type().is_file() && matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Restricts ingestion to the points of the active sweep definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepFilter {
    ids: Option<BTreeSet<String>>,
}

impl SweepFilter {
    pub fn allow_all() -> Self {
        Self { ids: None }
    }

    pub fn from_ids(ids: BTreeSet<String>) -> Self {
        Self {
            ids: (!ids.is_empty()).then_some(ids),
        }
    }

    /// Active only for a directory input below a `sweep` segment whose sweep
    /// file exists and names at least one point.
    pub fn for_input(input: &Path, sweep_config: &Path) -> Self {
        let in_sweep = input
            .components()
            .any(|c| c.as_os_str() == SWEEP_SEGMENT);
        if !input.is_dir() || !in_sweep || !sweep_config.exists() {
            return Self::allow_all();
        }
        match SweepConfig::load(sweep_config) {
            Ok(cfg) => Self::from_ids(cfg.point_ids()),
            Err(error) => {
                tracing::warn!(path = %sweep_config.display(), %error, "ignoring sweep definition");
                Self::allow_all()
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.ids.is_some()
    }

    /// Files outside any sweep point always pass.
    pub fn admits(&self, path: &Path) -> bool {
        match (&self.ids, extract_sweep_point_id(path)) {
            (Some(ids), Some(point)) => ids.contains(&point),
            _ => true,
        }
    }
}
