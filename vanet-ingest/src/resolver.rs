//! ## vanet-ingest::resolver
//! **Run identity from file paths**
//!
//! Sweep outputs live under `.../sweep/<point_id>/...`, and everything below
//! a point directory belongs to that point. Elsewhere the simulator names
//! its files `<run>-veh3.csv`, `<run>-MSG.csv` and so on, so the run id is the
//! stem up to the first recognized suffix token.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path};

use vanet_core::model::{Run, RunKey, Tech};

use crate::metadata::MetadataRecord;

/// Suffix tokens in priority order.
pub const RUN_ID_TOKENS: [&str; 7] = [
    "-veh",
    "-server",
    "-sinr_ni",
    "-phy_with",
    "-prr_with",
    "-MSG",
    "-CAM",
];

pub const SWEEP_SEGMENT: &str = "sweep";

/// The path segment right after the first `sweep` segment, if any.
pub fn extract_sweep_point_id(path: &Path) -> Option<String> {
    let mut parts = path.components().filter_map(|c| match c {
        Component::Normal(s) => Some(s.to_string_lossy()),
        _ => None,
    });
    parts.find(|p| p == SWEEP_SEGMENT)?;
    parts.next().map(|p| p.into_owned())
}

pub fn parse_run_id(path: &Path) -> String {
    if let Some(point) = extract_sweep_point_id(path) {
        return point;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    for token in RUN_ID_TOKENS {
        if let Some(idx) = stem.find(token) {
            return stem[..idx].to_string();
        }
    }
    stem
}

/// Maps input files to registered runs.
#[derive(Debug, Default, Clone)]
pub struct RunResolver {
    tech_overrides: HashMap<String, Tech>,
    metadata: HashMap<String, BTreeMap<String, String>>,
}

impl RunResolver {
    /// Builds a resolver from the `metadata.json` records found under the input.
    ///
    /// A record's `scenario` field overrides the path-derived tech of its
    /// `run_id` when it names a known technology.
    pub fn new(records: &[MetadataRecord]) -> Self {
        let mut resolver = Self::default();
        for record in records {
            let Some(run_id) = record.run_id() else {
                continue;
            };
            let tech = Tech::infer(&record.field("scenario").unwrap_or_default());
            if tech.is_known() {
                resolver.tech_overrides.insert(run_id.clone(), tech);
            }
            resolver
                .metadata
                .entry(run_id)
                .or_insert_with(|| record.flattened());
        }
        resolver
    }

    pub fn tech_for(&self, run_id: &str) -> Tech {
        self.tech_overrides
            .get(run_id)
            .copied()
            .unwrap_or_else(|| Tech::infer(run_id))
    }

    pub fn resolve(&self, path: &Path) -> Run {
        let run_id = parse_run_id(path);
        let tech = self.tech_for(&run_id);
        Run {
            sweep_point: extract_sweep_point_id(path),
            metadata: self.metadata.get(&run_id).cloned().unwrap_or_default(),
            key: RunKey::new(run_id, tech),
        }
    }
}
