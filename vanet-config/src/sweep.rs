//! Parameter sweep definitions.
//!
//! A sweep file either lists its points explicitly:
//!
//! ```yaml
//! sweep_points:
//!   - id: p_tx23
//!     txPower: 23
//! ```
//!
//! or gives value lists whose cross-product forms the points:
//!
//! ```yaml
//! sweep:
//!   txPower: [10, 23]
//!   mcs: [5]
//! ```
//!
//! Points without an explicit `id` are named by joining their sorted
//! `key-value` pairs with `_` and dropping anything outside `[A-Za-z0-9_-]`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::ConfigError;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SweepPoint {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

impl SweepPoint {
    /// The explicit id, or the slug derived from the parameters.
    pub fn point_id(&self) -> String {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let joined = self
                    .params
                    .iter()
                    .map(|(k, v)| format!("{}-{}", k, render(v)))
                    .collect::<Vec<_>>()
                    .join("_");
                slugify(&joined)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SweepConfig {
    #[serde(default)]
    pub sweep_points: Option<Vec<SweepPoint>>,
    #[serde(default)]
    pub sweep: Option<serde_yaml::Mapping>,
}

impl SweepConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        let parsed: Option<Self> = serde_yaml::from_str(text)?;
        Ok(parsed.unwrap_or_default())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Sweep {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Expands the definition into concrete points.
    pub fn points(&self) -> Vec<SweepPoint> {
        if let Some(points) = &self.sweep_points {
            return points.clone();
        }
        let Some(sweep) = &self.sweep else {
            return Vec::new();
        };

        let mut points = vec![SweepPoint::default()];
        for (key, values) in sweep {
            let Some(key) = key.as_str() else { continue };
            let values = match values {
                Value::Sequence(seq) => seq.clone(),
                scalar => vec![scalar.clone()],
            };
            points = points
                .into_iter()
                .flat_map(|p| {
                    values.iter().map(move |v| {
                        let mut next = p.clone();
                        next.params.insert(key.to_string(), v.clone());
                        next
                    })
                })
                .collect();
        }
        points
    }

    pub fn point_ids(&self) -> BTreeSet<String> {
        self.points()
            .iter()
            .map(SweepPoint::point_id)
            .filter(|id| !id.is_empty())
            .collect()
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        Value::Number(n) => n.to_string(),
        Value::Null => "None".into(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

pub fn slugify(s: &str) -> String {
    s.replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
