//! ## vanet-core::model
//! **Typed telemetry records**
//!
//! Every table accepted at ingestion is decoded once into one of the record
//! types below. Numeric fields that were absent or unparseable are carried as
//! `f64::NAN`; identifiers that were absent are `None`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Radio access technology a run was simulated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tech {
    #[serde(rename = "80211p")]
    Ieee80211p,
    #[serde(rename = "nrv2x")]
    NrV2x,
    #[serde(rename = "cv2x")]
    CV2x,
    #[serde(rename = "lte")]
    Lte,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Tech {
    /// Infers the technology from a free-form label (run id, scenario name).
    ///
    /// Matching is a case-insensitive substring test; the order matters because
    /// `ltev2x` and `cv2x` both contain shorter keywords.
    pub fn infer(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("80211p") {
            Tech::Ieee80211p
        } else if label.contains("nrv2x") {
            Tech::NrV2x
        } else if label.contains("cv2x") || label.contains("ltev2x") {
            Tech::CV2x
        } else if label.contains("lte") {
            Tech::Lte
        } else {
            Tech::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tech::Ieee80211p => "80211p",
            Tech::NrV2x => "nrv2x",
            Tech::CV2x => "cv2x",
            Tech::Lte => "lte",
            Tech::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Tech::Unknown
    }
}

impl fmt::Display for Tech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one simulation run as used for every join in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunKey {
    pub run_id: String,
    pub tech: Tech,
}

impl RunKey {
    pub fn new(run_id: impl Into<String>, tech: Tech) -> Self {
        Self {
            run_id: run_id.into(),
            tech,
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.run_id, self.tech)
    }
}

/// A run as resolved at ingestion time. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub key: RunKey,
    /// Sweep point the run belongs to, when it was produced by a parameter sweep.
    pub sweep_point: Option<String>,
    /// Scalar configuration recorded next to the run (`metadata.json`).
    pub metadata: BTreeMap<String, String>,
}

/// Records that belong to exactly one run.
pub trait RunScoped {
    fn run_id(&self) -> &str;
    fn tech(&self) -> Tech;

    fn run_key(&self) -> RunKey {
        RunKey::new(self.run_id(), self.tech())
    }
}

macro_rules! run_scoped {
    ($($ty:ty),+ $(,)?) => {
        $(impl RunScoped for $ty {
            fn run_id(&self) -> &str {
                &self.run_id
            }
            fn tech(&self) -> Tech {
                self.tech
            }
        })+
    };
}

/// One kinematic sample of one vehicle (decoded from CAM state tables).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleStateSample {
    pub run_id: String,
    pub tech: Tech,
    pub vehicle_id: Option<String>,
    pub timestamp_ms: f64,
    /// Seconds since the first sample of this (run, vehicle). Filled by
    /// [`crate::time::rebase_vehicle_clocks`].
    pub t_s: f64,
    pub lat: f64,
    pub lon: f64,
    pub heading_deg: f64,
    pub speed_mps: f64,
    pub accel_mps2: f64,
    #[serde(rename = "source_camId")]
    pub source_cam_id: Option<String>,
    pub message_id: Option<String>,
}

/// Role of a message-log row, from its integer `rx_ok` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxStatus {
    Send,
    Reception,
    /// Any other code; the row takes part in neither side of the join.
    Ignored,
}

/// One row of a message log: a send (`rx_ok == 0`) or a successful
/// reception (`rx_ok == 1`) of the same sequence number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageEvent {
    pub run_id: String,
    pub tech: Tech,
    pub vehicle_id: Option<String>,
    pub msg_seq: Option<i64>,
    pub tx_t_s: f64,
    pub rx_t_s: f64,
    pub rx_ok: i64,
    pub msg_type: Option<String>,
    pub tx_id: Option<String>,
    pub rx_id: Option<String>,
    pub cam_gdt_ms: f64,
}

impl MessageEvent {
    pub fn status(&self) -> RxStatus {
        match self.rx_ok {
            0 => RxStatus::Send,
            1 => RxStatus::Reception,
            _ => RxStatus::Ignored,
        }
    }

    pub fn is_send(&self) -> bool {
        self.status() == RxStatus::Send
    }

    pub fn is_reception(&self) -> bool {
        self.status() == RxStatus::Reception
    }
}

/// Aggregate communication figures reported by a source other than the
/// message log (emergency/ASA events, per-node PRR tables).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommStatRow {
    pub run_id: String,
    pub tech: Tech,
    pub vehicle_id: Option<String>,
    pub t_s: f64,
    pub msg_type: String,
    pub sent: f64,
    pub received: f64,
    pub prr: f64,
}

/// Physical-layer link sample from the ray-tracing channel model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhyLinkSample {
    pub run_id: String,
    pub tech: Tech,
    pub tx_id: Option<String>,
    pub rx_id: Option<String>,
    pub distance: f64,
    pub rssi: f64,
    pub snr: f64,
}

/// Physical-layer sample from a multi-technology coexistence run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoexistenceSample {
    pub run_id: String,
    pub tech: Tech,
    pub t_s: f64,
    pub rx: Option<String>,
    pub tx: Option<String>,
    pub rx_lat: f64,
    pub rx_lon: f64,
    pub tx_lat: f64,
    pub tx_lon: f64,
    pub technology: Option<String>,
    pub distance: f64,
    pub los: Option<String>,
    pub sinr: f64,
}

run_scoped!(
    VehicleStateSample,
    MessageEvent,
    CommStatRow,
    PhyLinkSample,
    CoexistenceSample,
);

/// Canonical form of an entity identifier.
///
/// Identifiers arrive as integers, floats (`"2.0"`) or free text depending on
/// the writer. Integral numbers are printed without a fraction so that the
/// same station compares equal across tables. Empty and `nan` are missing.
pub fn normalize_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
            Some(format!("{}", v as i64))
        }
        _ => Some(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_tech_from_labels() {
        assert_eq!(Tech::infer("eva_80211p-veh1"), Tech::Ieee80211p);
        assert_eq!(Tech::infer("v2v-emergencyVehicleAlert-nrv2x"), Tech::NrV2x);
        assert_eq!(Tech::infer("highway-LTEV2X"), Tech::CV2x);
        assert_eq!(Tech::infer("cv2x_run"), Tech::CV2x);
        assert_eq!(Tech::infer("lte_baseline"), Tech::Lte);
        assert_eq!(Tech::infer("p_tx23"), Tech::Unknown);
    }

    #[test]
    fn normalizes_numeric_ids() {
        assert_eq!(normalize_id("2"), Some("2".into()));
        assert_eq!(normalize_id("2.0"), Some("2".into()));
        assert_eq!(normalize_id(" veh_7 "), Some("veh_7".into()));
        assert_eq!(normalize_id("2.5"), Some("2.5".into()));
        assert_eq!(normalize_id(""), None);
        assert_eq!(normalize_id("NaN"), None);
    }

    #[test]
    fn run_key_orders_by_run_then_tech() {
        let a = RunKey::new("a", Tech::NrV2x);
        let b = RunKey::new("a", Tech::Unknown);
        let c = RunKey::new("b", Tech::Ieee80211p);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.to_string(), "a/nrv2x");
    }
}
