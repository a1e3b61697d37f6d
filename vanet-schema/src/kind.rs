//! ## vanet-schema::kind
//! **Column-set classification**
//!
//! A table is recognized when its (case-insensitive) header contains every
//! required column of a kind. Kinds are tried in declaration order and the
//! first match wins, so classification does not depend on column order.

use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    VehicleState,
    AsaEvent,
    MessageLog,
    PhyLink,
    NodePrr,
    CoexistencePhy,
    Unknown,
}

impl RecordKind {
    /// Recognized kinds in matching order.
    pub const MATCH_ORDER: [RecordKind; 6] = [
        RecordKind::VehicleState,
        RecordKind::AsaEvent,
        RecordKind::MessageLog,
        RecordKind::PhyLink,
        RecordKind::NodePrr,
        RecordKind::CoexistencePhy,
    ];

    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            RecordKind::VehicleState => &[
                "messageid",
                "camid",
                "timestamp",
                "latitude",
                "longitude",
                "heading",
                "speed",
                "acceleration",
            ],
            RecordKind::AsaEvent => &[
                "messageid",
                "originatingstationid",
                "sequence",
                "referencetime",
                "detectiontime",
                "stationid",
            ],
            RecordKind::MessageLog => &[
                "vehicle_id",
                "msg_seq",
                "tx_t_s",
                "rx_t_s",
                "rx_ok",
                "msg_type",
            ],
            RecordKind::PhyLink => &["tx_id", "rx_id", "distance", "rssi", "snr"],
            RecordKind::NodePrr => &["node_id", "prr"],
            RecordKind::CoexistencePhy => &[
                "time",
                "rx",
                "tx",
                "rx_lat",
                "rx_lon",
                "tx_lat",
                "tx_lon",
                "technology",
                "distance",
                "los",
                "sinr",
            ],
            RecordKind::Unknown => &[],
        }
    }

    /// Classifies a header row.
    pub fn classify<S: AsRef<str>>(headers: &[S]) -> Self {
        let cols: HashSet<String> = headers
            .iter()
            .map(|h| h.as_ref().trim().to_lowercase())
            .collect();
        Self::MATCH_ORDER
            .into_iter()
            .find(|kind| kind.required_columns().iter().all(|c| cols.contains(*c)))
            .unwrap_or(RecordKind::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::VehicleState => "vehicle-state",
            RecordKind::AsaEvent => "asa-event",
            RecordKind::MessageLog => "message-log",
            RecordKind::PhyLink => "phy-link",
            RecordKind::NodePrr => "node-prr",
            RecordKind::CoexistencePhy => "coexistence-phy",
            RecordKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
