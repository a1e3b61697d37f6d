//! ## vanet-schema::records
//! **Typed decode per record kind**
//!
//! Each recognized table is decoded exactly once, stamped with the run it
//! belongs to. Metric engines only ever see these typed rows.

use vanet_core::model::{
    normalize_id, CoexistenceSample, CommStatRow, MessageEvent, PhyLinkSample, RunKey,
    VehicleStateSample,
};
use vanet_core::time::{heuristic_seconds, millis_to_seconds};

use crate::kind::RecordKind;
use crate::table::Table;

pub const ASA_MSG_TYPE: &str = "ASA";
pub const NODE_PRR_MSG_TYPE: &str = "sionna_prr";

/// The records of one decoded table.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedTable {
    VehicleState(Vec<VehicleStateSample>),
    AsaEvent(Vec<CommStatRow>),
    MessageLog(Vec<MessageEvent>),
    PhyLink(Vec<PhyLinkSample>),
    NodePrr(Vec<CommStatRow>),
    CoexistencePhy(Vec<CoexistenceSample>),
}

impl TypedTable {
    pub fn kind(&self) -> RecordKind {
        match self {
            TypedTable::VehicleState(_) => RecordKind::VehicleState,
            TypedTable::AsaEvent(_) => RecordKind::AsaEvent,
            TypedTable::MessageLog(_) => RecordKind::MessageLog,
            TypedTable::PhyLink(_) => RecordKind::PhyLink,
            TypedTable::NodePrr(_) => RecordKind::NodePrr,
            TypedTable::CoexistencePhy(_) => RecordKind::CoexistencePhy,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedTable::VehicleState(v) => v.len(),
            TypedTable::AsaEvent(v) | TypedTable::NodePrr(v) => v.len(),
            TypedTable::MessageLog(v) => v.len(),
            TypedTable::PhyLink(v) => v.len(),
            TypedTable::CoexistencePhy(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classifies `table` and decodes it for `run`. `None` for unknown tables.
pub fn decode(table: &Table, run: &RunKey) -> Option<TypedTable> {
    let decoded = match table.kind() {
        RecordKind::VehicleState => TypedTable::VehicleState(vehicle_state(table, run)),
        RecordKind::AsaEvent => TypedTable::AsaEvent(asa_events(table, run)),
        RecordKind::MessageLog => TypedTable::MessageLog(message_log(table, run)),
        RecordKind::PhyLink => TypedTable::PhyLink(phy_link(table, run)),
        RecordKind::NodePrr => TypedTable::NodePrr(node_prr(table, run)),
        RecordKind::CoexistencePhy => TypedTable::CoexistencePhy(coexistence(table, run)),
        RecordKind::Unknown => {
            tracing::trace!(headers = ?table.headers(), "no record kind matches");
            return None;
        }
    };
    tracing::trace!(kind = decoded.kind().as_str(), rows = decoded.len(), %run, "decoded");
    Some(decoded)
}

fn id_at(table: &Table, row: usize, col: Option<usize>) -> Option<String> {
    table.str_at(row, col).and_then(normalize_id)
}

fn text_at(table: &Table, row: usize, col: Option<usize>) -> Option<String> {
    table.str_at(row, col).map(str::to_string)
}

fn vehicle_state(table: &Table, run: &RunKey) -> Vec<VehicleStateSample> {
    let msg_id = table.column("messageId");
    let cam_id = table.column("camId");
    let ts = table.column("timestamp");
    let lat = table.column("latitude");
    let lon = table.column("longitude");
    let heading = table.column("heading");
    let speed = table.column("speed");
    let accel = table.column("acceleration");

    (0..table.len())
        .map(|i| VehicleStateSample {
            run_id: run.run_id.clone(),
            tech: run.tech,
            vehicle_id: id_at(table, i, cam_id),
            timestamp_ms: table.f64_at(i, ts),
            t_s: f64::NAN,
            lat: table.f64_at(i, lat),
            lon: table.f64_at(i, lon),
            heading_deg: table.f64_at(i, heading),
            speed_mps: table.f64_at(i, speed),
            accel_mps2: table.f64_at(i, accel),
            source_cam_id: text_at(table, i, cam_id),
            message_id: text_at(table, i, msg_id),
        })
        .collect()
}

fn asa_events(table: &Table, run: &RunKey) -> Vec<CommStatRow> {
    let station = table.column("stationID");
    let detection = table.column("detectionTime");
    let reference = table.column("referenceTime");

    (0..table.len())
        .map(|i| {
            let mut raw = table.f64_at(i, detection);
            if raw.is_nan() {
                raw = table.f64_at(i, reference);
            }
            CommStatRow {
                run_id: run.run_id.clone(),
                tech: run.tech,
                vehicle_id: id_at(table, i, station),
                t_s: millis_to_seconds(raw),
                msg_type: ASA_MSG_TYPE.into(),
                sent: 0.0,
                received: 1.0,
                prr: f64::NAN,
            }
        })
        .collect()
}

/// `rx_ok` truncated to an integer code; missing or non-numeric reads as 0.
fn code_at(table: &Table, row: usize, col: Option<usize>) -> i64 {
    let v = table.f64_at(row, col);
    if v.is_finite() {
        v.trunc() as i64
    } else {
        0
    }
}

fn message_log(table: &Table, run: &RunKey) -> Vec<MessageEvent> {
    let vehicle = table.column("vehicle_id");
    let seq = table.column("msg_seq");
    let tx_t = table.column("tx_t_s");
    let rx_t = table.column("rx_t_s");
    let ok = table.column("rx_ok");
    let msg_type = table.column("msg_type");
    let tx_id = table.column("tx_id");
    let rx_id = table.column("rx_id");
    let gdt = table.column("cam_gdt_ms");

    (0..table.len())
        .map(|i| MessageEvent {
            run_id: run.run_id.clone(),
            tech: run.tech,
            vehicle_id: id_at(table, i, vehicle),
            msg_seq: table.i64_at(i, seq),
            tx_t_s: table.f64_at(i, tx_t),
            rx_t_s: table.f64_at(i, rx_t),
            rx_ok: code_at(table, i, ok),
            msg_type: text_at(table, i, msg_type),
            tx_id: id_at(table, i, tx_id),
            rx_id: id_at(table, i, rx_id),
            cam_gdt_ms: table.f64_at(i, gdt),
        })
        .collect()
}

fn phy_link(table: &Table, run: &RunKey) -> Vec<PhyLinkSample> {
    let tx = table.column("tx_id");
    let rx = table.column("rx_id");
    let distance = table.column("distance");
    let rssi = table.column("rssi");
    let snr = table.column("snr");

    (0..table.len())
        .map(|i| PhyLinkSample {
            run_id: run.run_id.clone(),
            tech: run.tech,
            tx_id: id_at(table, i, tx),
            rx_id: id_at(table, i, rx),
            distance: table.f64_at(i, distance),
            rssi: table.f64_at(i, rssi),
            snr: table.f64_at(i, snr),
        })
        .collect()
}

fn node_prr(table: &Table, run: &RunKey) -> Vec<CommStatRow> {
    let node = table.column("node_id");
    let prr = table.column("prr");

    (0..table.len())
        .map(|i| CommStatRow {
            run_id: run.run_id.clone(),
            tech: run.tech,
            vehicle_id: id_at(table, i, node),
            t_s: f64::NAN,
            msg_type: NODE_PRR_MSG_TYPE.into(),
            sent: f64::NAN,
            received: f64::NAN,
            prr: table.f64_at(i, prr),
        })
        .collect()
}

fn coexistence(table: &Table, run: &RunKey) -> Vec<CoexistenceSample> {
    let time = table.column("time");
    let rx = table.column("rx");
    let tx = table.column("tx");
    let rx_lat = table.column("rx_lat");
    let rx_lon = table.column("rx_lon");
    let tx_lat = table.column("tx_lat");
    let tx_lon = table.column("tx_lon");
    let technology = table.column("technology");
    let distance = table.column("distance");
    let los = table.column("los");
    let sinr = table.column("sinr");

    (0..table.len())
        .map(|i| CoexistenceSample {
            run_id: run.run_id.clone(),
            tech: run.tech,
            t_s: heuristic_seconds(table.f64_at(i, time)),
            rx: id_at(table, i, rx),
            tx: id_at(table, i, tx),
            rx_lat: table.f64_at(i, rx_lat),
            rx_lon: table.f64_at(i, rx_lon),
            tx_lat: table.f64_at(i, tx_lat),
            tx_lon: table.f64_at(i, tx_lon),
            technology: text_at(table, i, technology),
            distance: table.f64_at(i, distance),
            los: text_at(table, i, los),
            sinr: table.f64_at(i, sinr),
        })
        .collect()
}
