//! ## vanet-metrics::comm
//! **Packet reception ratio, age of information and latency**
//!
//! Works on the message log: rows with `rx_ok == 0` are sends by `tx_id`,
//! rows with `rx_ok == 1` are successful receptions at `rx_id` of the send
//! with the same (`tx_id`, `msg_seq`). Other codes are ignored.
//!
//! - PRR of a vehicle: receptions at the vehicle over every send in the run
//!   made by somebody else.
//! - AoI of a vehicle: gaps between its successive receptions.
//! - Latency: receptions joined onto their send, kept inside a
//!   [`LatencyWindow`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use vanet_core::model::{MessageEvent, Tech};
use vanet_core::stats::Spread;

pub const CAM_MSG_TYPE: &str = "CAM";

type RunId<'a> = (&'a str, Tech);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommVehicleMetric {
    pub run_id: String,
    pub tech: Tech,
    pub vehicle_id: String,
    pub sent: u64,
    pub received: u64,
    pub prr: f64,
    pub msg_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommRunMetric {
    pub run_id: String,
    pub tech: Tech,
    pub sent: u64,
    pub received: u64,
    pub prr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AoiMetric {
    pub run_id: String,
    pub tech: Tech,
    pub vehicle_id: String,
    pub aoi_mean_s: f64,
    pub aoi_p95_s: f64,
    pub aoi_max_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyRunMetric {
    pub run_id: String,
    pub tech: Tech,
    pub latency_mean_s: f64,
    pub latency_p95_s: f64,
    pub latency_max_s: f64,
    pub latency_samples: usize,
}

/// Accepted tx→rx latencies: `min_s <= latency < max_s`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyWindow {
    pub min_s: f64,
    pub max_s: f64,
}

impl LatencyWindow {
    pub fn up_to(max_s: f64) -> Self {
        Self { min_s: 0.0, max_s }
    }

    pub fn admits(&self, latency: f64) -> bool {
        latency >= self.min_s && latency < self.max_s
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::up_to(10.0)
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        f64::NAN
    }
}

/// Per-vehicle PRR over the union of senders and receivers of each run.
pub fn prr_by_vehicle(events: &[MessageEvent]) -> Vec<CommVehicleMetric> {
    let mut sent_total: HashMap<RunId, u64> = HashMap::new();
    let mut sent_by: BTreeMap<(RunId, &str), u64> = BTreeMap::new();
    let mut received_by: BTreeMap<(RunId, &str), u64> = BTreeMap::new();

    for e in events {
        let run = (e.run_id.as_str(), e.tech);
        if e.is_send() {
            *sent_total.entry(run).or_default() += 1;
            if let Some(tx) = e.tx_id.as_deref() {
                *sent_by.entry((run, tx)).or_default() += 1;
            }
        } else if e.is_reception() {
            if let Some(rx) = e.rx_id.as_deref() {
                *received_by.entry((run, rx)).or_default() += 1;
            }
        }
    }

    let vehicles: BTreeSet<(RunId, &str)> =
        sent_by.keys().chain(received_by.keys()).copied().collect();
    vehicles
        .into_iter()
        .map(|(run @ (run_id, tech), vehicle)| {
            let total = sent_total.get(&run).copied().unwrap_or(0);
            let own = sent_by.get(&(run, vehicle)).copied().unwrap_or(0);
            let received = received_by.get(&(run, vehicle)).copied().unwrap_or(0);
            let expected = total.saturating_sub(own);
            CommVehicleMetric {
                run_id: run_id.to_string(),
                tech,
                vehicle_id: vehicle.to_string(),
                sent: expected,
                received,
                prr: ratio(received, expected),
                msg_type: CAM_MSG_TYPE.into(),
            }
        })
        .collect()
}

/// Run PRR as Σreceived / Σsent over the vehicle table.
pub fn prr_by_run(vehicles: &[CommVehicleMetric]) -> Vec<CommRunMetric> {
    let mut sums: BTreeMap<RunId, (u64, u64)> = BTreeMap::new();
    for v in vehicles {
        let entry = sums.entry((v.run_id.as_str(), v.tech)).or_default();
        entry.0 += v.sent;
        entry.1 += v.received;
    }
    sums.into_iter()
        .map(|((run_id, tech), (sent, received))| CommRunMetric {
            run_id: run_id.to_string(),
            tech,
            sent,
            received,
            prr: ratio(received, sent),
        })
        .collect()
}

/// AoI per receiving vehicle; vehicles with fewer than two receptions are left out.
pub fn aoi_by_vehicle(events: &[MessageEvent]) -> Vec<AoiMetric> {
    let mut rx_times: BTreeMap<(RunId, &str), Vec<f64>> = BTreeMap::new();
    for e in events.iter().filter(|e| e.is_reception()) {
        let Some(rx) = e.rx_id.as_deref() else {
            continue;
        };
        if e.rx_t_s.is_finite() {
            rx_times
                .entry(((e.run_id.as_str(), e.tech), rx))
                .or_default()
                .push(e.rx_t_s);
        }
    }

    rx_times
        .into_iter()
        .filter(|(_, t)| t.len() >= 2)
        .map(|(((run_id, tech), vehicle), mut t)| {
            t.sort_by(f64::total_cmp);
            let gaps: Vec<f64> = t.windows(2).map(|w| w[1] - w[0]).collect();
            let spread = Spread::of(&gaps);
            AoiMetric {
                run_id: run_id.to_string(),
                tech,
                vehicle_id: vehicle.to_string(),
                aoi_mean_s: spread.mean,
                aoi_p95_s: spread.p95,
                aoi_max_s: spread.max,
            }
        })
        .collect()
}

/// All admitted latencies per run, from an explicit join of receptions onto
/// sends keyed by (run, tech, sender, sequence). Rows without a sender or
/// sequence number cannot be joined and are ignored.
pub fn matched_latencies(
    events: &[MessageEvent],
    window: LatencyWindow,
) -> BTreeMap<(String, Tech), Vec<f64>> {
    let mut sends: HashMap<(RunId, &str, i64), Vec<f64>> = HashMap::new();
    for e in events.iter().filter(|e| e.is_send()) {
        if let (Some(tx), Some(seq)) = (e.tx_id.as_deref(), e.msg_seq) {
            if e.tx_t_s.is_finite() {
                sends
                    .entry(((e.run_id.as_str(), e.tech), tx, seq))
                    .or_default()
                    .push(e.tx_t_s);
            }
        }
    }

    let mut out: BTreeMap<(String, Tech), Vec<f64>> = BTreeMap::new();
    for e in events.iter().filter(|e| e.is_reception()) {
        let (Some(tx), Some(seq)) = (e.tx_id.as_deref(), e.msg_seq) else {
            continue;
        };
        if !e.rx_t_s.is_finite() {
            continue;
        }
        let Some(tx_times) = sends.get(&((e.run_id.as_str(), e.tech), tx, seq)) else {
            continue;
        };
        for tx_t in tx_times {
            let latency = e.rx_t_s - tx_t;
            if window.admits(latency) {
                out.entry((e.run_id.clone(), e.tech))
                    .or_default()
                    .push(latency);
            }
        }
    }
    out
}

pub fn latency_by_run(events: &[MessageEvent], window: LatencyWindow) -> Vec<LatencyRunMetric> {
    matched_latencies(events, window)
        .into_iter()
        .map(|((run_id, tech), samples)| {
            let spread = Spread::of(&samples);
            LatencyRunMetric {
                run_id,
                tech,
                latency_mean_s: spread.mean,
                latency_p95_s: spread.p95,
                latency_max_s: spread.max,
                latency_samples: samples.len(),
            }
        })
        .collect()
}

/// All reliability tables of one message log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommMetrics {
    pub vehicles: Vec<CommVehicleMetric>,
    pub runs: Vec<CommRunMetric>,
    pub aoi: Vec<AoiMetric>,
    pub latency: Vec<LatencyRunMetric>,
}

pub struct CommEngine {
    window: LatencyWindow,
}

impl CommEngine {
    pub fn new(window: LatencyWindow) -> Self {
        Self { window }
    }

    pub fn compute(&self, events: &[MessageEvent]) -> CommMetrics {
        let vehicles = prr_by_vehicle(events);
        let runs = prr_by_run(&vehicles);
        CommMetrics {
            aoi: aoi_by_vehicle(events),
            latency: latency_by_run(events, self.window),
            vehicles,
            runs,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    pub(crate) fn send(run: &str, tx: &str, seq: i64, t: f64) -> MessageEvent {
        MessageEvent {
            run_id: run.into(),
            tech: Tech::NrV2x,
            vehicle_id: Some(tx.into()),
            msg_seq: Some(seq),
            tx_t_s: t,
            rx_t_s: f64::NAN,
            rx_ok: 0,
            msg_type: Some("CAM".into()),
            tx_id: Some(tx.into()),
            rx_id: None,
            cam_gdt_ms: f64::NAN,
        }
    }

    pub(crate) fn recv(run: &str, tx: &str, rx: &str, seq: i64, tx_t: f64, rx_t: f64) -> MessageEvent {
        MessageEvent {
            vehicle_id: Some(rx.into()),
            rx_t_s: rx_t,
            rx_ok: 1,
            rx_id: Some(rx.into()),
            ..send(run, tx, seq, tx_t)
        }
    }

    fn example() -> Vec<MessageEvent> {
        vec![
            send("r", "X", 0, 0.0),
            send("r", "X", 1, 1.0),
            send("r", "X", 2, 2.0),
            recv("r", "X", "Y", 0, 0.0, 0.1),
            recv("r", "X", "Y", 1, 1.0, 1.2),
            recv("r", "X", "Y", 2, 2.0, 5.3),
        ]
    }

    #[test]
    fn latency_and_aoi_example() {
        let events = example();
        let lat = matched_latencies(&events, LatencyWindow::default());
        let samples = &lat[&("r".to_string(), Tech::NrV2x)];
        let expected = [0.1, 0.2, 3.3];
        assert_eq!(samples.len(), 3);
        for (got, want) in samples.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }

        let aoi = aoi_by_vehicle(&events);
        assert_eq!(aoi.len(), 1);
        assert_eq!(aoi[0].vehicle_id, "Y");
        assert!((aoi[0].aoi_mean_s - 2.6).abs() < 1e-9);
        assert!((aoi[0].aoi_max_s - 4.1).abs() < 1e-9);
    }

    #[test]
    fn latency_window_discards_out_of_range() {
        let events = vec![
            send("r", "X", 0, 5.0),
            recv("r", "X", "Y", 0, 5.0, 4.0),
            send("r", "X", 1, 0.0),
            recv("r", "X", "Y", 1, 0.0, 10.0),
            send("r", "X", 2, 0.0),
            recv("r", "X", "Y", 2, 0.0, 9.5),
        ];
        let runs = latency_by_run(&events, LatencyWindow::default());
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].latency_samples, 1);
        assert_eq!(runs[0].latency_max_s, 9.5);
    }

    #[test]
    fn prr_counts_sends_by_others() {
        let events = example();
        let vehicles = prr_by_vehicle(&events);
        let x = vehicles.iter().find(|v| v.vehicle_id == "X").unwrap();
        let y = vehicles.iter().find(|v| v.vehicle_id == "Y").unwrap();
        assert_eq!(x.sent, 0);
        assert!(x.prr.is_nan());
        // Y never sends, so every send in the run is expected at Y.
        assert_eq!(y.sent, 3);
        assert_eq!(y.received, 3);
        assert_eq!(y.prr, 1.0);

        let runs = prr_by_run(&vehicles);
        assert_eq!(runs[0].sent, 3);
        assert_eq!(runs[0].prr, 1.0);
    }

    #[test]
    fn unknown_rx_codes_join_neither_side() {
        let mut events = example();
        events.push(MessageEvent {
            rx_ok: 2,
            ..send("r", "X", 3, 3.0)
        });
        events.push(MessageEvent {
            rx_ok: 2,
            ..recv("r", "X", "Y", 3, 3.0, 3.1)
        });

        let vehicles = prr_by_vehicle(&events);
        let y = vehicles.iter().find(|v| v.vehicle_id == "Y").unwrap();
        assert_eq!(y.sent, 3);
        assert_eq!(y.received, 3);

        let aoi = aoi_by_vehicle(&events);
        assert!((aoi[0].aoi_max_s - 4.1).abs() < 1e-9);

        let lat = matched_latencies(&events, LatencyWindow::default());
        assert_eq!(lat[&("r".to_string(), Tech::NrV2x)].len(), 3);
    }

    #[test]
    fn single_reception_has_no_aoi() {
        let events = vec![recv("r", "X", "Y", 0, 0.0, 0.1)];
        assert!(aoi_by_vehicle(&events).is_empty());
    }

    proptest! {
        #[test]
        fn run_prr_is_order_independent(
            rows in proptest::collection::vec((0u8..4, 0u8..4, any::<bool>()), 1..60),
            rotate in 0usize..60,
        ) {
            let events: Vec<MessageEvent> = rows
                .iter()
                .enumerate()
                .map(|(i, (tx, rx, ok))| {
                    let (tx, rx) = (tx.to_string(), rx.to_string());
                    if *ok {
                        recv("r", &tx, &rx, i as i64, 0.0, 0.1)
                    } else {
                        send("r", &tx, i as i64, 0.0)
                    }
                })
                .collect();
            let mut shuffled = events.clone();
            shuffled.reverse();
            let len = shuffled.len();
            shuffled.rotate_left(rotate % len);

            let vehicles = prr_by_vehicle(&events);
            let sent: u64 = vehicles.iter().map(|v| v.sent).sum();
            let received: u64 = vehicles.iter().map(|v| v.received).sum();
            let a = prr_by_run(&vehicles);
            let b = prr_by_run(&prr_by_vehicle(&shuffled));
            prop_assert_eq!(a.len(), 1);
            prop_assert_eq!(b.len(), 1);
            prop_assert_eq!((a[0].sent, a[0].received), (b[0].sent, b[0].received));
            prop_assert_eq!(a[0].sent, sent);
            prop_assert_eq!(a[0].received, received);
            if sent > 0 {
                prop_assert!((a[0].prr - received as f64 / sent as f64).abs() < 1e-12);
            } else {
                prop_assert!(a[0].prr.is_nan());
            }
        }
    }
}
