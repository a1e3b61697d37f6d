//! ## vanet-engine::compare
//! **Baseline versus lossy incident runs on a common timeline**
//!
//! Each run directory is reduced to one row per integer second, built from
//! whatever artifacts it holds: message logs (`*-MSG.csv`), controller
//! actions (`*-CTRL.csv`), collision-risk tables, SUMO collision output and
//! the scenario log. A missing artifact leaves its columns at zero or NaN.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use opentelemetry::KeyValue;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use vanet_core::stats::{nan_min, nan_percentile};
use vanet_risk::{read_collision_times, SUMMARY_FILE, TIMESERIES_FILE};
use vanet_schema::Table;
use vanet_telemetry::EventLogger;

use crate::error::EngineError;
use crate::output::write_rows;

pub const TIMELINE_FILE: &str = "comparison_timeline.csv";
pub const SUMMARY_TABLE_FILE: &str = "comparison_summary.csv";
const SCENARIO_LOG: &str = "v2v-emergencyVehicleAlert-nrv2x.log";
const COLLISION_FILES: [&str; 2] = ["eva-collision.xml", "collision-output.xml"];

#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub baseline_dir: PathBuf,
    pub lossy_dir: PathBuf,
    pub out_dir: PathBuf,
    pub baseline_label: String,
    pub lossy_label: String,
    pub gap_threshold_m: f64,
    pub ttc_threshold_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRow {
    pub time_s: i64,
    pub cam_drop_events: u64,
    pub cam_rx_ok_events: u64,
    pub cam_drop_ratio: f64,
    pub control_actions_per_s: u64,
    pub min_gap_m: f64,
    pub min_ttc_s: f64,
    pub collisions_per_s: u64,
    pub collisions_cum: u64,
    pub case: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseSummary {
    pub case: String,
    pub run_dir: String,
    pub total_cam_drop_events: u64,
    pub total_cam_rx_ok_events: u64,
    pub overall_cam_drop_ratio: f64,
    pub total_control_actions: u64,
    pub first_control_action_s: f64,
    pub p90_control_action_s: f64,
    pub min_gap_m: f64,
    pub min_ttc_s: f64,
    pub risky_gap_events: f64,
    pub risky_ttc_events: f64,
    pub collisions_count: u64,
    pub seconds_below_gap_threshold: u64,
    pub seconds_below_ttc_threshold: u64,
    pub avg_prr: f64,
    pub avg_latency_ms: f64,
    pub incident_time_s: f64,
    pub incident_duration_s: f64,
}

impl CaseSummary {
    fn empty(case: &str, run_dir: &Path) -> Self {
        Self {
            case: case.to_string(),
            run_dir: run_dir.display().to_string(),
            total_cam_drop_events: 0,
            total_cam_rx_ok_events: 0,
            overall_cam_drop_ratio: f64::NAN,
            total_control_actions: 0,
            first_control_action_s: f64::NAN,
            p90_control_action_s: f64::NAN,
            min_gap_m: f64::NAN,
            min_ttc_s: f64::NAN,
            risky_gap_events: f64::NAN,
            risky_ttc_events: f64::NAN,
            collisions_count: 0,
            seconds_below_gap_threshold: 0,
            seconds_below_ttc_threshold: 0,
            avg_prr: f64::NAN,
            avg_latency_ms: f64::NAN,
            incident_time_s: f64::NAN,
            incident_duration_s: f64::NAN,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Second {
    cam_drop: u64,
    cam_ok: u64,
    control: u64,
    min_gap: f64,
    min_ttc: f64,
    collisions: u64,
}

impl Default for Second {
    fn default() -> Self {
        Self {
            cam_drop: 0,
            cam_ok: 0,
            control: 0,
            min_gap: f64::NAN,
            min_ttc: f64::NAN,
            collisions: 0,
        }
    }
}

type Seconds = BTreeMap<i64, Second>;

fn floor_second(t: f64) -> Option<i64> {
    t.is_finite().then(|| t.floor() as i64)
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        f64::NAN
    } else {
        part as f64 / total as f64
    }
}

/// Files directly under `run_dir/artifacts` whose name ends with `suffix`, sorted.
fn artifacts(run_dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(run_dir.join("artifacts"))
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().ends_with(suffix))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Reads a table that must carry every column in `required`.
fn read_with(path: &Path, required: &[&str]) -> Option<Table> {
    match Table::read_path(path) {
        Ok(table) if required.iter().all(|c| table.column(c).is_some()) => Some(table),
        Ok(_) => {
            debug!(path = %path.display(), "missing required columns");
            None
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable artifact");
            None
        }
    }
}

fn load_messages(run_dir: &Path, seconds: &mut Seconds, summary: &mut CaseSummary) {
    for path in artifacts(run_dir, "-MSG.csv") {
        let Some(table) = read_with(&path, &["rx_t_s", "rx_ok", "msg_type"]) else {
            continue;
        };
        let (rx_t, rx_ok, msg_type) = (
            table.column("rx_t_s"),
            table.column("rx_ok"),
            table.column("msg_type"),
        );
        for row in 0..table.len() {
            let Some(sec) = floor_second(table.f64_at(row, rx_t)) else {
                continue;
            };
            let kind = table.str_at(row, msg_type).unwrap_or_default();
            let bucket = seconds.entry(sec).or_default();
            if kind == "CAM_DROP_APP" || kind == "CAM_DROP_PHY" {
                bucket.cam_drop += 1;
                summary.total_cam_drop_events += 1;
            } else if kind == "CAM" && table.f64_at(row, rx_ok) > 0.0 {
                bucket.cam_ok += 1;
                summary.total_cam_rx_ok_events += 1;
            }
        }
    }
    summary.overall_cam_drop_ratio = ratio(
        summary.total_cam_drop_events,
        summary.total_cam_drop_events + summary.total_cam_rx_ok_events,
    );
}

fn load_control(run_dir: &Path, seconds: &mut Seconds, summary: &mut CaseSummary) {
    let mut times = Vec::new();
    for path in artifacts(run_dir, "-CTRL.csv") {
        let Some(table) = read_with(&path, &["time_s"]) else {
            continue;
        };
        let col = table.column("time_s");
        times.extend((0..table.len()).map(|r| table.f64_at(r, col)).filter(|t| t.is_finite()));
    }
    for &t in &times {
        if let Some(sec) = floor_second(t) {
            seconds.entry(sec).or_default().control += 1;
        }
    }
    summary.total_control_actions = times.len() as u64;
    summary.first_control_action_s = nan_min(times.iter().copied());
    summary.p90_control_action_s = nan_percentile(times.iter().copied(), 90.0);
}

fn load_risk(run_dir: &Path, seconds: &mut Seconds, summary: &mut CaseSummary) {
    let dir = run_dir.join("artifacts").join("collision_risk");

    let summary_path = dir.join(SUMMARY_FILE);
    if summary_path.exists() {
        if let Some(table) = read_with(&summary_path, &[]).filter(|t| !t.is_empty()) {
            let at = |name: &str| table.f64_at(0, table.column(name));
            summary.min_gap_m = at("min_gap_m");
            summary.min_ttc_s = at("min_ttc_s");
            summary.risky_gap_events = at("risky_gap_events");
            summary.risky_ttc_events = at("risky_ttc_events");
        }
    }

    let series_path = dir.join(TIMESERIES_FILE);
    if !series_path.exists() {
        return;
    }
    let Some(table) = read_with(&series_path, &["time_s", "min_gap_m", "min_ttc_s"]) else {
        return;
    };
    let (time, gap, ttc) = (
        table.column("time_s"),
        table.column("min_gap_m"),
        table.column("min_ttc_s"),
    );
    for row in 0..table.len() {
        let Some(sec) = floor_second(table.f64_at(row, time)) else {
            continue;
        };
        let bucket = seconds.entry(sec).or_default();
        bucket.min_gap = nan_min([bucket.min_gap, table.f64_at(row, gap)]);
        bucket.min_ttc = nan_min([bucket.min_ttc, table.f64_at(row, ttc)]);
    }
}

fn collision_file(run_dir: &Path) -> Option<PathBuf> {
    COLLISION_FILES
        .iter()
        .map(|name| run_dir.join("artifacts").join(name))
        .find(|p| p.exists())
        .or_else(|| {
            artifacts(run_dir, ".xml").into_iter().find(|p| {
                p.file_name()
                    .is_some_and(|n| n.to_string_lossy().contains("collision"))
            })
        })
}

fn load_collisions(run_dir: &Path, seconds: &mut Seconds, summary: &mut CaseSummary) {
    let Some(path) = collision_file(run_dir) else {
        return;
    };
    let times = match read_collision_times(&path) {
        Ok(times) => times,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable collision output");
            return;
        }
    };
    for &t in &times {
        if let Some(sec) = floor_second(t) {
            seconds.entry(sec).or_default().collisions += 1;
        }
    }
    summary.collisions_count = times.len() as u64;
}

struct LogPatterns {
    prr: Regex,
    latency: Regex,
    incident: Regex,
}

impl LogPatterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            prr: Regex::new(r"Average PRR:\s*([0-9.]+)")?,
            latency: Regex::new(r"Average latency \(ms\):\s*([0-9.]+)")?,
            incident: Regex::new(r"INCIDENT-APPLIED,.*time_s=([0-9.]+).*duration_s=([0-9.]+)")?,
        })
    }
}

fn capture(re: &Regex, text: &str, group: usize) -> Option<f64> {
    re.captures(text)?.get(group)?.as_str().parse().ok()
}

fn parse_log(text: &str, patterns: &LogPatterns, summary: &mut CaseSummary) {
    if let Some(v) = capture(&patterns.prr, text, 1) {
        summary.avg_prr = v;
    }
    if let Some(v) = capture(&patterns.latency, text, 1) {
        summary.avg_latency_ms = v;
    }
    if let Some(caps) = patterns.incident.captures(text) {
        let group = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(f64::NAN)
        };
        summary.incident_time_s = group(1);
        summary.incident_duration_s = group(2);
    }
}

fn build_case(
    run_dir: &Path,
    label: &str,
    options: &CompareOptions,
    patterns: &LogPatterns,
) -> Result<(Vec<TimelineRow>, CaseSummary), EngineError> {
    if !run_dir.is_dir() {
        return Err(EngineError::MissingInput(run_dir.to_path_buf()));
    }
    let mut seconds = Seconds::new();
    let mut summary = CaseSummary::empty(label, run_dir);

    load_messages(run_dir, &mut seconds, &mut summary);
    load_control(run_dir, &mut seconds, &mut summary);
    load_risk(run_dir, &mut seconds, &mut summary);
    load_collisions(run_dir, &mut seconds, &mut summary);

    let log = run_dir.join(SCENARIO_LOG);
    if log.exists() {
        let text = String::from_utf8_lossy(&fs::read(&log)?).into_owned();
        parse_log(&text, patterns, &mut summary);
    }

    let last = seconds.keys().next_back().copied().unwrap_or(0).max(0);
    let mut cumulative = 0;
    let timeline: Vec<TimelineRow> = (0..=last)
        .map(|time_s| {
            let s = seconds.get(&time_s).copied().unwrap_or_default();
            cumulative += s.collisions;
            TimelineRow {
                time_s,
                cam_drop_events: s.cam_drop,
                cam_rx_ok_events: s.cam_ok,
                cam_drop_ratio: ratio(s.cam_drop, s.cam_drop + s.cam_ok),
                control_actions_per_s: s.control,
                min_gap_m: s.min_gap,
                min_ttc_s: s.min_ttc,
                collisions_per_s: s.collisions,
                collisions_cum: cumulative,
                case: label.to_string(),
            }
        })
        .collect();

    summary.seconds_below_gap_threshold = timeline
        .iter()
        .filter(|r| r.min_gap_m < options.gap_threshold_m)
        .count() as u64;
    summary.seconds_below_ttc_threshold = timeline
        .iter()
        .filter(|r| r.min_ttc_s < options.ttc_threshold_s)
        .count() as u64;

    Ok((timeline, summary))
}

/// Builds both cases and writes the long-format timeline and the summary table.
pub fn compare_cases(options: &CompareOptions) -> Result<Vec<CaseSummary>, EngineError> {
    let patterns = LogPatterns::new()?;
    let (mut timeline, baseline) =
        build_case(&options.baseline_dir, &options.baseline_label, options, &patterns)?;
    let (lossy_timeline, lossy) =
        build_case(&options.lossy_dir, &options.lossy_label, options, &patterns)?;
    timeline.extend(lossy_timeline);

    fs::create_dir_all(&options.out_dir)?;
    write_rows(&options.out_dir, TIMELINE_FILE, &timeline)?;
    let summaries = vec![baseline, lossy];
    write_rows(&options.out_dir, SUMMARY_TABLE_FILE, &summaries)?;
    Ok(summaries)
}

#[instrument(level = "info", name = "run_compare", skip_all, fields(baseline = %options.baseline_dir.display(), lossy = %options.lossy_dir.display()))]
pub async fn run_compare(options: CompareOptions) -> Result<Vec<CaseSummary>, EngineError> {
    let out = options.out_dir.clone();
    let summaries = tokio::task::spawn_blocking(move || compare_cases(&options)).await??;

    EventLogger::log_event(
        "compare_complete",
        summaries
            .iter()
            .map(|s| KeyValue::new(format!("{}_collisions", s.case), s.collisions_count as i64))
            .chain([KeyValue::new("out", out.display().to_string())])
            .collect(),
    );
    Ok(summaries)
}
