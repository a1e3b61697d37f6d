use std::fs;
use std::path::Path;

use vanet_config::AnalysisConfig;
use vanet_engine::{run_analysis, EngineError};
use vanet_telemetry::MetricsRecorder;

fn write(dir: &Path, rel: &str, body: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn fixture(root: &Path) {
    write(
        root,
        "eva_nrv2x/eva_nrv2x-veh1.csv",
        "messageId,camId,timestamp,latitude,longitude,heading,speed,acceleration\n\
         2,1,1000,45.0,7.0,0,10,0\n\
         2,1,1500,45.0,7.0001,0,9,-2.5\n\
         2,1,2000,45.0,7.0002,0,7,-4.0\n",
    );
    write(
        root,
        "eva_nrv2x/eva_nrv2x-MSG.csv",
        "vehicle_id,msg_seq,tx_t_s,rx_t_s,rx_ok,msg_type,tx_id,rx_id\n\
         2,0,0.0,,0,CAM,2,\n\
         1,0,0.0,0.05,1,CAM,2,1\n\
         2,1,1.0,,0,CAM,2,\n\
         1,1,1.0,1.2,1,CAM,2,1\n",
    );
    write(
        root,
        "eva_nrv2x/metadata.json",
        r#"{"run_id": "eva_nrv2x", "txPower": 23, "scenario": "eva"}"#,
    );
}

#[tokio::test]
async fn analyze_writes_metric_tables() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("runs");
    let out = dir.path().join("out");
    fixture(&input);

    let config = AnalysisConfig::default();
    let metrics = MetricsRecorder::new().unwrap();

    let report = run_analysis(&input, &out, &config, &metrics).await.unwrap();
    assert_eq!(report.runs, 1);

    for name in [
        "vehicle_state.csv",
        "msg_log.csv",
        "run_metadata.csv",
        "behavior_metrics_vehicle.csv",
        "behavior_metrics_run.csv",
        "comm_metrics_vehicle.csv",
        "comm_metrics_run.csv",
        "latency_metrics_run.csv",
        "reaction_metrics_run.csv",
        "cross_run.csv",
        "causal_statement.txt",
    ] {
        assert!(out.join(name).exists(), "{name} not written");
    }
    assert!(!out.join("sionna_phy.csv").exists());

    let metadata = fs::read_to_string(out.join("run_metadata.csv")).unwrap();
    assert!(metadata.starts_with("run_id,"));
    assert!(metadata.contains("txPower"));

    assert_eq!(metrics.runs_analyzed.get(), 1);
    assert_eq!(metrics.files_ingested.get(), 2);
    let exported = metrics.gather_metrics().unwrap();
    assert!(exported.contains("vanet_runs_analyzed_total 1"));
}

/// Rows of `behavior_metrics_vehicle.csv` keyed by vehicle id.
fn behavior_rows(out: &Path) -> Vec<(String, f64, u32)> {
    let mut reader = csv::Reader::from_path(out.join("behavior_metrics_vehicle.csv")).unwrap();
    let headers = reader.headers().unwrap().clone();
    let col = |name: &str| headers.iter().position(|h| h == name).unwrap();
    let (vehicle, brake, stops) = (
        col("vehicle_id"),
        col("time_to_first_brake"),
        col("stop_count"),
    );
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            (
                r[vehicle].to_string(),
                r[brake].parse().unwrap(),
                r[stops].parse().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn behavior_metrics_follow_10hz_cams() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("runs");
    let out = dir.path().join("out");

    let mut cams =
        String::from("messageId,camId,timestamp,latitude,longitude,heading,speed,acceleration\n");
    // Vehicle 3 decelerates hard for two samples at constant speed.
    for (k, accel) in [0.0, -3.0, -3.0, 0.0, 0.0].iter().enumerate() {
        cams.push_str(&format!("2,3,{},45.0,7.0,0,10,{accel}\n", 1000 + 100 * k));
    }
    // Vehicle 4 stands still from 0.0 s and moves off at 1.0 s.
    for k in 0..=10 {
        let speed = if k == 10 { 5.0 } else { 0.0 };
        cams.push_str(&format!("2,4,{},45.0,7.0,0,{speed},0\n", 5000 + 100 * k));
    }
    write(&input, "eva_nrv2x/eva_nrv2x-veh3.csv", &cams);

    let metrics = MetricsRecorder::new().unwrap();
    run_analysis(&input, &out, &AnalysisConfig::default(), &metrics)
        .await
        .unwrap();

    let rows = behavior_rows(&out);
    assert_eq!(rows.len(), 2);
    let (id, brake, stops) = &rows[0];
    assert_eq!(id, "3");
    assert!((brake - 0.1).abs() < 1e-9, "brake at {brake}");
    assert_eq!(*stops, 0);
    let (id, brake, stops) = &rows[1];
    assert_eq!(id, "4");
    assert!(brake.is_nan());
    assert_eq!(*stops, 1);
}

#[tokio::test]
async fn empty_input_still_reports() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("runs");
    fs::create_dir_all(&input).unwrap();
    let out = dir.path().join("out");

    let metrics = MetricsRecorder::new().unwrap();
    let report = run_analysis(&input, &out, &AnalysisConfig::default(), &metrics)
        .await
        .unwrap();
    assert_eq!(report.runs, 0);
    let statement = fs::read_to_string(out.join("causal_statement.txt")).unwrap();
    assert!(statement.contains("Insufficient sweep data"));
}

#[tokio::test]
async fn missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = MetricsRecorder::new().unwrap();
    let err = run_analysis(
        &dir.path().join("absent"),
        &dir.path().join("out"),
        &AnalysisConfig::default(),
        &metrics,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::MissingInput(_)));
}
