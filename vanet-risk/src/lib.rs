//! # Vanet Risk
//!
//! Collision-risk proxies from lane-based mobility dumps.
//!
//! ## Key Components:
//! - **Netstate reader:** streams `timestep` elements of a SUMO netstate dump.
//! - **Risk analyzer:** minimum same-lane gap and time to collision per timestep.
//! - **Collision reader:** event times from SUMO collision output.

use std::fs;
use std::path::Path;

use opentelemetry::KeyValue;
use tracing::{debug, instrument};

use vanet_config::RiskConfig;
use vanet_telemetry::EventLogger;

pub mod analyzer;
pub mod collision;
pub mod error;
pub mod netstate;

pub use analyzer::{RiskAnalyzer, RiskSample, RiskSummary};
pub use collision::{collision_times, read_collision_times};
pub use error::RiskError;
pub use netstate::{LaneVehicle, NetstateReader, Timestep};

pub const TIMESERIES_FILE: &str = "collision_risk_timeseries.csv";
pub const SUMMARY_FILE: &str = "collision_risk_summary.csv";

/// Analyzes a netstate dump and writes the timeseries and summary tables
/// into `out_dir`. The timeseries is written while the dump is read.
#[instrument(skip_all, fields(netstate = %netstate.display()))]
pub fn analyze_netstate(
    netstate: &Path,
    thresholds: RiskConfig,
    out_dir: &Path,
) -> Result<RiskSummary, RiskError> {
    let reader = NetstateReader::open(netstate)?;
    fs::create_dir_all(out_dir)?;

    let mut series = csv::Writer::from_path(out_dir.join(TIMESERIES_FILE))?;
    series.write_record(RiskSample::HEADER)?;

    let mut analyzer = RiskAnalyzer::new(thresholds);
    for step in reader {
        let sample = analyzer.observe(&step?);
        series.write_record(sample.record())?;
    }
    series.flush()?;

    let summary = analyzer.finish();
    let mut out = csv::Writer::from_path(out_dir.join(SUMMARY_FILE))?;
    out.write_record(RiskSummary::HEADER)?;
    out.write_record(summary.record())?;
    out.flush()?;

    debug!(?summary, "risk tables written");
    EventLogger::log_event(
        "risk_complete",
        vec![
            KeyValue::new("timesteps", summary.timesteps as i64),
            KeyValue::new("risky_gap_events", summary.risky_gap_events as i64),
            KeyValue::new("risky_ttc_events", summary.risky_ttc_events as i64),
        ],
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"<netstate>
  <timestep time="0.00">
    <edge id="e"><lane id="e_0">
      <vehicle id="rear" pos="10.00" speed="12.00"/>
      <vehicle id="front" pos="15.00" speed="9.00"/>
    </lane></edge>
  </timestep>
  <timestep time="0.50">
    <edge id="e"><lane id="e_0">
      <vehicle id="rear" pos="16.00" speed="12.00"/>
    </lane></edge>
  </timestep>
</netstate>"#;

    #[test]
    fn writes_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("netstate.xml");
        fs::write(&dump, DUMP).unwrap();
        let out = dir.path().join("risk");

        let summary = analyze_netstate(&dump, RiskConfig::default(), &out).unwrap();
        assert_eq!(summary.timesteps, 2);

        let series = fs::read_to_string(out.join(TIMESERIES_FILE)).unwrap();
        let lines: Vec<_> = series.lines().collect();
        assert_eq!(lines[0], "time_s,min_gap_m,min_ttc_s,vehicles");
        assert_eq!(lines[1], "0.0,5.0,1.6666666666666667,2");
        assert_eq!(lines[2], "0.5,,,1");

        let table = fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
        assert_eq!(
            table.lines().nth(1),
            Some("2,1.500,5.000,1.667,0,0")
        );
    }

    #[test]
    fn missing_dump_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = analyze_netstate(&dir.path().join("nope.xml"), RiskConfig::default(), dir.path())
            .unwrap_err();
        assert!(matches!(err, RiskError::MissingInput(_)));
    }
}
