//! # Vanet Engine
//!
//! Command implementations shared by every frontend: telemetry analysis,
//! collision-risk extraction and the baseline/lossy incident comparison.

pub mod compare;
pub mod error;
pub mod output;
pub mod runtime;

pub use compare::{run_compare, CaseSummary, CompareOptions, TimelineRow};
pub use error::EngineError;
pub use runtime::{run_analysis, run_collision_risk, AnalysisReport};
pub use vanet_risk::{SUMMARY_FILE as RISK_SUMMARY_FILE, TIMESERIES_FILE as RISK_TIMESERIES_FILE};
