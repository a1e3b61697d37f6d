//! # vanet-core
//!
//! Foundation layer shared by every analysis stage: the typed record model
//! produced at ingestion, the run-relative clock, and the NaN-aware numeric
//! helpers the metric engines aggregate with.
//!
//! ### Key Submodules:
//! - `model`: runs, technology tags and the typed telemetry records
//! - `time`: per-vehicle clock rebasing and the ms/µs unit heuristic
//! - `geo`: great-circle distance
//! - `stats`: NaN-ignoring min/max/mean/median/percentile

pub mod geo;
pub mod model;
pub mod stats;
pub mod time;

pub mod prelude {
    pub use crate::geo::*;
    pub use crate::model::*;
    pub use crate::stats::*;
    pub use crate::time::*;
}
