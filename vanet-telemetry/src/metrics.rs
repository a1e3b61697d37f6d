//! ## vanet-telemetry::metrics
//! **Prometheus counters for ingestion and analysis**

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub files_ingested: IntCounter,
    pub files_skipped: IntCounter,
    pub records: IntCounterVec,
    pub runs_analyzed: IntCounter,
    pub file_parse_seconds: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let files_ingested = IntCounter::new(
            "vanet_files_ingested_total",
            "Input tables decoded into typed records",
        )?;
        let files_skipped = IntCounter::new(
            "vanet_files_skipped_total",
            "Input files skipped as unreadable, unknown or filtered",
        )?;
        let records = IntCounterVec::new(
            Opts::new("vanet_records_total", "Typed records decoded per kind"),
            &["kind"],
        )?;
        let runs_analyzed =
            IntCounter::new("vanet_runs_analyzed_total", "Runs with computed metrics")?;
        let file_parse_seconds = Histogram::with_opts(
            HistogramOpts::new("vanet_file_parse_seconds", "Per-file read and decode time")
                .buckets(vec![0.001, 0.01, 0.1, 1.0, 10.0]),
        )?;

        registry.register(Box::new(files_ingested.clone()))?;
        registry.register(Box::new(files_skipped.clone()))?;
        registry.register(Box::new(records.clone()))?;
        registry.register(Box::new(runs_analyzed.clone()))?;
        registry.register(Box::new(file_parse_seconds.clone()))?;

        Ok(Self {
            registry,
            files_ingested,
            files_skipped,
            records,
            runs_analyzed,
            file_parse_seconds,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn inc_files_ingested(&self) {
        self.files_ingested.inc();
    }

    pub fn inc_files_skipped(&self) {
        self.files_skipped.inc();
    }

    pub fn add_records(&self, kind: &str, n: usize) {
        self.records.with_label_values(&[kind]).inc_by(n as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_contains_counters() {
        let m = MetricsRecorder::new().unwrap();
        m.inc_files_ingested();
        m.inc_files_skipped();
        m.add_records("message-log", 12);
        m.runs_analyzed.inc_by(2);
        let text = m.gather_metrics().unwrap();
        assert!(text.contains("vanet_files_ingested_total 1"));
        assert!(text.contains("vanet_records_total{kind=\"message-log\"} 12"));
        assert!(text.contains("vanet_runs_analyzed_total 2"));
    }
}
