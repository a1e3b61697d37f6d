//! ## vanet-telemetry::logging
//! **Structured pipeline events**
//!
//! `RUST_LOG` wins over the configured default level. Milestones of a
//! command (`ingest_complete`, `analysis_complete`, `file_skipped`, ...) are
//! emitted through [`EventLogger::log_event`] with OpenTelemetry key-values
//! so they can be filtered by `event_type`.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. A second call is a no-op.
    pub fn init(default_level: &str) {
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::ENTER)
            .try_init();
    }

    #[inline]
    pub fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!(
            "pipeline_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );
        let _guard = span.enter();
        tracing::info!(metadata = ?metadata, "Pipeline event");
    }

    /// Same as [`EventLogger::log_event`] at `warn` level, for skipped input.
    #[inline]
    pub fn log_warning(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!(
            "pipeline_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );
        let _guard = span.enter();
        tracing::warn!(metadata = ?metadata, "Pipeline warning");
    }
}
