//! Metrics for the customer transform
//!
//! Recording goes through the `metrics` facade; `init` installs a Prometheus
//! recorder so the snapshot can be rendered at the end of a run. Without a
//! recorder every call is a no-op, which is what library tests rely on.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Invocation metrics
    InvocationsSuccess,
    InvocationsError,
    InvocationDuration,

    // Row flow metrics
    RowsIngested,
    RowsAfterRecency,
    RowsEmitted,
    RowsDropped,
    InvalidEmails,
    Under18,

    // Output
    OutputBytes,

    // Notifications
    NoticesSent,
    NoticesSkipped,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::InvocationsSuccess => "etl_invocations_success_total",
            MetricName::InvocationsError => "etl_invocations_error_total",
            MetricName::InvocationDuration => "etl_invocation_duration_seconds",
            MetricName::RowsIngested => "etl_rows_ingested_total",
            MetricName::RowsAfterRecency => "etl_rows_after_recency_total",
            MetricName::RowsEmitted => "etl_rows_emitted_total",
            MetricName::RowsDropped => "etl_rows_dropped_total",
            MetricName::InvalidEmails => "etl_invalid_emails_total",
            MetricName::Under18 => "etl_under_18_total",
            MetricName::OutputBytes => "etl_output_bytes",
            MetricName::NoticesSent => "etl_notices_sent_total",
            MetricName::NoticesSkipped => "etl_notices_skipped_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it twice is harmless.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    HANDLE.set(handle).ok();
    info!("Metrics recorder installed");
    Ok(())
}

/// Render the current snapshot in Prometheus text format, if initialized.
pub fn render() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

// ============================================================================
// Invocation Metrics
// ============================================================================

pub mod invocation {
    use super::MetricName;

    pub fn success() {
        ::metrics::counter!(MetricName::InvocationsSuccess.as_str()).increment(1);
    }

    pub fn error(stage: &'static str) {
        ::metrics::counter!(MetricName::InvocationsError.as_str(), "stage" => stage).increment(1);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::InvocationDuration.as_str()).record(secs);
    }

    pub fn output_bytes(bytes: usize) {
        ::metrics::histogram!(MetricName::OutputBytes.as_str()).record(bytes as f64);
    }
}

// ============================================================================
// Row Flow Metrics
// ============================================================================

pub mod rows {
    use super::MetricName;

    pub fn ingested(count: usize) {
        ::metrics::counter!(MetricName::RowsIngested.as_str()).increment(count as u64);
    }

    pub fn after_recency(count: usize) {
        ::metrics::counter!(MetricName::RowsAfterRecency.as_str()).increment(count as u64);
    }

    pub fn emitted(count: usize) {
        ::metrics::counter!(MetricName::RowsEmitted.as_str()).increment(count as u64);
    }

    pub fn dropped(reason: &'static str, count: usize) {
        ::metrics::counter!(MetricName::RowsDropped.as_str(), "reason" => reason)
            .increment(count as u64);
    }

    pub fn invalid_emails(count: usize) {
        ::metrics::counter!(MetricName::InvalidEmails.as_str()).increment(count as u64);
    }

    pub fn under_18(count: usize) {
        ::metrics::counter!(MetricName::Under18.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Notification Metrics
// ============================================================================

pub mod notify {
    use super::MetricName;

    pub fn sent(count: usize) {
        ::metrics::counter!(MetricName::NoticesSent.as_str()).increment(count as u64);
    }

    pub fn skipped(count: usize) {
        ::metrics::counter!(MetricName::NoticesSkipped.as_str()).increment(count as u64);
    }
}
