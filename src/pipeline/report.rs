use tracing::info;

use crate::observability::metrics;
use crate::pipeline::processing::quality_gate::{DropReason, GroupCounts, ValidationSummary};

/// Render group counts as a compact `{"label":count}` object.
pub fn format_group_counts(counts: &GroupCounts) -> String {
    serde_json::to_string(counts).unwrap_or_else(|_| "{}".to_string())
}

/// Emit the aggregate report as structured log events and metrics.
///
/// Observability only: nothing here ends up in the destination object or
/// the invocation result.
pub fn report_aggregates(summary: &ValidationSummary) {
    info!(
        age_group_counts = %format_group_counts(&summary.age_group_counts),
        "Age Group Counts"
    );
    info!(
        balance_group_counts = %format_group_counts(&summary.balance_group_counts),
        "Balance Group Counts"
    );
    info!(invalid_email_count = summary.invalid_email_count, "Invalid Email Count");
    info!(under_18_count = summary.under_18_count, "Under Age 18 Count");
    info!(
        rows_in = summary.rows_in,
        rows_out = summary.rows_out,
        dropped_negative_balance = summary.dropped_negative_balance,
        dropped_negative_debt = summary.dropped_negative_debt,
        "Validation summary"
    );

    metrics::rows::dropped(DropReason::NegativeBalance.as_str(), summary.dropped_negative_balance);
    metrics::rows::dropped(DropReason::NegativeDebt.as_str(), summary.dropped_negative_debt);
    metrics::rows::invalid_emails(summary.invalid_email_count);
    metrics::rows::under_18(summary.under_18_count);
}
