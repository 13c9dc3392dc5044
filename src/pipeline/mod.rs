// Data processing pipeline: the in-memory stages of one invocation

pub mod processing;
pub mod report;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{CustomerRecord, InputRecord};
use crate::error::Result;
use processing::clean::clean_batch;
use processing::enrich::{DefaultEnricher, Enricher};
use processing::quality_gate::{DefaultQualityGate, QualityGate, ValidationSummary};
use processing::recency::retain_recent_signups;

/// Output of the in-memory stages for one batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub records: Vec<CustomerRecord>,
    pub rows_ingested: usize,
    pub rows_after_recency: usize,
    pub summary: ValidationSummary,
}

/// Clean -> recency filter -> derive -> validate, over one batch.
///
/// `reference_time` stands in for "now" in the recency filter; with the same
/// input and reference time the output is identical.
pub fn transform_batch(
    records: Vec<InputRecord>,
    reference_time: DateTime<Utc>,
) -> Result<BatchOutcome> {
    transform_batch_with(
        records,
        reference_time,
        &DefaultEnricher::new(),
        &DefaultQualityGate::new(),
    )
}

pub fn transform_batch_with(
    records: Vec<InputRecord>,
    reference_time: DateTime<Utc>,
    enricher: &dyn Enricher,
    gate: &dyn QualityGate,
) -> Result<BatchOutcome> {
    let rows_ingested = records.len();

    let cleaned = clean_batch(records)?;
    debug!("Cleaned {} records", cleaned.len());

    let mut recent = retain_recent_signups(cleaned, reference_time);
    let rows_after_recency = recent.len();

    enricher.enrich_batch(&mut recent)?;

    let validated = gate.validate_batch(recent);
    info!(
        rows_ingested,
        rows_after_recency,
        rows_out = validated.records.len(),
        "Batch transformed"
    );

    Ok(BatchOutcome {
        records: validated.records,
        rows_ingested,
        rows_after_recency,
        summary: validated.summary,
    })
}
