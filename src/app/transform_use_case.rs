use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::app::ports::ObjectStorePort;
use crate::config::PipelineConfig;
use crate::constants::{self, JSON_CONTENT_TYPE};
use crate::domain::{parse_records, serialize_records};
use crate::error::{EtlError, Result};
use crate::observability::metrics;
use crate::pipeline::processing::quality_gate::ValidationSummary;
use crate::pipeline::report::report_aggregates;
use crate::pipeline::transform_batch;
use crate::trigger::{ObjectLocation, TriggerEvent};

/// Stage an invocation failed in, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Trigger,
    Ingest,
    Transform,
    Serialize,
    Emit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Trigger => "trigger",
            Stage::Ingest => "ingest",
            Stage::Transform => "transform",
            Stage::Serialize => "serialize",
            Stage::Emit => "emit",
        }
    }
}

/// What a successful invocation produced. Internal: the caller only sees
/// the `InvocationResult`.
#[derive(Debug, Clone, Serialize)]
pub struct TransformReport {
    pub source: ObjectLocation,
    pub destination: ObjectLocation,
    pub rows_ingested: usize,
    pub rows_after_recency: usize,
    pub rows_emitted: usize,
    pub output_bytes: usize,
    /// Hex SHA-256 of the emitted body
    pub output_sha256: String,
    pub summary: ValidationSummary,
}

/// Status/message pair handed back to the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded message string
    pub body: String,
}

impl InvocationResult {
    pub fn success(destination: &ObjectLocation) -> Self {
        Self::new(
            200,
            format!("Data transformed and uploaded to {} successfully", destination),
        )
    }

    pub fn failure(error: &EtlError) -> Self {
        Self::new(500, format!("Error processing file: {}", error))
    }

    fn new(status_code: u16, message: String) -> Self {
        Self {
            status_code,
            body: serde_json::Value::String(message).to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// The decoded message carried in `body`.
    pub fn message(&self) -> Option<String> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Use case for transforming one exported object into its curated counterpart
pub struct TransformUseCase {
    store: Arc<dyn ObjectStorePort>,
    destination_bucket: String,
    destination_prefix: String,
}

impl TransformUseCase {
    pub fn new(store: Arc<dyn ObjectStorePort>, config: &PipelineConfig) -> Self {
        Self {
            store,
            destination_bucket: config.destination_bucket.clone(),
            destination_prefix: config.destination_prefix.clone(),
        }
    }

    pub fn destination_for(&self, source: &ObjectLocation) -> ObjectLocation {
        ObjectLocation::new(
            self.destination_bucket.clone(),
            constants::destination_key(&self.destination_prefix, &source.key),
        )
    }

    /// Handle a trigger notification end to end. Every error is caught here
    /// and turned into a 500 result; nothing is retried.
    pub async fn handle(
        &self,
        event: &TriggerEvent,
        reference_time: DateTime<Utc>,
    ) -> InvocationResult {
        let started = Instant::now();
        let outcome = match event.source() {
            Ok(source) => self.run(&source, reference_time).await,
            Err(e) => {
                stage_failed(Stage::Trigger, &e);
                Err(e)
            }
        };
        metrics::invocation::duration(started.elapsed().as_secs_f64());

        match outcome {
            Ok(report) => {
                metrics::invocation::success();
                InvocationResult::success(&report.destination)
            }
            Err(e) => InvocationResult::failure(&e),
        }
    }

    /// Ingest -> transform -> report -> serialize -> emit for one object.
    ///
    /// The destination is written only after every earlier stage succeeded,
    /// so a failed run leaves no destination object behind.
    #[instrument(skip(self, source), fields(invocation_id = %Uuid::new_v4(), source = %source))]
    pub async fn run(
        &self,
        source: &ObjectLocation,
        reference_time: DateTime<Utc>,
    ) -> Result<TransformReport> {
        info!("Reading source object");
        let raw = self
            .store
            .get(source)
            .await
            .inspect_err(|e| stage_failed(Stage::Ingest, e))?;
        let records = parse_records(&raw).inspect_err(|e| stage_failed(Stage::Ingest, e))?;
        metrics::rows::ingested(records.len());

        let outcome = transform_batch(records, reference_time)
            .inspect_err(|e| stage_failed(Stage::Transform, e))?;
        metrics::rows::after_recency(outcome.rows_after_recency);
        report_aggregates(&outcome.summary);

        let body = serialize_records(&outcome.records)
            .inspect_err(|e| stage_failed(Stage::Serialize, e))?;
        let output_bytes = body.len();
        let output_sha256 = hex::encode(Sha256::digest(&body));

        let destination = self.destination_for(source);
        self.store
            .put(&destination, body, JSON_CONTENT_TYPE)
            .await
            .inspect_err(|e| stage_failed(Stage::Emit, e))?;

        metrics::rows::emitted(outcome.records.len());
        metrics::invocation::output_bytes(output_bytes);
        info!(
            destination = %destination,
            rows_emitted = outcome.records.len(),
            output_sha256 = %output_sha256,
            "Transformed object written"
        );

        Ok(TransformReport {
            source: source.clone(),
            destination,
            rows_ingested: outcome.rows_ingested,
            rows_after_recency: outcome.rows_after_recency,
            rows_emitted: outcome.records.len(),
            output_bytes,
            output_sha256,
            summary: outcome.summary,
        })
    }
}

fn stage_failed(stage: Stage, err: &EtlError) {
    error!(stage = stage.as_str(), "Invocation failed: {}", err);
    metrics::invocation::error(stage.as_str());
}
