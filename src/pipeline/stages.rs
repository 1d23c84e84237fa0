//! Orchestrator-facing stage functions.
//!
//! The external workflow service sequences these stages; the contract for
//! each is `(application id, stage input) -> StageResult`. A stage never
//! panics or returns `Err` across this boundary: every internal fault is
//! folded into the `success: false` shape and the lifecycle status is only
//! advanced on the success path.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::consolidate;
use super::extraction::{self, ExtractionOutcome, ExtractionTask};
use super::record::{ApplicationId, ApplicationRecord};
use super::resolver;
use super::status::{self, ApplicationStatus, StatusTrigger};
use crate::config::{ReportsConfig, RetryPolicy};
use crate::stats::{metric_values, nested_value, CohortComparison};
use crate::storage::{
    EvaluationStore, Evaluator, ObjectStore, RecordStore, TextExtractor, WorkflowLauncher,
};

/// Metric compared across the cohort when building the report artifact.
pub const COMPOSITE_SCORE_METRIC: &str = "level4_Result.composite_score";

/// Serializable success/failure envelope handed back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    fn ok(output: Value) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(error = %message, "stage failed");
        Self {
            success: false,
            output: None,
            error: Some(message),
        }
    }
}

/// Store a freshly submitted application with status `New`.
pub async fn submit_application(
    store: &dyn RecordStore,
    application_id: &ApplicationId,
    mut form: Map<String, Value>,
) -> StageResult {
    // The id and status columns are owned by the record envelope; a form
    // that repeats them would otherwise collide with the flattened fields.
    form.remove("application_id");
    form.remove("application_status");
    form.entry("submitted_date".to_string())
        .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

    let mut record = ApplicationRecord::new(application_id.clone());
    record.fields = form;

    match store.put(&record).await {
        Ok(()) => {
            info!(%application_id, "application submitted");
            StageResult::ok(json!({
                "application_id": application_id,
                "status": record.status.label(),
            }))
        }
        Err(err) => StageResult::err(format!("failed to submit application: {err}")),
    }
}

/// Start the external processing workflow for one application.
///
/// On a launch failure the status rolls back to `On-hold` so the run is
/// retryable rather than stuck mid-flight. Restarting an on-hold
/// application under a `Manual` retry policy requires `retry_requested`.
pub async fn start_processing(
    store: &dyn RecordStore,
    launcher: &dyn WorkflowLauncher,
    retry_policy: RetryPolicy,
    application_id: &ApplicationId,
    retry_requested: bool,
) -> StageResult {
    let mut record = match store.get(application_id).await {
        Ok(Some(record)) => record,
        Ok(None) => return StageResult::err(format!("application not found: {application_id}")),
        Err(err) => return StageResult::err(err.to_string()),
    };

    if record.status == ApplicationStatus::OnHold
        && retry_policy == RetryPolicy::Manual
        && !retry_requested
    {
        return StageResult::err(format!(
            "application {application_id} is on hold; retry must be requested explicitly"
        ));
    }

    if let Err(launch_err) = launcher.start(application_id).await {
        match status::transition(record.status, StatusTrigger::StartFailed) {
            Ok(next) => {
                record.status = next;
                if let Err(put_err) = store.put(&record).await {
                    return StageResult::err(format!(
                        "failed to start processing: {launch_err}; status rollback also failed: {put_err}"
                    ));
                }
            }
            Err(rejected) => warn!(%rejected, "start failure in unexpected status"),
        }
        return StageResult::err(format!("failed to start processing: {launch_err}"));
    }

    record.status = match status::transition(record.status, StatusTrigger::ProcessingStarted) {
        Ok(next) => next,
        Err(rejected) => return StageResult::err(rejected.to_string()),
    };
    if let Err(err) = store.put(&record).await {
        return StageResult::err(err.to_string());
    }

    info!(%application_id, "application processing started");
    StageResult::ok(json!({
        "application_id": application_id,
        "status": record.status.label(),
    }))
}

/// Resolve the record's document set into tasks for the parallel fan-out.
pub async fn prepare_documents(
    store: &dyn RecordStore,
    application_id: &ApplicationId,
) -> StageResult {
    let record = match store.get(application_id).await {
        Ok(Some(record)) => record,
        Ok(None) => return StageResult::err(format!("application not found: {application_id}")),
        Err(err) => return StageResult::err(err.to_string()),
    };

    let tasks = resolver::resolve(&record);
    StageResult::ok(json!({
        "application_id": application_id,
        "total_documents": tasks.len(),
        "documents": tasks,
    }))
}

/// Run one extraction unit on the orchestrator's behalf.
///
/// Always `success: true`: a failed extraction is data for the
/// consolidator's tally, not a stage failure the orchestrator should retry.
pub async fn extract_document(extractor: &dyn TextExtractor, task: ExtractionTask) -> StageResult {
    let outcome = extraction::extract(task, extractor).await;
    StageResult::ok(json!({ "result": outcome }))
}

/// Fan-in: merge outcomes and persist the updated record.
pub async fn consolidate_results(
    store: &dyn RecordStore,
    application_id: &ApplicationId,
    outcomes: &[ExtractionOutcome],
) -> StageResult {
    match consolidate::consolidate(store, application_id, outcomes).await {
        Ok(summary) => StageResult::ok(json!({
            "application_id": application_id,
            "summary": summary,
        })),
        Err(err) => StageResult::err(format!("failed to consolidate results: {err}")),
    }
}

/// Hand the merged record to the AI evaluator and persist its result.
pub async fn evaluate_application(
    records: &dyn RecordStore,
    evaluations: &dyn EvaluationStore,
    evaluator: &dyn Evaluator,
    application_id: &ApplicationId,
) -> StageResult {
    let mut record = match records.get(application_id).await {
        Ok(Some(record)) => record,
        Ok(None) => return StageResult::err(format!("application not found: {application_id}")),
        Err(err) => return StageResult::err(err.to_string()),
    };

    let mut evaluation = match evaluator.evaluate(&record).await {
        Ok(Value::Object(evaluation)) => evaluation,
        Ok(_) => return StageResult::err("invalid evaluation response from AI service"),
        Err(err) => return StageResult::err(err.to_string()),
    };
    evaluation.insert(
        "application_id".to_string(),
        Value::String(application_id.0.clone()),
    );

    if let Err(err) = evaluations
        .put(application_id, &Value::Object(evaluation))
        .await
    {
        return StageResult::err(format!("failed to save evaluation: {err}"));
    }

    record.status = match status::transition(record.status, StatusTrigger::EvaluationRecorded) {
        Ok(next) => next,
        Err(rejected) => return StageResult::err(rejected.to_string()),
    };
    if let Err(err) = records.put(&record).await {
        return StageResult::err(err.to_string());
    }

    info!(%application_id, "evaluation recorded");
    StageResult::ok(json!({ "application_id": application_id }))
}

/// Build the cohort comparison artifact and close out the run.
///
/// The comparison is recomputed from the current cohort snapshot on every
/// call; cohort membership changes as new evaluations complete, so nothing
/// is cached.
pub async fn generate_report(
    records: &dyn RecordStore,
    evaluations: &dyn EvaluationStore,
    objects: &dyn ObjectStore,
    reports: &ReportsConfig,
    application_id: &ApplicationId,
) -> StageResult {
    let mut evaluation = match evaluations.get(application_id).await {
        Ok(Some(evaluation)) => evaluation,
        Ok(None) => {
            return StageResult::err(format!(
                "no evaluation data found for application: {application_id}"
            ))
        }
        Err(err) => return StageResult::err(err.to_string()),
    };

    let Some(score) = nested_value(&evaluation, COMPOSITE_SCORE_METRIC).and_then(Value::as_f64)
    else {
        return StageResult::err(format!(
            "evaluation for {application_id} has no numeric {COMPOSITE_SCORE_METRIC}"
        ));
    };

    let cohort = match evaluations.scan().await {
        Ok(cohort) => cohort,
        Err(err) => return StageResult::err(format!("failed to retrieve cohort data: {err}")),
    };
    let sample = metric_values(&cohort, COMPOSITE_SCORE_METRIC);
    let comparison = CohortComparison::compute(score, &sample);

    let artifact = json!({
        "application_id": application_id,
        "metric": COMPOSITE_SCORE_METRIC,
        "comparison": comparison,
    });
    let body = match serde_json::to_vec_pretty(&artifact) {
        Ok(body) => body,
        Err(err) => return StageResult::err(format!("failed to encode report: {err}")),
    };

    let key = reports.report_key(&application_id.0);
    if let Err(err) = objects
        .put_object(&reports.bucket, &key, body, "application/json")
        .await
    {
        return StageResult::err(format!("failed to upload report: {err}"));
    }

    let locator = reports.report_locator(&application_id.0);
    if let Some(evaluation) = evaluation.as_object_mut() {
        evaluation.insert("report".to_string(), Value::String(locator.clone()));
    }
    if let Err(err) = evaluations.put(application_id, &evaluation).await {
        return StageResult::err(format!("failed to link report: {err}"));
    }

    match records.get(application_id).await {
        Ok(Some(mut record)) => {
            record.status = match status::transition(record.status, StatusTrigger::ReportLinked) {
                Ok(next) => next,
                Err(rejected) => return StageResult::err(rejected.to_string()),
            };
            if let Err(err) = records.put(&record).await {
                return StageResult::err(err.to_string());
            }
        }
        Ok(None) => warn!(%application_id, "no application record to close out"),
        Err(err) => return StageResult::err(err.to_string()),
    }

    info!(%application_id, report = %locator, "report generated");
    StageResult::ok(json!({
        "application_id": application_id,
        "report": locator,
    }))
}

/// Read-through lookup of the stored application.
pub async fn get_application(
    store: &dyn RecordStore,
    application_id: &ApplicationId,
) -> StageResult {
    match store.get(application_id).await {
        Ok(Some(record)) => match serde_json::to_value(&record) {
            Ok(record) => StageResult::ok(record),
            Err(err) => StageResult::err(format!("failed to encode application: {err}")),
        },
        Ok(None) => StageResult::err(format!("no application found for: {application_id}")),
        Err(err) => StageResult::err(err.to_string()),
    }
}

/// List every stored application for the review dashboard: id, status, and
/// submission date only, never the full document contents.
pub async fn list_applications(store: &dyn RecordStore) -> StageResult {
    let records = match store.scan().await {
        Ok(records) => records,
        Err(err) => return StageResult::err(format!("failed to list applications: {err}")),
    };

    let applications: Vec<Value> = records
        .iter()
        .map(|record| {
            json!({
                "application_id": record.application_id,
                "application_status": record.status.label(),
                "submitted_date": record.fields.get("submitted_date").cloned(),
            })
        })
        .collect();

    StageResult::ok(json!({
        "total": applications.len(),
        "applications": applications,
    }))
}

/// Read-through lookup of the stored evaluation.
pub async fn get_evaluation(
    evaluations: &dyn EvaluationStore,
    application_id: &ApplicationId,
) -> StageResult {
    match evaluations.get(application_id).await {
        Ok(Some(evaluation)) => StageResult::ok(evaluation),
        Ok(None) => {
            StageResult::err(format!("no evaluation found for application: {application_id}"))
        }
        Err(err) => StageResult::err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::storage::{EvaluatorError, StoreError};

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<HashMap<ApplicationId, ApplicationRecord>>,
    }

    impl MemoryStore {
        fn stored(&self, id: &ApplicationId) -> Option<ApplicationRecord> {
            self.records.lock().unwrap().get(id).cloned()
        }
    }

    #[async_trait]
    impl RecordStore for MemoryStore {
        async fn get(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, StoreError> {
            Ok(self.records.lock().unwrap().get(id).cloned())
        }

        async fn put(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
            self.records
                .lock()
                .unwrap()
                .insert(record.application_id.clone(), record.clone());
            Ok(())
        }

        async fn scan(&self) -> Result<Vec<ApplicationRecord>, StoreError> {
            Ok(self.records.lock().unwrap().values().cloned().collect())
        }
    }

    struct ArrayEvaluator;

    #[async_trait]
    impl Evaluator for ArrayEvaluator {
        async fn evaluate(&self, _record: &ApplicationRecord) -> Result<Value, EvaluatorError> {
            Ok(json!(["not", "an", "object"]))
        }
    }

    #[derive(Default)]
    struct RecordingEvaluations {
        puts: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl EvaluationStore for RecordingEvaluations {
        async fn get(&self, _id: &ApplicationId) -> Result<Option<Value>, StoreError> {
            Ok(None)
        }

        async fn put(&self, _id: &ApplicationId, evaluation: &Value) -> Result<(), StoreError> {
            self.puts.lock().unwrap().push(evaluation.clone());
            Ok(())
        }

        async fn scan(&self) -> Result<Vec<Value>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn id() -> ApplicationId {
        ApplicationId("app-7".to_string())
    }

    #[tokio::test]
    async fn submit_strips_envelope_keys_from_the_form() {
        let store = MemoryStore::default();
        let form = json!({
            "application_id": "spoofed",
            "application_status": "Processing complete",
            "documents": { "transcript": "store://docs/t.pdf" }
        });

        let result = submit_application(&store, &id(), form.as_object().unwrap().clone()).await;
        assert!(result.success);

        let record = store.stored(&id()).unwrap();
        assert_eq!(record.application_id, id());
        assert_eq!(record.status, ApplicationStatus::New);
        assert!(!record.fields.contains_key("application_id"));
        assert!(!record.fields.contains_key("application_status"));
        assert!(record.fields["submitted_date"].is_string());
    }

    #[tokio::test]
    async fn submit_keeps_a_caller_provided_submitted_date() {
        let store = MemoryStore::default();
        let form = json!({ "submitted_date": "2024-01-05T00:00:00Z" });

        let result = submit_application(&store, &id(), form.as_object().unwrap().clone()).await;
        assert!(result.success);
        assert_eq!(
            store.stored(&id()).unwrap().fields["submitted_date"],
            json!("2024-01-05T00:00:00Z")
        );
    }

    #[tokio::test]
    async fn non_object_evaluator_response_fails_without_persisting() {
        let store = MemoryStore::default();
        let mut record = ApplicationRecord::new(id());
        record.status = ApplicationStatus::EvaluationInProgress;
        store.put(&record).await.unwrap();

        let evaluations = RecordingEvaluations::default();
        let result = evaluate_application(&store, &evaluations, &ArrayEvaluator, &id()).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("invalid evaluation response"));
        assert!(evaluations.puts.lock().unwrap().is_empty());
        assert_eq!(
            store.stored(&id()).unwrap().status,
            ApplicationStatus::EvaluationInProgress
        );
    }

    #[tokio::test]
    async fn listing_returns_a_summary_row_per_application() {
        let store = MemoryStore::default();
        for n in 1..=3 {
            let form = json!({
                "submitted_date": format!("2026-08-{n:02}T00:00:00Z"),
                "documents": { "transcript": "store://docs/t.pdf" }
            });
            let submitted = submit_application(
                &store,
                &ApplicationId(format!("app-{n}")),
                form.as_object().unwrap().clone(),
            )
            .await;
            assert!(submitted.success);
        }

        let result = list_applications(&store).await;
        assert!(result.success, "{result:?}");
        let payload = result.output.unwrap();
        assert_eq!(payload["total"], json!(3));

        let rows = payload["applications"].as_array().unwrap();
        let row = rows
            .iter()
            .find(|row| row["application_id"] == json!("app-2"))
            .expect("row present");
        assert_eq!(row["application_status"], json!("New"));
        assert_eq!(row["submitted_date"], json!("2026-08-02T00:00:00Z"));
        // Summary rows never carry document contents.
        assert!(row.get("documents").is_none());
    }

    #[test]
    fn failure_envelope_serializes_without_an_output_field() {
        let encoded = serde_json::to_value(StageResult::err("boom")).unwrap();
        assert_eq!(encoded, json!({ "success": false, "error": "boom" }));
    }
}
