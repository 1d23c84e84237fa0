//! Trait seams for the external collaborators.
//!
//! The pipeline core never talks to a concrete backend. Production adapters
//! (the key-value document store, object storage, the OCR capability, the
//! hosted workflow orchestrator, the AI evaluator) implement these traits;
//! tests substitute in-memory fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::pipeline::record::{ApplicationId, ApplicationRecord};

/// Failure surfaced by a storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Persistence boundary for application records.
///
/// Each call operates on exactly one record; no multi-record transaction is
/// assumed. Single-flight per application is the caller's obligation.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, StoreError>;
    async fn put(&self, record: &ApplicationRecord) -> Result<(), StoreError>;
    /// Full snapshot of all stored applications, in no particular order.
    async fn scan(&self) -> Result<Vec<ApplicationRecord>, StoreError>;
}

/// Persistence boundary for evaluation results.
///
/// Evaluations are dynamic documents keyed by application id; the cohort
/// statistics engine consumes the full `scan` snapshot.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn get(&self, id: &ApplicationId) -> Result<Option<Value>, StoreError>;
    async fn put(&self, id: &ApplicationId, evaluation: &Value) -> Result<(), StoreError>;
    async fn scan(&self) -> Result<Vec<Value>, StoreError>;
}

/// Object-storage sink for report artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        container: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;
}

/// Error reported by the text-extraction capability.
#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    #[error("document not found: {container}/{key}")]
    NotFound { container: String, key: String },
    #[error("text analysis failed: {0}")]
    Analysis(String),
}

/// The external OCR/text-extraction capability.
///
/// A `FAILED` analysis status maps to `Err`; `SUCCEEDED` maps to `Ok` with
/// the extracted text, which may legitimately be empty.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn analyze(&self, container: &str, key: &str) -> Result<String, ExtractorError>;
}

/// Error reported when the hosted orchestration service cannot start a run.
#[derive(Debug, thiserror::Error)]
#[error("workflow launch failed: {0}")]
pub struct LaunchError(pub String);

/// Start handle for the external workflow orchestrator.
#[async_trait]
pub trait WorkflowLauncher: Send + Sync {
    async fn start(&self, id: &ApplicationId) -> Result<(), LaunchError>;
}

/// Error reported by the AI evaluation service.
#[derive(Debug, thiserror::Error)]
#[error("evaluation service failed: {0}")]
pub struct EvaluatorError(pub String);

/// The external AI scoring service producing the level 1-4 result document.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, record: &ApplicationRecord) -> Result<Value, EvaluatorError>;
}
