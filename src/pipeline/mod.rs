//! The application processing pipeline: resolve, extract, consolidate,
//! track lifecycle status, and expose orchestrator-facing stages.

pub mod consolidate;
pub mod extraction;
pub mod locator;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod stages;
pub mod status;

use std::sync::Arc;

pub use consolidate::{ConsolidateError, ExtractionSummary};
pub use extraction::{ExtractionOutcome, ExtractionTask, OutcomeStatus, WriteBack};
pub use locator::{LocatorError, SourceLocator};
pub use resolver::resolve;
pub use stages::StageResult;

use record::ApplicationId;
use crate::storage::{RecordStore, TextExtractor};

/// Resolve, fan out, and consolidate in one in-process pass.
///
/// Equivalent to the orchestrated prepare -> extract (parallel) ->
/// consolidate sequence for callers that do not split the stages across a
/// workflow service.
pub async fn run_extraction(
    store: &dyn RecordStore,
    extractor: Arc<dyn TextExtractor>,
    application_id: &ApplicationId,
) -> Result<ExtractionSummary, ConsolidateError> {
    let record = store
        .get(application_id)
        .await?
        .ok_or_else(|| ConsolidateError::RecordMissing(application_id.clone()))?;

    let tasks = resolver::resolve(&record);
    let outcomes = extraction::extract_all(tasks, extractor).await;
    consolidate::consolidate(store, application_id, &outcomes).await
}
