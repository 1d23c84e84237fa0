//! Fan-in: merge extraction outcomes back into the stored record.
//!
//! The consolidator accepts outcomes in any arrival order and produces a
//! deterministic final record: each write-back address is distinct, so the
//! merge is order-independent, and re-running against the same stored state
//! yields the same record (safe to retry after a persistence failure).
//! Single-flight per application is the caller's obligation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::extraction::{ExtractionOutcome, OutcomeStatus, WriteBack};
use super::record::{ApplicationId, ApplicationRecord};
use super::registry;
use super::status::{self, StatusTrigger, TransitionRejected};
use crate::storage::{RecordStore, StoreError};

/// Tally over all outcomes of one run.
///
/// `stale_writes` counts soft inconsistencies: successful extractions whose
/// write-back address no longer resolved at consolidation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub stale_writes: usize,
    pub total: usize,
}

/// Fatal consolidation failures. Everything here aborts the stage without
/// advancing the stored lifecycle status.
#[derive(Debug, thiserror::Error)]
pub enum ConsolidateError {
    #[error("application not found: {0}")]
    RecordMissing(ApplicationId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Status(#[from] TransitionRejected),
}

/// Merge all outcomes for one application and persist the updated record.
///
/// Successful outcomes are written back at their originating address;
/// failures and skips are tallied only, never written into the record, so
/// callers distinguish "extraction failed" from "content present" via the
/// summary alone. The lifecycle status advances to evaluation-in-progress
/// in the same single write.
pub async fn consolidate(
    store: &dyn RecordStore,
    application_id: &ApplicationId,
    outcomes: &[ExtractionOutcome],
) -> Result<ExtractionSummary, ConsolidateError> {
    let mut record = store
        .get(application_id)
        .await?
        .ok_or_else(|| ConsolidateError::RecordMissing(application_id.clone()))?;

    let mut summary = ExtractionSummary {
        total: outcomes.len(),
        ..ExtractionSummary::default()
    };

    for outcome in outcomes {
        match outcome.status {
            OutcomeStatus::Success => {
                summary.successful += 1;
                if !apply_write_back(&mut record, outcome) {
                    summary.stale_writes += 1;
                }
            }
            OutcomeStatus::Failed => summary.failed += 1,
            OutcomeStatus::Skipped => summary.skipped += 1,
        }
    }

    record.status = status::transition(record.status, StatusTrigger::DocumentsConsolidated)?;
    store.put(&record).await?;

    info!(
        application_id = %application_id,
        successful = summary.successful,
        failed = summary.failed,
        skipped = summary.skipped,
        stale_writes = summary.stale_writes,
        "consolidation complete"
    );
    Ok(summary)
}

/// Insert one successful outcome at its write-back address. Returns `false`
/// when the address no longer resolves; the write is dropped as a soft
/// inconsistency, never a hard failure.
fn apply_write_back(record: &mut ApplicationRecord, outcome: &ExtractionOutcome) -> bool {
    let content = Value::String(outcome.content.clone());
    match &outcome.task.target {
        WriteBack::Main { content_key } => {
            record.set_field(content_key, content);
            true
        }
        WriteBack::NestedSingular {
            section,
            content_key,
        } => {
            let Some(descriptor) = registry::section_by_name(section) else {
                warn!(section, "write-back references an unknown section");
                return false;
            };
            match record.object_at_mut(descriptor.path) {
                Some(sub_object) => {
                    sub_object.insert(content_key.clone(), content);
                    true
                }
                None => {
                    warn!(section, "nested section is not an object; write dropped");
                    false
                }
            }
        }
        WriteBack::NestedIndexed {
            section,
            index,
            content_key,
        } => {
            let Some(descriptor) = registry::section_by_name(section) else {
                warn!(section, "write-back references an unknown section");
                return false;
            };
            match record.list_element_mut(descriptor.path, *index) {
                Some(element) => {
                    element.insert(content_key.clone(), content);
                    true
                }
                None => {
                    warn!(
                        section,
                        index, "list element vanished before consolidation; write dropped"
                    );
                    false
                }
            }
        }
    }
}
