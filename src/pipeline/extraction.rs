//! Extraction tasks, per-unit outcomes, and the parallel fan-out.
//!
//! Each unit is independent and side-effect free: it parses its locator,
//! calls the external text-extraction capability, and tags the result.
//! Nothing here ever propagates a fault to the caller; every failure mode
//! becomes a `failed` outcome so one bad document cannot abort the run.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::locator::SourceLocator;
use super::record::ApplicationId;
use crate::storage::TextExtractor;

/// Where extracted text is written back into the record.
///
/// Addresses are tagged variants rather than path strings so the
/// consolidator's dispatch is exhaustive and index/field typos cannot
/// survive compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WriteBack {
    /// Top-level field on the record.
    Main { content_key: String },
    /// Field on a singular nested sub-object.
    NestedSingular {
        section: String,
        content_key: String,
    },
    /// Field on one element of a nested list, located by the index captured
    /// at resolution time.
    NestedIndexed {
        section: String,
        index: usize,
        content_key: String,
    },
}

impl WriteBack {
    pub fn content_key(&self) -> &str {
        match self {
            Self::Main { content_key }
            | Self::NestedSingular { content_key, .. }
            | Self::NestedIndexed { content_key, .. } => content_key,
        }
    }

    pub const fn is_nested(&self) -> bool {
        !matches!(self, Self::Main { .. })
    }
}

/// One independently extractable unit, created by the resolver and consumed
/// exactly once. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionTask {
    pub application_id: ApplicationId,
    /// Stable logical name, e.g. `transcript` or
    /// `work_experience[1].certificate_document`.
    pub document_key: String,
    /// Raw source locator; parsed by the unit, not the resolver.
    pub locator: String,
    pub target: WriteBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failed,
    Skipped,
}

/// Tagged result of one extraction unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub task: ExtractionTask,
    pub status: OutcomeStatus,
    /// Extracted text; may be empty even on success.
    #[serde(default)]
    pub content: String,
    /// Present iff `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionOutcome {
    pub fn success(task: ExtractionTask, content: String) -> Self {
        Self {
            task,
            status: OutcomeStatus::Success,
            content,
            error: None,
        }
    }

    pub fn failed(task: ExtractionTask, error: impl Into<String>) -> Self {
        Self {
            task,
            status: OutcomeStatus::Failed,
            content: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn skipped(task: ExtractionTask) -> Self {
        Self {
            task,
            status: OutcomeStatus::Skipped,
            content: String::new(),
            error: None,
        }
    }
}

/// Run one extraction unit. Infallible at the signature level: an empty
/// locator is a skip, anything else that goes wrong is a `failed` outcome
/// carrying the fault description.
pub async fn extract(task: ExtractionTask, extractor: &dyn TextExtractor) -> ExtractionOutcome {
    if task.locator.trim().is_empty() {
        info!(document = %task.document_key, "skipping empty locator");
        return ExtractionOutcome::skipped(task);
    }

    let locator = match SourceLocator::parse(&task.locator) {
        Ok(locator) => locator,
        Err(err) => {
            warn!(document = %task.document_key, %err, "invalid source locator");
            return ExtractionOutcome::failed(task, err.to_string());
        }
    };

    match extractor.analyze(&locator.container, &locator.key).await {
        Ok(text) => {
            info!(
                document = %task.document_key,
                chars = text.len(),
                "extraction succeeded"
            );
            ExtractionOutcome::success(task, text)
        }
        Err(err) => {
            warn!(document = %task.document_key, %err, "extraction failed");
            ExtractionOutcome::failed(task, err.to_string())
        }
    }
}

/// Fan out all tasks for one application as unordered parallel units.
///
/// Outcomes are collected in completion order; the consolidator is
/// order-independent so no sequencing is imposed here. A unit that panics
/// is converted into a `failed` outcome for its task rather than poisoning
/// the run.
pub async fn extract_all(
    tasks: Vec<ExtractionTask>,
    extractor: Arc<dyn TextExtractor>,
) -> Vec<ExtractionOutcome> {
    let mut set = JoinSet::new();
    let mut in_flight = HashMap::new();

    for task in tasks {
        let extractor = Arc::clone(&extractor);
        let spawned = task.clone();
        let handle = set.spawn(async move { extract(spawned, extractor.as_ref()).await });
        in_flight.insert(handle.id(), task);
    }

    let mut outcomes = Vec::with_capacity(in_flight.len());
    while let Some(joined) = set.join_next_with_id().await {
        match joined {
            Ok((id, outcome)) => {
                in_flight.remove(&id);
                outcomes.push(outcome);
            }
            Err(join_err) => {
                if let Some(task) = in_flight.remove(&join_err.id()) {
                    warn!(document = %task.document_key, %join_err, "extraction unit aborted");
                    outcomes.push(ExtractionOutcome::failed(
                        task,
                        format!("extraction unit aborted: {join_err}"),
                    ));
                }
            }
        }
    }
    outcomes
}
