//! Application lifecycle state machine.
//!
//! The status field is monotonic except for the explicit on-hold retry
//! edge. Every transition goes through [`transition`] so invalid pairings
//! are rejected at one place; re-applying a trigger that already took
//! effect is accepted unchanged, which keeps each orchestration stage safe
//! to re-run.

use serde::{Deserialize, Serialize};

/// Lifecycle status stored on the application record.
///
/// Serialized as the exact stored strings (`"Application processing"` etc.)
/// so records written by earlier revisions of the system stay readable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[default]
    New,
    #[serde(rename = "Application processing")]
    ApplicationProcessing,
    #[serde(rename = "On-hold")]
    OnHold,
    #[serde(rename = "Evaluation in-progress")]
    EvaluationInProgress,
    #[serde(rename = "Generating report")]
    GeneratingReport,
    #[serde(rename = "Processing complete")]
    ProcessingComplete,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::ApplicationProcessing => "Application processing",
            Self::OnHold => "On-hold",
            Self::EvaluationInProgress => "Evaluation in-progress",
            Self::GeneratingReport => "Generating report",
            Self::ProcessingComplete => "Processing complete",
        }
    }

    /// Terminal status: nothing is reachable from here.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ProcessingComplete)
    }
}

/// Events that move an application through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTrigger {
    /// Orchestration started (or restarted from on-hold).
    ProcessingStarted,
    /// Orchestration failed to start; roll back to a retryable state.
    StartFailed,
    /// Document consolidation persisted the merged record.
    DocumentsConsolidated,
    /// Evaluation result received and persisted.
    EvaluationRecorded,
    /// Report artifact produced and linked.
    ReportLinked,
}

impl StatusTrigger {
    const fn target(self) -> ApplicationStatus {
        match self {
            Self::ProcessingStarted => ApplicationStatus::ApplicationProcessing,
            Self::StartFailed => ApplicationStatus::OnHold,
            Self::DocumentsConsolidated => ApplicationStatus::EvaluationInProgress,
            Self::EvaluationRecorded => ApplicationStatus::GeneratingReport,
            Self::ReportLinked => ApplicationStatus::ProcessingComplete,
        }
    }

    const fn sources(self) -> &'static [ApplicationStatus] {
        match self {
            // OnHold -> ApplicationProcessing is the retry edge.
            Self::ProcessingStarted => &[ApplicationStatus::New, ApplicationStatus::OnHold],
            Self::StartFailed => &[
                ApplicationStatus::New,
                ApplicationStatus::ApplicationProcessing,
            ],
            Self::DocumentsConsolidated => &[ApplicationStatus::ApplicationProcessing],
            Self::EvaluationRecorded => &[ApplicationStatus::EvaluationInProgress],
            Self::ReportLinked => &[ApplicationStatus::GeneratingReport],
        }
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, thiserror::Error)]
#[error("cannot apply {trigger:?} while status is '{}'", current.label())]
pub struct TransitionRejected {
    pub current: ApplicationStatus,
    pub trigger: StatusTrigger,
}

/// Apply a trigger to the current status.
///
/// Re-applying a trigger whose target is already the current status returns
/// the status unchanged, so a stage retried by the orchestrator does not
/// fail on its own earlier success.
pub fn transition(
    current: ApplicationStatus,
    trigger: StatusTrigger,
) -> Result<ApplicationStatus, TransitionRejected> {
    let target = trigger.target();
    if current == target {
        return Ok(current);
    }
    if trigger.sources().contains(&current) {
        Ok(target)
    } else {
        Err(TransitionRejected { current, trigger })
    }
}
