//! Processing core for university admissions application workflows.
//!
//! An application record arrives with an arbitrary spread of attached
//! documents: a flat `documents` map plus references buried inside nested
//! sections and repeated sub-records. This crate resolves that graph into
//! independent extraction tasks, fans them out against an external
//! text-extraction capability, consolidates the results back into the exact
//! nested locations they came from, tracks the application's lifecycle
//! status, and computes the cohort-relative statistics behind comparison
//! reports.
//!
//! External collaborators (the OCR service, the AI evaluator, object
//! storage, the key-value document store, and the workflow orchestrator)
//! are trait seams in [`storage`]; the orchestrator drives the pipeline
//! through the stage functions in [`pipeline::stages`].

pub mod config;
pub mod pipeline;
pub mod stats;
pub mod storage;
pub mod telemetry;

pub use pipeline::record::{ApplicationId, ApplicationRecord};
pub use pipeline::status::{ApplicationStatus, StatusTrigger};
pub use pipeline::{ExtractionOutcome, ExtractionSummary, ExtractionTask};
