//! Workflow stage functions.
//!
//! Each stage is a transformation of the shared [`WorkflowState`]: it reads
//! fields written by its predecessors, writes its own, and always appends at
//! least one audit-log entry. Stages never raise on missing upstream input —
//! they degrade to a no-op output and log the skip, so the executor can walk
//! the graph unconditionally.
//!
//! [`WorkflowState`]: crate::types::WorkflowState

pub mod anomaly;
pub mod diagnosis;
pub mod engagement;
pub mod feedback;
pub mod ingest;
pub mod manufacturing;
pub mod scheduling;

use thiserror::Error;

/// Shape violations detected while turning telemetry into a model window.
/// Handled locally by the anomaly stage (degrades to an empty anomaly list),
/// never propagated out of the pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("no telemetry points provided")]
    Empty,

    #[error("telemetry carries no numeric metrics")]
    NoNumericMetrics,

    #[error("telemetry has {got} numeric metrics, model expects {expected}")]
    FeatureMismatch { got: usize, expected: usize },
}
