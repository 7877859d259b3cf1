//! Workflow Pipeline Module
//!
//! ## Stage Graph
//!
//! ```text
//! Ingest -> AnomalyDetect -> Diagnose -> Engage -+-> Schedule -> SimulateFeedback -> BuildPayload -> terminal
//!                                                |                    ^
//!                                                +--------------------+   (severity low or no diagnosis)
//! ```
//!
//! Seven nodes, six unconditional edges, one conditional edge after Engage
//! selecting between Schedule and SimulateFeedback based solely on the
//! diagnosis severity level. Exactly one top-to-bottom pass per invocation;
//! no retries, no re-entrant node execution, no cycles.

mod executor;

pub use executor::{Stage, WorkflowExecutor};
