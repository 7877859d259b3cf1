//! Aftersense: Vehicle Aftersales Operational Intelligence
//!
//! Per-vehicle telemetry flows through a fixed sequence of decision stages:
//! detect anomalous sensor behavior, map it to a likely failing part, decide
//! whether to notify the customer, schedule a repair, simulate post-service
//! feedback, and emit a structured analytics payload.
//!
//! ## Architecture
//!
//! - **Pipeline Executor**: threads one mutable [`WorkflowState`] through an
//!   ordered stage graph with a single severity-driven branch
//! - **Sequence Autoencoder**: LSTM encoder/decoder scoring telemetry windows
//!   by per-feature reconstruction error
//! - **Stage Functions**: seven independent transformations of the state
//! - **Batch Runner**: embarrassingly parallel fleet invocation
//!
//! [`WorkflowState`]: types::WorkflowState

pub mod batch;
pub mod config;
pub mod model;
pub mod pipeline;
pub mod stages;
pub mod synthetic;
pub mod types;

// Re-export configuration
pub use config::{ModelConfig, WorkflowConfig};

// Re-export commonly used types
pub use types::{
    AnomalyRecord, DiagnosisRecord, FeedbackRecord, ManufacturingPayload, ScheduleRecord,
    SeverityLevel, TelemetryPoint, VehicleIdentity, WorkflowState,
};

// Re-export the model surface
pub use model::{
    infer_anomalies, reconstruction_error, train, LstmAutoencoder, ModelHandle,
    TrainingArtifacts, Window,
};

// Re-export the executor
pub use pipeline::{Stage, WorkflowExecutor};

// Re-export batch invocation
pub use batch::{run_batch, BatchError};
