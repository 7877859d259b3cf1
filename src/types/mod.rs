//! Shared workflow types: telemetry points, stage output records, and the
//! mutable workflow state threaded through the pipeline.

mod records;
mod state;

pub use records::{
    AnomalyRecord, DiagnosisRecord, FeedbackRecord, ManufacturingPayload, ScheduleRecord,
    SeverityLevel,
};
pub use state::{MetricValue, TelemetryPoint, VehicleIdentity, WorkflowState};
