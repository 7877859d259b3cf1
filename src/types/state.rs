//! Workflow state: the single mutable record one vehicle invocation threads
//! through every pipeline stage.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::records::{
    AnomalyRecord, DiagnosisRecord, FeedbackRecord, ManufacturingPayload, ScheduleRecord,
};

/// One telemetry metric value. Numeric readings feed the anomaly model;
/// categorical codes (DTCs, fault flags) are carried for display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Numeric(f64),
    Code(String),
}

impl MetricValue {
    /// Numeric payload, or `None` for categorical codes.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            MetricValue::Numeric(v) => Some(*v),
            MetricValue::Code(_) => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Numeric(v)
    }
}

impl From<&str> for MetricValue {
    fn from(code: &str) -> Self {
        MetricValue::Code(code.to_string())
    }
}

/// Single sampled telemetry instant for a vehicle.
///
/// `timestamp` is seconds since epoch or relative time; CSV-derived telemetry
/// may not carry one, in which case column order is the time axis. Metric
/// names are kept in a `BTreeMap` so iteration order is stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    pub metrics: BTreeMap<String, MetricValue>,
}

impl TelemetryPoint {
    pub fn new(timestamp: Option<f64>) -> Self {
        Self {
            timestamp,
            metrics: BTreeMap::new(),
        }
    }

    /// Builder-style metric insertion, used heavily by fixtures.
    #[must_use]
    pub fn with_metric(mut self, name: &str, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(name.to_string(), value.into());
        self
    }
}

/// Vehicle identity fields supplied by the ingestion collaborator.
///
/// Required identity is a contract with ingestion; the core assumes
/// `vehicle_id` and `model` are present and well formed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleIdentity {
    pub vehicle_id: String,
    pub model: String,
    #[serde(default)]
    pub variant: String,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub supplier_id: String,
    #[serde(default)]
    pub user_segment: String,
}

/// Shared state passed between workflow stages for one vehicle invocation.
///
/// Created once from ingestion data, mutated in place by each stage in
/// sequence, and returned to the caller after the terminal stage. Fields a
/// stage has not (yet) produced are `None` — there is no distinction between
/// "missing" and "skipped" beyond the log trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(flatten)]
    pub identity: VehicleIdentity,

    /// Ordered telemetry series (Ingest normalizes the ordering).
    pub telemetry: Vec<TelemetryPoint>,

    /// Anomalies detected by the model, empty when none (or telemetry empty).
    #[serde(default)]
    pub anomalies: Vec<AnomalyRecord>,

    /// Diagnosis derived from the highest-severity anomaly.
    pub diagnosis: Option<DiagnosisRecord>,

    /// Whether the customer was notified, and with what message.
    pub customer_notified: bool,
    pub notification_message: String,

    /// Workshop allocation; only present for medium/high severity.
    pub schedule: Option<ScheduleRecord>,

    /// Simulated post-service feedback (always produced, see feedback stage).
    pub feedback: Option<FeedbackRecord>,

    /// Flattened analytics payload for OEM sinks.
    pub manufacturing_payload: Option<ManufacturingPayload>,

    /// Append-only audit log, one timestamped line per stage action.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl WorkflowState {
    /// Build the initial state the executor expects: identity + raw telemetry,
    /// everything downstream unset.
    pub fn new(identity: VehicleIdentity, telemetry: Vec<TelemetryPoint>) -> Self {
        Self {
            identity,
            telemetry,
            anomalies: Vec::new(),
            diagnosis: None,
            customer_notified: false,
            notification_message: String::new(),
            schedule: None,
            feedback: None,
            manufacturing_payload: None,
            logs: Vec::new(),
        }
    }

    /// Append a timestamped entry to the workflow audit log.
    pub fn log(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::debug!(vehicle_id = %self.identity.vehicle_id, "{message}");
        self.logs
            .push(format!("[{}] {message}", Utc::now().to_rfc3339()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_value_numeric_extraction() {
        assert_eq!(MetricValue::Numeric(12.5).as_numeric(), Some(12.5));
        assert_eq!(MetricValue::Code("P0562".into()).as_numeric(), None);
    }

    #[test]
    fn test_metric_value_untagged_serde() {
        let point = TelemetryPoint::new(Some(1.0))
            .with_metric("Battery_Voltage", 12.4)
            .with_metric("DTC", "P0562");

        let json = serde_json::to_string(&point).expect("serialize");
        assert!(json.contains("12.4"));
        assert!(json.contains("\"P0562\""));

        let back: TelemetryPoint = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, point);
    }

    #[test]
    fn test_log_appends_in_order() {
        let mut state = WorkflowState::new(VehicleIdentity::default(), Vec::new());
        state.log("first");
        state.log("second");

        assert_eq!(state.logs.len(), 2);
        assert!(state.logs[0].contains("first"));
        assert!(state.logs[1].contains("second"));
    }

    #[test]
    fn test_initial_state_has_no_downstream_fields() {
        let state = WorkflowState::new(VehicleIdentity::default(), Vec::new());
        assert!(state.anomalies.is_empty());
        assert!(state.diagnosis.is_none());
        assert!(!state.customer_notified);
        assert!(state.schedule.is_none());
        assert!(state.feedback.is_none());
        assert!(state.manufacturing_payload.is_none());
    }
}
