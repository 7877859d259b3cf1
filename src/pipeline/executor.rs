//! Pipeline executor: owns the stage graph and drives one workflow state to
//! completion per invocation.

use tracing::debug;

use crate::config::WorkflowConfig;
use crate::model::ModelHandle;
use crate::stages;
use crate::types::{SeverityLevel, WorkflowState};

/// Pipeline node identifiers. The graph is a closed state machine: every
/// transition is enumerated here, and the single conditional transition
/// lives at [`Stage::Engage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    AnomalyDetect,
    Diagnose,
    Engage,
    Schedule,
    SimulateFeedback,
    BuildPayload,
}

impl Stage {
    /// The entry node of every invocation.
    pub const ENTRY: Stage = Stage::Ingest;

    /// The successor of this node given the current state; `None` marks the
    /// terminal node.
    ///
    /// Only Engage branches: route to Schedule when the diagnosis severity
    /// is medium or high, otherwise skip straight to SimulateFeedback. The
    /// decision reads exactly the fields Engage itself observed.
    pub fn successor(self, state: &WorkflowState) -> Option<Stage> {
        match self {
            Stage::Ingest => Some(Stage::AnomalyDetect),
            Stage::AnomalyDetect => Some(Stage::Diagnose),
            Stage::Diagnose => Some(Stage::Engage),
            Stage::Engage => {
                let severity = state
                    .diagnosis
                    .as_ref()
                    .map_or(SeverityLevel::Low, |d| d.severity_level);
                if severity.is_actionable() {
                    Some(Stage::Schedule)
                } else {
                    Some(Stage::SimulateFeedback)
                }
            }
            Stage::Schedule => Some(Stage::SimulateFeedback),
            Stage::SimulateFeedback => Some(Stage::BuildPayload),
            Stage::BuildPayload => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Ingest => "ingest",
            Stage::AnomalyDetect => "anomaly_detect",
            Stage::Diagnose => "diagnose",
            Stage::Engage => "engage",
            Stage::Schedule => "schedule",
            Stage::SimulateFeedback => "simulate_feedback",
            Stage::BuildPayload => "build_payload",
        };
        write!(f, "{name}")
    }
}

/// Executes the aftersales workflow graph for one vehicle at a time.
///
/// Constructed once, reused across many invocations: the model handle and
/// the configuration are read-only from the executor's perspective. Each
/// invocation exclusively owns its [`WorkflowState`] from entry to terminal.
#[derive(Debug, Clone)]
pub struct WorkflowExecutor {
    model: ModelHandle,
    config: WorkflowConfig,
}

impl WorkflowExecutor {
    /// Bind a model handle and configuration into a reusable executor.
    pub fn new(model: ModelHandle, config: WorkflowConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Drive one workflow state through the graph to the terminal node.
    ///
    /// The model is snapshotted once at the start, so a concurrent
    /// [`publish`](ModelHandle::publish) never changes weights mid-invocation.
    pub fn invoke(&self, mut state: WorkflowState) -> WorkflowState {
        let model = self.model.load();
        let mut current = Some(Stage::ENTRY);

        while let Some(stage) = current {
            debug!(vehicle_id = %state.identity.vehicle_id, %stage, "executing stage");
            match stage {
                Stage::Ingest => stages::ingest::run(&mut state),
                Stage::AnomalyDetect => stages::anomaly::run(&mut state, &model, &self.config),
                Stage::Diagnose => stages::diagnosis::run(&mut state, &self.config),
                Stage::Engage => stages::engagement::run(&mut state),
                Stage::Schedule => stages::scheduling::run(&mut state),
                Stage::SimulateFeedback => stages::feedback::run(&mut state),
                Stage::BuildPayload => stages::manufacturing::run(&mut state, &self.config),
            }
            current = stage.successor(&state);
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::model::LstmAutoencoder;
    use crate::types::{DiagnosisRecord, TelemetryPoint, VehicleIdentity};

    fn test_executor() -> WorkflowExecutor {
        let config = WorkflowConfig {
            model: ModelConfig {
                input_dim: 2,
                hidden_dim: 8,
                num_layers: 1,
                ..ModelConfig::default()
            },
            ..WorkflowConfig::default()
        };
        let model = ModelHandle::new(LstmAutoencoder::new(&config.model, 42));
        WorkflowExecutor::new(model, config)
    }

    fn diagnosis_with(severity_level: SeverityLevel) -> DiagnosisRecord {
        DiagnosisRecord {
            part_id: "P001".into(),
            part_name: "Battery".into(),
            confidence: 0.8,
            estimated_days_to_failure: 20.0,
            severity_level,
            issue_category: "performance_degradation".into(),
            supporting_metrics: Vec::new(),
        }
    }

    #[test]
    fn test_linear_edges_are_fixed() {
        let state = WorkflowState::new(VehicleIdentity::default(), Vec::new());
        assert_eq!(Stage::Ingest.successor(&state), Some(Stage::AnomalyDetect));
        assert_eq!(Stage::AnomalyDetect.successor(&state), Some(Stage::Diagnose));
        assert_eq!(Stage::Diagnose.successor(&state), Some(Stage::Engage));
        assert_eq!(
            Stage::Schedule.successor(&state),
            Some(Stage::SimulateFeedback)
        );
        assert_eq!(
            Stage::SimulateFeedback.successor(&state),
            Some(Stage::BuildPayload)
        );
        assert_eq!(Stage::BuildPayload.successor(&state), None);
    }

    #[test]
    fn test_engage_branches_on_severity() {
        let mut state = WorkflowState::new(VehicleIdentity::default(), Vec::new());

        // No diagnosis -> skip scheduling
        assert_eq!(
            Stage::Engage.successor(&state),
            Some(Stage::SimulateFeedback)
        );

        state.diagnosis = Some(diagnosis_with(SeverityLevel::Low));
        assert_eq!(
            Stage::Engage.successor(&state),
            Some(Stage::SimulateFeedback)
        );

        state.diagnosis = Some(diagnosis_with(SeverityLevel::Medium));
        assert_eq!(Stage::Engage.successor(&state), Some(Stage::Schedule));

        state.diagnosis = Some(diagnosis_with(SeverityLevel::High));
        assert_eq!(Stage::Engage.successor(&state), Some(Stage::Schedule));
    }

    #[test]
    fn test_invoke_visits_every_unconditional_stage() {
        let executor = test_executor();
        let telemetry: Vec<TelemetryPoint> = (0..10)
            .map(|t| {
                TelemetryPoint::new(Some(t as f64))
                    .with_metric("Battery_Voltage", 12.4)
                    .with_metric("Engine_Temperature", 90.0)
            })
            .collect();
        let identity = VehicleIdentity {
            vehicle_id: "VH-100".into(),
            model: "Falcon EV".into(),
            ..VehicleIdentity::default()
        };

        let terminal = executor.invoke(WorkflowState::new(identity, telemetry));

        // Terminal outputs from unconditional nodes are always present
        assert!(terminal.feedback.is_some());
        assert!(terminal.manufacturing_payload.is_some());
        // Each visited stage logged at least one line
        assert!(terminal.logs.iter().any(|l| l.contains("ingest:")));
        assert!(terminal.logs.iter().any(|l| l.contains("anomaly:")));
        assert!(terminal.logs.iter().any(|l| l.contains("diagnosis:")));
        assert!(terminal.logs.iter().any(|l| l.contains("engagement:")));
        assert!(terminal.logs.iter().any(|l| l.contains("feedback:")));
        assert!(terminal.logs.iter().any(|l| l.contains("manufacturing:")));
    }

    #[test]
    fn test_empty_telemetry_degrades_cleanly() {
        let executor = test_executor();
        let terminal = executor.invoke(WorkflowState::new(VehicleIdentity::default(), Vec::new()));

        assert!(terminal.anomalies.is_empty());
        assert!(terminal.diagnosis.is_none());
        assert!(!terminal.customer_notified);
        assert_eq!(terminal.notification_message, "");
        assert!(terminal.schedule.is_none());
        assert!(terminal.feedback.is_some());
        assert!(terminal.manufacturing_payload.is_some());
    }
}
