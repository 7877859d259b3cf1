//! Diagnosis stage: map the strongest anomaly to a likely failing part.

use crate::config::WorkflowConfig;
use crate::types::{DiagnosisRecord, SeverityLevel, WorkflowState};

/// Static metric → part lookup. Unmapped metrics fall back to a generic
/// inspection entry rather than failing the diagnosis.
fn part_for_metric(metric: &str) -> (&'static str, &'static str) {
    match metric {
        "Battery_Voltage" | "Battery_SoC" => ("P001", "Battery"),
        "Engine_Temperature" => ("P003", "Cooling System"),
        "Brake_Pressure" => ("P004", "Brake System"),
        "Speed" => ("P005", "Transmission / Powertrain"),
        "Fuel_Status" => ("P006", "Fuel System"),
        "Odometer_Reading" => ("P007", "Wear & Tear Components"),
        _ => ("P999", "General Inspection Required"),
    }
}

/// Grade a continuous severity against the configured thresholds.
fn severity_level(severity: f64, config: &WorkflowConfig) -> SeverityLevel {
    if severity >= config.high_severity_threshold {
        SeverityLevel::High
    } else if severity >= config.medium_severity_threshold {
        SeverityLevel::Medium
    } else {
        SeverityLevel::Low
    }
}

/// Derive a diagnosis from the detected anomalies, or clear it when none
/// were detected.
///
/// The primary anomaly is the first one holding the maximum severity (ties
/// broken by list order, which is stable because the detector emits in
/// feature-name order).
pub fn run(state: &mut WorkflowState, config: &WorkflowConfig) {
    state.log("diagnosis: evaluating anomalies");

    let Some(first) = state.anomalies.first() else {
        state.log("diagnosis: no anomalies present; skipping diagnosis");
        state.diagnosis = None;
        return;
    };

    let mut primary = first;
    for anomaly in &state.anomalies[1..] {
        if anomaly.severity > primary.severity {
            primary = anomaly;
        }
    }

    let primary_metric = primary.metric_name.clone();
    let severity = primary.severity;
    let (part_id, part_name) = part_for_metric(&primary_metric);
    let level = severity_level(severity, config);

    let diagnosis = DiagnosisRecord {
        part_id: part_id.to_string(),
        part_name: part_name.to_string(),
        confidence: (0.5 + severity / 2.0).min(1.0),
        estimated_days_to_failure: ((1.0 - severity) * 60.0).max(1.0),
        severity_level: level,
        issue_category: "performance_degradation".to_string(),
        supporting_metrics: state
            .anomalies
            .iter()
            .map(|a| a.metric_name.clone())
            .collect(),
    };

    state.log(format!(
        "diagnosis: mapped metric {primary_metric} to {part_name} with severity {level}"
    ));
    state.diagnosis = Some(diagnosis);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnomalyRecord, VehicleIdentity};

    fn anomaly(metric: &str, severity: f64) -> AnomalyRecord {
        AnomalyRecord {
            metric_name: metric.to_string(),
            severity,
            error: severity * 0.1,
            explanation: String::new(),
        }
    }

    fn state_with(anomalies: Vec<AnomalyRecord>) -> WorkflowState {
        let mut state = WorkflowState::new(VehicleIdentity::default(), Vec::new());
        state.anomalies = anomalies;
        state
    }

    #[test]
    fn test_no_anomalies_clears_diagnosis() {
        let mut state = state_with(Vec::new());
        run(&mut state, &WorkflowConfig::default());
        assert!(state.diagnosis.is_none());
    }

    #[test]
    fn test_first_maximum_wins_on_ties() {
        let mut state = state_with(vec![
            anomaly("Battery_Voltage", 0.8),
            anomaly("Engine_Temperature", 0.8),
        ]);
        run(&mut state, &WorkflowConfig::default());

        let diagnosis = state.diagnosis.expect("diagnosis");
        assert_eq!(diagnosis.part_id, "P001");
        assert_eq!(diagnosis.part_name, "Battery");
    }

    #[test]
    fn test_unmapped_metric_falls_back_to_inspection() {
        let mut state = state_with(vec![anomaly("Cabin_Humidity", 0.9)]);
        run(&mut state, &WorkflowConfig::default());

        let diagnosis = state.diagnosis.expect("diagnosis");
        assert_eq!(diagnosis.part_id, "P999");
        assert_eq!(diagnosis.part_name, "General Inspection Required");
    }

    #[test]
    fn test_confidence_and_days_bounds() {
        for severity in [0.0, 0.1, 0.4, 0.7, 0.95, 1.0] {
            let mut state = state_with(vec![anomaly("Speed", severity)]);
            run(&mut state, &WorkflowConfig::default());

            let d = state.diagnosis.expect("diagnosis");
            assert!((0.5..=1.0).contains(&d.confidence), "confidence {severity}");
            assert!(
                (1.0..=60.0).contains(&d.estimated_days_to_failure),
                "days {severity}"
            );
        }
    }

    #[test]
    fn test_severity_levels_follow_thresholds() {
        let config = WorkflowConfig::default(); // medium 0.4, high 0.7
        let cases = [
            (0.39, SeverityLevel::Low),
            (0.4, SeverityLevel::Medium),
            (0.69, SeverityLevel::Medium),
            (0.7, SeverityLevel::High),
            (1.0, SeverityLevel::High),
        ];
        for (severity, expected) in cases {
            let mut state = state_with(vec![anomaly("Speed", severity)]);
            run(&mut state, &config);
            assert_eq!(
                state.diagnosis.expect("diagnosis").severity_level,
                expected,
                "severity {severity}"
            );
        }
    }

    #[test]
    fn test_supporting_metrics_lists_all_anomalies() {
        let mut state = state_with(vec![
            anomaly("Battery_Voltage", 0.3),
            anomaly("Brake_Pressure", 0.9),
        ]);
        run(&mut state, &WorkflowConfig::default());

        let diagnosis = state.diagnosis.expect("diagnosis");
        assert_eq!(diagnosis.part_id, "P004");
        assert_eq!(
            diagnosis.supporting_metrics,
            vec!["Battery_Voltage", "Brake_Pressure"]
        );
    }
}
