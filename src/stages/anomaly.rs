//! Anomaly detection stage: score telemetry against the LSTM autoencoder.

use crate::config::WorkflowConfig;
use crate::model::{infer_anomalies, LstmAutoencoder, Window};
use crate::stages::TelemetryError;
use crate::types::{AnomalyRecord, TelemetryPoint, WorkflowState};

/// Convert telemetry points into a model window plus the ordered feature
/// names backing its columns.
///
/// The feature set is the numeric metrics of the first point's key set —
/// categorical codes (DTCs) are excluded from modeling. Later points missing
/// a feature contribute 0.0. Name order is the `BTreeMap` key order, so the
/// window layout is stable across runs.
pub(crate) fn extract_window(
    points: &[TelemetryPoint],
) -> Result<(Window, Vec<String>), TelemetryError> {
    let first = points.first().ok_or(TelemetryError::Empty)?;

    let metric_names: Vec<String> = first
        .metrics
        .iter()
        .filter(|(_, value)| value.as_numeric().is_some())
        .map(|(name, _)| name.clone())
        .collect();

    if metric_names.is_empty() {
        return Err(TelemetryError::NoNumericMetrics);
    }

    let window: Window = points
        .iter()
        .map(|point| {
            metric_names
                .iter()
                .map(|name| {
                    point
                        .metrics
                        .get(name)
                        .and_then(crate::types::MetricValue::as_numeric)
                        .unwrap_or(0.0)
                })
                .collect()
        })
        .collect();

    Ok((window, metric_names))
}

/// Run reconstruction-based detection and record per-metric anomalies.
///
/// Fails fast to an empty anomaly list (with a log entry) when telemetry is
/// empty, carries no numeric metrics, or carries a different number of
/// numeric metrics than the model was built for; the invocation continues
/// and downstream stages degrade to a "no anomaly" outcome.
pub fn run(state: &mut WorkflowState, model: &LstmAutoencoder, config: &WorkflowConfig) {
    state.log("anomaly: running LSTM reconstruction scoring");

    let (window, metric_names) = match extract_window(&state.telemetry) {
        Ok(extracted) => extracted,
        Err(err) => {
            state.log(format!("anomaly: failed to extract series: {err}"));
            state.anomalies = Vec::new();
            return;
        }
    };

    // The model scores fixed-width rows; a window wider or narrower than
    // input_dim would misalign the weights, so it must never reach forward.
    if metric_names.len() != model.input_dim() {
        let err = TelemetryError::FeatureMismatch {
            got: metric_names.len(),
            expected: model.input_dim(),
        };
        state.log(format!("anomaly: failed to extract series: {err}"));
        state.anomalies = Vec::new();
        return;
    }

    let threshold = config.model.anomaly_threshold;
    let scores = infer_anomalies(model, &window, &metric_names, threshold);

    state.anomalies = scores
        .into_iter()
        .map(|score| AnomalyRecord {
            explanation: format!(
                "{} reconstruction error {:.4} exceeds threshold",
                score.metric_name, score.error
            ),
            metric_name: score.metric_name,
            severity: score.severity,
            error: score.error,
        })
        .collect();

    state.log(format!(
        "anomaly: detected {} anomalies above threshold {threshold}",
        state.anomalies.len()
    ));
}
