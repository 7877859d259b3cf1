//! Reconstruction-error computation and threshold-based anomaly scoring.

use crate::model::autoencoder::LstmAutoencoder;
use crate::model::Window;

/// One metric flagged by the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyScore {
    pub metric_name: String,
    /// `min(error / (2 * threshold), 1.0)` — reaches 1.0 at twice the
    /// threshold, linear below.
    pub severity: f64,
    /// Raw per-feature mean squared reconstruction error.
    pub error: f64,
}

/// Per-feature mean squared error for a single (recon, original) window pair,
/// averaged over time.
pub fn per_feature_error(recon: &Window, original: &Window) -> Vec<f64> {
    let features = original.first().map_or(0, Vec::len);
    let mut sums = vec![0.0; features];
    for (r_row, o_row) in recon.iter().zip(original.iter()) {
        for f in 0..features {
            let diff = r_row[f] - o_row[f];
            sums[f] += diff * diff;
        }
    }
    let steps = original.len().max(1) as f64;
    for s in &mut sums {
        *s /= steps;
    }
    sums
}

/// Per-feature mean squared error over a batch of window pairs, averaged over
/// batch and time. Sum-based, so invariant to batch ordering.
pub fn reconstruction_error(recons: &[Window], originals: &[Window]) -> Vec<f64> {
    let features = originals
        .first()
        .and_then(|w| w.first())
        .map_or(0, Vec::len);
    let mut sums = vec![0.0; features];
    let mut steps = 0usize;

    for (recon, original) in recons.iter().zip(originals.iter()) {
        for (r_row, o_row) in recon.iter().zip(original.iter()) {
            for f in 0..features {
                let diff = r_row[f] - o_row[f];
                sums[f] += diff * diff;
            }
        }
        steps += original.len();
    }

    let denom = steps.max(1) as f64;
    for s in &mut sums {
        *s /= denom;
    }
    sums
}

/// Run inference on one window and score each metric against the threshold.
///
/// Emits one score per feature whose error strictly exceeds `threshold`,
/// in `metric_names` order. Deterministic given identical weights and input;
/// no side effects. NaN errors propagate untouched (a NaN never exceeds the
/// threshold, so it is never flagged — the known numerical-error gap).
pub fn infer_anomalies(
    model: &LstmAutoencoder,
    window: &Window,
    metric_names: &[String],
    threshold: f64,
) -> Vec<AnomalyScore> {
    let recon = model.forward(window);
    let errors = per_feature_error(&recon, window);

    metric_names
        .iter()
        .zip(errors.iter())
        .filter(|(_, &error)| error > threshold)
        .map(|(name, &error)| AnomalyScore {
            metric_name: name.clone(),
            severity: (error / (threshold * 2.0)).min(1.0),
            error,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    #[test]
    fn test_per_feature_error_exact() {
        let original: Window = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let recon: Window = vec![vec![1.5, 2.0], vec![3.0, 3.0]];
        let errors = per_feature_error(&recon, &original);
        // feature 0: (0.25 + 0) / 2; feature 1: (0 + 1) / 2
        assert!((errors[0] - 0.125).abs() < 1e-12);
        assert!((errors[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_batch_error_is_order_invariant() {
        let a: Window = vec![vec![0.0, 0.0]; 3];
        let b: Window = vec![vec![1.0, -1.0]; 3];
        let ra: Window = vec![vec![0.5, 0.0]; 3];
        let rb: Window = vec![vec![1.0, 0.0]; 3];

        let fwd = reconstruction_error(&[ra.clone(), rb.clone()], &[a.clone(), b.clone()]);
        let rev = reconstruction_error(&[rb, ra], &[b, a]);
        for (x, y) in fwd.iter().zip(rev.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_batch_error_matches_single_window() {
        let original: Window = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let recon: Window = vec![vec![1.5, 2.0], vec![3.0, 3.0]];
        let single = per_feature_error(&recon, &original);
        let batched = reconstruction_error(&[recon], &[original]);
        for (x, y) in single.iter().zip(batched.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_severity_saturates_at_twice_threshold() {
        let threshold = 0.05;
        // error == 2 * threshold -> severity exactly 1.0
        let sev = |error: f64| (error / (threshold * 2.0)).min(1.0);
        assert!((sev(0.1) - 1.0).abs() < 1e-12);
        assert!((sev(0.05) - 0.5).abs() < 1e-12);
        assert!(sev(0.2) <= 1.0);
    }

    #[test]
    fn test_infer_respects_strict_threshold_and_order() {
        let cfg = ModelConfig {
            input_dim: 2,
            hidden_dim: 8,
            num_layers: 1,
            ..ModelConfig::default()
        };
        let model = crate::model::LstmAutoencoder::new(&cfg, 42);
        let names = vec!["Battery_Voltage".to_string(), "Engine_Temperature".to_string()];
        let window: Window = vec![vec![70.0, 90.0]; 20];

        // Untrained model on large raw values: errors are huge, both flagged
        let scores = infer_anomalies(&model, &window, &names, 0.05);
        for score in &scores {
            assert!((0.0..=1.0).contains(&score.severity));
            assert!(score.error > 0.05);
            assert!(names.contains(&score.metric_name));
        }
        // Emission order follows feature-name order
        let emitted: Vec<_> = scores.iter().map(|s| s.metric_name.clone()).collect();
        let expected: Vec<_> = names
            .iter()
            .filter(|n| emitted.contains(n))
            .cloned()
            .collect();
        assert_eq!(emitted, expected);
    }

    #[test]
    fn test_infer_is_deterministic() {
        let cfg = ModelConfig {
            input_dim: 2,
            hidden_dim: 8,
            num_layers: 1,
            ..ModelConfig::default()
        };
        let model = crate::model::LstmAutoencoder::new(&cfg, 5);
        let names = vec!["a".to_string(), "b".to_string()];
        let window: Window = vec![vec![0.2, 0.4]; 8];

        let first = infer_anomalies(&model, &window, &names, 0.01);
        let second = infer_anomalies(&model, &window, &names, 0.01);
        assert_eq!(first, second);
    }
}
