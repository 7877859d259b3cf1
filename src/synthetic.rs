//! Synthetic fleet generator for demos and tests.
//!
//! Produces deterministic per-vehicle telemetry around realistic baselines,
//! with optional degradation scenarios that push one metric away from its
//! baseline over the course of the window. Stands in for the ingestion
//! collaborator: output satisfies the initial-state shape contract.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ModelConfig;
use crate::model::Window;
use crate::types::{TelemetryPoint, VehicleIdentity, WorkflowState};

/// Numeric metrics every synthetic vehicle reports, matching the default
/// `input_dim` of 4. Order here is informational; the anomaly stage derives
/// its own stable ordering from the telemetry itself.
pub const FLEET_METRICS: [&str; 4] = [
    "Battery_Voltage",
    "Brake_Pressure",
    "Engine_Temperature",
    "Fuel_Status",
];

/// Baseline (healthy) value per metric.
const BASELINES: [f64; 4] = [12.6, 32.0, 90.0, 0.6];

/// Per-metric gaussian-ish jitter amplitude around the baseline.
const JITTER: [f64; 4] = [0.05, 0.5, 1.0, 0.01];

/// Degradation scenario applied to one vehicle's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scenario {
    /// Healthy vehicle: all metrics jitter around baseline.
    #[default]
    Normal,
    /// Battery voltage sags progressively; emits a low-voltage DTC.
    BatteryDegradation,
    /// Engine temperature climbs progressively; emits an overheat DTC.
    CoolantOverheat,
}

impl Scenario {
    fn dtc(self) -> Option<&'static str> {
        match self {
            Scenario::Normal => None,
            Scenario::BatteryDegradation => Some("P0562"),
            Scenario::CoolantOverheat => Some("P0217"),
        }
    }
}

/// Generate one vehicle's telemetry window.
///
/// Deterministic for a given `(seed, steps, scenario)` triple. Degraded
/// metrics drift linearly away from baseline so the reconstruction error of
/// a baseline-trained model grows with the drift.
pub fn vehicle_telemetry(seed: u64, steps: usize, scenario: Scenario) -> Vec<TelemetryPoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(steps);

    for t in 0..steps {
        let progress = t as f64 / steps.max(1) as f64;
        let mut point = TelemetryPoint::new(Some(t as f64));

        for (idx, name) in FLEET_METRICS.iter().enumerate() {
            let jitter = (rng.gen::<f64>() * 2.0 - 1.0) * JITTER[idx];
            let mut value = BASELINES[idx] + jitter;

            match (scenario, *name) {
                (Scenario::BatteryDegradation, "Battery_Voltage") => {
                    value -= 3.0 * progress; // sag toward ~9.6 V
                }
                (Scenario::CoolantOverheat, "Engine_Temperature") => {
                    value += 35.0 * progress; // climb toward ~125 C
                }
                _ => {}
            }
            point = point.with_metric(name, value);
        }

        if let Some(code) = scenario.dtc() {
            point = point.with_metric("DTC", code);
        }
        points.push(point);
    }

    points
}

/// Build the initial workflow state for one synthetic vehicle, satisfying
/// the ingestion boundary contract.
pub fn initial_state(index: usize, scenario: Scenario, seed: u64, steps: usize) -> WorkflowState {
    let identity = VehicleIdentity {
        vehicle_id: format!("VH-{index:04}"),
        model: "Falcon EV".to_string(),
        variant: "LR-AWD".to_string(),
        customer_id: format!("C-{index:04}"),
        supplier_id: "S-007".to_string(),
        user_segment: String::new(),
    };
    let telemetry = vehicle_telemetry(seed.wrapping_add(index as u64), steps, scenario);
    WorkflowState::new(identity, telemetry)
}

/// Training pairs of healthy windows in the same raw representation the
/// anomaly stage extracts, targets equal to inputs (pure reconstruction).
pub fn normal_training_pairs(
    cfg: &ModelConfig,
    count: usize,
    steps: usize,
    seed: u64,
) -> Vec<(Window, Window)> {
    let mut pairs = Vec::with_capacity(count);
    for i in 0..count {
        let points = vehicle_telemetry(seed.wrapping_add(i as u64), steps, Scenario::Normal);
        let window: Window = points
            .iter()
            .map(|p| {
                FLEET_METRICS
                    .iter()
                    .take(cfg.input_dim)
                    .enumerate()
                    .map(|(idx, name)| p.metrics[*name].as_numeric().unwrap_or(BASELINES[idx]))
                    .collect()
            })
            .collect();
        pairs.push((window.clone(), window));
    }
    pairs
}
