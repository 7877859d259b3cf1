//! Feedback stage: simulate post-service signals.
//!
//! Feedback is always produced, even when no service was scheduled — the
//! pipeline stays linear and downstream analytics always have a record. This
//! is preserved as-observed behavior, flagged for product review rather than
//! gated here.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{FeedbackRecord, WorkflowState};

/// Stable per-vehicle seed: first eight bytes of the md5 digest of the
/// vehicle id. Never derived from wall-clock time, so repeated invocations
/// for the same vehicle produce identical feedback.
fn feedback_seed(vehicle_id: &str) -> u64 {
    let d = md5::compute(vehicle_id.as_bytes()).0;
    u64::from_le_bytes([d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]])
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Simulate feedback collection for visualization and meta-learning.
pub fn run(state: &mut WorkflowState) {
    state.log("feedback: collecting simulated feedback");

    let vehicle_id = state.identity.vehicle_id.clone();
    let part_name = state
        .diagnosis
        .as_ref()
        .map_or_else(|| "component".to_string(), |d| d.part_name.clone());

    let mut rng = StdRng::seed_from_u64(feedback_seed(&vehicle_id));

    let feedback = FeedbackRecord {
        customer_rating: round2(rng.gen_range(3.5..5.0)),
        customer_comments: format!(
            "Service completed for {vehicle_id}. Performance improved after {part_name} servicing."
        ),
        workshop_comments: format!(
            "Inspected and addressed {part_name}. Post-repair diagnostics within normal range."
        ),
        repair_time_hours: round1(rng.gen_range(2.0..5.0)),
        diagnosis_correct: rng.gen_range(0..3) < 2,
    };

    state.log(format!(
        "feedback: captured rating {} for {vehicle_id} with correctness={}",
        feedback.customer_rating, feedback.diagnosis_correct
    ));
    state.feedback = Some(feedback);
}
