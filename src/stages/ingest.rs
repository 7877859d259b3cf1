//! Ingest stage: normalize incoming telemetry ordering.

use crate::types::WorkflowState;

/// Ensure telemetry is time-ordered and ready for downstream processing.
///
/// CSV-derived telemetry may not carry explicit timestamps; in that case the
/// original column order is the time axis and is preserved. The sort is
/// stable, so equal timestamps keep their relative order.
pub fn run(state: &mut WorkflowState) {
    state.log("ingest: normalizing telemetry ordering");

    let has_timestamps = state
        .telemetry
        .first()
        .is_some_and(|p| p.timestamp.is_some());

    if has_timestamps {
        state.telemetry.sort_by(|a, b| {
            let ta = a.timestamp.unwrap_or(0.0);
            let tb = b.timestamp.unwrap_or(0.0);
            ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    state.log(format!(
        "ingest: telemetry ready, points={}",
        state.telemetry.len()
    ));
}
