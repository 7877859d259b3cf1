//! Manufacturing stage: assemble the flattened OEM analytics payload.

use chrono::Utc;

use crate::config::WorkflowConfig;
use crate::types::{ManufacturingPayload, WorkflowState};

/// Sentinel workshop id when no service was scheduled.
const WORKSHOP_NOT_APPLICABLE: &str = "W-NA";

/// Build the terminal payload for downstream OEM sinks.
///
/// Every upstream record is optional here: missing diagnosis, schedule, or
/// feedback fields take sentinel defaults so the payload shape is always
/// complete. Always runs, always writes.
pub fn run(state: &mut WorkflowState, config: &WorkflowConfig) {
    state.log("manufacturing: assembling payload");

    let identity = &state.identity;
    let diagnosis = state.diagnosis.as_ref();
    let schedule = state.schedule.as_ref();
    let feedback = state.feedback.as_ref();

    let user_segment = if identity.user_segment.is_empty() {
        config.default_user_segment.clone()
    } else {
        identity.user_segment.clone()
    };

    let payload = ManufacturingPayload {
        vehicle_id: identity.vehicle_id.clone(),
        model: identity.model.clone(),
        supplier_id: if identity.supplier_id.is_empty() {
            "S-NA".to_string()
        } else {
            identity.supplier_id.clone()
        },
        customer_id: if identity.customer_id.is_empty() {
            "C-NA".to_string()
        } else {
            identity.customer_id.clone()
        },
        user_segment,
        failure_part_id: diagnosis.map_or_else(|| "P999".to_string(), |d| d.part_id.clone()),
        failure_part_name: diagnosis.map_or_else(|| "Unknown".to_string(), |d| d.part_name.clone()),
        issue_category: diagnosis
            .map_or_else(|| "unspecified".to_string(), |d| d.issue_category.clone()),
        workshop_id: schedule.map_or_else(
            || WORKSHOP_NOT_APPLICABLE.to_string(),
            |s| s.workshop_id.clone(),
        ),
        repair_time_hours: feedback.map_or(0.0, |f| f.repair_time_hours),
        diagnosis_correct: feedback.is_some_and(|f| f.diagnosis_correct),
        timestamp: Utc::now().to_rfc3339(),
    };

    state.log(format!(
        "manufacturing: payload ready for OEM analytics (part={}, workshop={})",
        payload.failure_part_id, payload.workshop_id
    ));
    state.manufacturing_payload = Some(payload);
}
