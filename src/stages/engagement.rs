//! Engagement stage: decide whether to notify the customer.

use crate::types::WorkflowState;

/// Notify iff the diagnosis severity is medium or high; craft the message.
///
/// Low severity is monitored silently. The days-to-service figure is the
/// estimated days-to-failure, integer-floored with a one-day minimum.
pub fn run(state: &mut WorkflowState) {
    state.log("engagement: evaluating notification need");

    let Some(diagnosis) = state.diagnosis.clone() else {
        state.log("engagement: no diagnosis available; skipping notification");
        state.customer_notified = false;
        state.notification_message = String::new();
        return;
    };

    let notify = diagnosis.severity_level.is_actionable();
    if !notify {
        state.log("engagement: severity low; monitoring without notification");
        state.customer_notified = false;
        state.notification_message = String::new();
        return;
    }

    let customer = if state.identity.customer_id.is_empty() {
        "Customer"
    } else {
        state.identity.customer_id.as_str()
    };
    let vehicle = if state.identity.vehicle_id.is_empty() {
        "your vehicle"
    } else {
        state.identity.vehicle_id.as_str()
    };

    #[allow(clippy::cast_possible_truncation)]
    let days_to_service = (diagnosis.estimated_days_to_failure.floor() as i64).max(1);

    let message = format!(
        "{customer}, we detected a potential issue with {vehicle} related to {} \
         (severity: {}). Recommended action: schedule service within {days_to_service} days.",
        diagnosis.part_name, diagnosis.severity_level
    );

    state.log(format!(
        "engagement: customer will be notified. Message='{message}'"
    ));
    state.customer_notified = true;
    state.notification_message = message;
}
