//! Scheduling stage: allocate a workshop slot for actionable diagnoses.

use chrono::{Duration, Utc};

use crate::types::{ScheduleRecord, WorkflowState};

/// Static workshop roster. First-come-first-served allocation — there is no
/// live capacity feed, so the first entry always wins.
struct Workshop {
    id: &'static str,
    name: &'static str,
}

const WORKSHOPS: [Workshop; 3] = [
    Workshop {
        id: "W001",
        name: "City Central Auto",
    },
    Workshop {
        id: "W002",
        name: "Northside Motors",
    },
    Workshop {
        id: "W003",
        name: "Express Auto South",
    },
];

/// Default mechanic assigned to mock allocations.
const DEFAULT_MECHANIC: &str = "M-1001";

/// Allocate a workshop slot one day out, priority mirroring the diagnosis
/// severity. Produces no schedule when there is no diagnosis.
pub fn run(state: &mut WorkflowState) {
    state.log("scheduling: determining workshop slot");

    let Some(diagnosis) = state.diagnosis.as_ref() else {
        state.log("scheduling: no diagnosis available; skipping scheduling");
        state.schedule = None;
        return;
    };

    let chosen = &WORKSHOPS[0];
    let slot_time = Utc::now() + Duration::days(1);
    let priority_tag = diagnosis.severity_level;

    let schedule = ScheduleRecord {
        workshop_id: chosen.id.to_string(),
        workshop_name: chosen.name.to_string(),
        slot_time,
        mechanic_id: DEFAULT_MECHANIC.to_string(),
        priority_tag,
    };

    state.log(format!(
        "scheduling: assigned workshop {} at {} with priority {priority_tag}",
        chosen.name,
        slot_time.to_rfc3339()
    ));
    state.schedule = Some(schedule);
}
