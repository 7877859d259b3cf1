//! Parallel batch invocation across a fleet of vehicles.
//!
//! Invocations share only the read-only executor (model snapshot + config),
//! never a workflow state, so a fleet batch is embarrassingly parallel.
//! Failures are isolated per vehicle: one panicking invocation is reported
//! with its vehicle id and does not abort the rest of the batch.

use rayon::prelude::*;
use thiserror::Error;
use tracing::{error, info};

use crate::pipeline::WorkflowExecutor;
use crate::types::WorkflowState;

/// A per-vehicle invocation failure.
#[derive(Debug, Error)]
#[error("workflow invocation for vehicle {vehicle_id} failed: {reason}")]
pub struct BatchError {
    pub vehicle_id: String,
    pub reason: String,
}

/// Run one invocation per initial state, in parallel, preserving input order.
///
/// Each element of the result is either the terminal state or a
/// [`BatchError`] naming the vehicle whose invocation failed.
pub fn run_batch(
    executor: &WorkflowExecutor,
    states: Vec<WorkflowState>,
) -> Vec<Result<WorkflowState, BatchError>> {
    let total = states.len();
    let results: Vec<Result<WorkflowState, BatchError>> = states
        .into_par_iter()
        .map(|state| {
            let vehicle_id = state.identity.vehicle_id.clone();
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| executor.invoke(state)))
                .map_err(|payload| {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(%vehicle_id, %reason, "invocation failed");
                    BatchError { vehicle_id, reason }
                })
        })
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(total, failed, "fleet batch complete");
    results
}
