//! Turning a run's outcome into an application attempt

use action_flow::context::WORKFLOW_FINISHED_SUCCESSFULLY;
use action_flow::ExecutionContext;
use chrono::{DateTime, Utc};

use crate::model::{ApplicationAttempt, AttemptStatus};

/// How one job's execution ended, as seen from the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The workflow ran to termination; its context carries the verdict.
    Finished(ExecutionContext),
    /// The run was aborted by an error before or during execution.
    Failed(String),
}

/// The attempt to record for `outcome`.
///
/// Applying it to the stored job is the store's business, see
/// [`JobStore::record_attempt`](crate::store::JobStore::record_attempt).
pub fn attempt_for(outcome: &RunOutcome, now: DateTime<Utc>) -> ApplicationAttempt {
    let (success, error_message) = match outcome {
        RunOutcome::Finished(ctx) => {
            let (success, message) = ctx.outcome();
            let message = if !message.is_empty() {
                Some(message)
            } else if !ctx.contains(WORKFLOW_FINISHED_SUCCESSFULLY) {
                Some("workflow finished without exit".to_string())
            } else {
                None
            };
            (success, message)
        }
        RunOutcome::Failed(reason) => (false, Some(reason.clone())),
    };

    ApplicationAttempt {
        timestamp: now,
        status: AttemptStatus::from_outcome(success),
        error_message,
    }
}
