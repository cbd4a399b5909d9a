//! Job scheduler
//!
//! Polls the job store on a fixed interval, runs one workflow per pending job
//! concurrently (bounded by the batch size) and records every outcome as an
//! application attempt.

pub mod error;
pub mod metrics;
pub mod model;
pub mod reconcile;
pub mod routing;
pub mod runtime;
pub mod seed;
pub mod store;

pub use error::{SchedulerError, StoreError};
pub use model::{ApplicationAttempt, AttemptStatus, Job, JobId, SchedulerConfig};
pub use reconcile::{attempt_for, RunOutcome};
pub use routing::WorkflowRoutes;
pub use runtime::{AutoApplyScheduler, PollReport};
pub use seed::{initial_context, ApplicantProfile};
pub use store::{select_pending, InMemoryJobStore, JobStore};
