//! Polling batch scheduler

use action_flow::{FlowError, WorkflowRunner, WorkflowSource};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::SchedulerError;
use crate::metrics;
use crate::model::{AttemptStatus, Job, SchedulerConfig};
use crate::reconcile::{attempt_for, RunOutcome};
use crate::routing::WorkflowRoutes;
use crate::seed::{initial_context, ApplicantProfile};
use crate::store::JobStore;

/// Counts for one poll cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Runs stopped by shutdown; their jobs stay pending.
    pub cancelled: usize,
}

pub struct AutoApplyScheduler {
    config: SchedulerConfig,
    jobs: Arc<dyn JobStore>,
    workflows: Arc<dyn WorkflowSource>,
    runner: Arc<WorkflowRunner>,
    routes: Arc<WorkflowRoutes>,
    applicant: Arc<ApplicantProfile>,
}

impl AutoApplyScheduler {
    pub fn new(
        config: SchedulerConfig,
        jobs: Arc<dyn JobStore>,
        workflows: Arc<dyn WorkflowSource>,
        runner: Arc<WorkflowRunner>,
        routes: WorkflowRoutes,
        applicant: ApplicantProfile,
    ) -> Self {
        Self {
            config,
            jobs,
            workflows,
            runner,
            routes: Arc::new(routes),
            applicant: Arc::new(applicant),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Poll on the configured interval until `cancel` fires.
    ///
    /// The first poll happens immediately. A cycle whose store access fails is logged
    /// and the loop carries on with the next tick.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.config.polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.config.polling_interval.as_secs(),
            max_concurrent = self.config.max_concurrent_instances,
            "scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(err) = self.poll_once(&cancel).await {
                error!(error = %err, "poll failed");
            }
            if cancel.is_cancelled() {
                break;
            }
        }
        info!("scheduler stopped");
    }

    /// Select one batch, run it concurrently and reconcile every job in it.
    pub async fn poll_once(&self, cancel: &CancellationToken) -> Result<PollReport, SchedulerError> {
        let batch = self
            .jobs
            .pending(self.config.max_concurrent_instances)
            .await?;
        metrics::record_poll(batch.len());
        let mut report = PollReport {
            selected: batch.len(),
            ..PollReport::default()
        };
        if batch.is_empty() {
            debug!("no pending jobs");
            return Ok(report);
        }

        let started = Instant::now();
        info!(jobs = batch.len(), "poll started");

        let handles: Vec<_> = batch
            .iter()
            .map(|job| {
                let span = info_span!("job", job_id = %job.id);
                tokio::spawn(
                    run_job(
                        job.clone(),
                        Arc::clone(&self.routes),
                        Arc::clone(&self.workflows),
                        Arc::clone(&self.runner),
                        Arc::clone(&self.applicant),
                        cancel.clone(),
                    )
                    .instrument(span),
                )
            })
            .collect();
        let results = join_all(handles).await;

        for (job, joined) in batch.into_iter().zip(results) {
            let result = joined
                .unwrap_or_else(|err| Err(SchedulerError::TaskAborted(err.to_string())));
            let outcome = match result {
                Ok(ctx) => RunOutcome::Finished(ctx),
                Err(SchedulerError::Workflow(FlowError::Cancelled)) => {
                    info!(job_id = %job.id, "job interrupted by shutdown; left pending");
                    metrics::record_cancelled();
                    report.cancelled += 1;
                    continue;
                }
                Err(err) => {
                    error!(job_id = %job.id, url = %job.url, error = %err, "job failed");
                    RunOutcome::Failed(err.to_string())
                }
            };

            // Applied to the stored job, not the batch copy, which may be stale by now.
            let attempt = attempt_for(&outcome, Utc::now());
            let status = attempt.status;
            match status {
                AttemptStatus::Success => {
                    metrics::record_succeeded();
                    report.succeeded += 1;
                }
                AttemptStatus::Failure => {
                    metrics::record_failed();
                    report.failed += 1;
                }
            }
            if let Err(err) = self.jobs.record_attempt(job.id, attempt).await {
                metrics::record_commit_error();
                error!(job_id = %job.id, error = %err, "failed to record attempt");
                continue;
            }
            info!(job_id = %job.id, status = %status, "attempt recorded");
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "poll finished"
        );
        Ok(report)
    }
}

async fn run_job(
    job: Job,
    routes: Arc<WorkflowRoutes>,
    workflows: Arc<dyn WorkflowSource>,
    runner: Arc<WorkflowRunner>,
    applicant: Arc<ApplicantProfile>,
    cancel: CancellationToken,
) -> Result<action_flow::ExecutionContext, SchedulerError> {
    let workflow = routes.resolve(&job.url)?;
    let command = workflows.get_workflow(workflow).await?;
    if cancel.is_cancelled() {
        return Err(FlowError::Cancelled.into());
    }
    info!(workflow = %workflow, url = %job.url, "applying");
    let ctx = initial_context(&job, &applicant);
    runner
        .run(&command, Some(ctx), &cancel)
        .await
        .map_err(|err| {
            if err.is_job_fatal() {
                warn!(workflow = %workflow, error = %err, "workflow definition problem");
            }
            SchedulerError::from(err)
        })
}
