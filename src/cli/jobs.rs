use anyhow::{bail, Context, Result};
use autoapply_cli::AppContext;
use autoapply_scheduler::{Job, JobId, JobStore, SchedulerError};
use clap::{Args, Subcommand};
use tracing::warn;

use super::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub action: JobsAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum JobsAction {
    /// Show the backlog
    List {
        /// Only jobs the next poll may pick up
        #[arg(long)]
        pending: bool,
    },
    /// Add a job offer, armed for one application
    Add {
        #[arg(long)]
        url: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        employer: Option<String>,
    },
    /// Arm a job for another application attempt
    Rearm { id: JobId },
}

pub async fn cmd_jobs(args: JobsArgs, context: &AppContext, output: OutputFormat) -> Result<()> {
    let store = context.jobs();
    match args.action {
        JobsAction::List { pending } => {
            let jobs = store.list().await.context("Failed to read jobs")?;
            let jobs: Vec<Job> = jobs
                .into_iter()
                .filter(|job| !pending || job.is_pending())
                .collect();
            print_jobs(&jobs, output)?;
        }
        JobsAction::Add {
            url,
            title,
            employer,
        } => {
            match context.routes().resolve(&url) {
                Ok(_) => {}
                Err(err @ SchedulerError::InvalidJobUrl { .. }) => return Err(err.into()),
                Err(err) => warn!(error = %err, "job added without a matching workflow"),
            }
            let mut job = Job::new(url, title);
            job.employer = employer;
            let id = job.id;
            store.insert(job).await.context("Failed to add job")?;
            println!("{id}");
        }
        JobsAction::Rearm { id } => {
            let Some(mut job) = store.get(id).await.context("Failed to read jobs")? else {
                bail!("job {id} not found");
            };
            if job.is_applied {
                warn!(job_id = %id, "job is already marked applied; it will not be picked up");
            }
            job.should_apply = true;
            store.commit(&job).await.context("Failed to update job")?;
            println!("Job {id} re-armed");
        }
    }
    Ok(())
}

fn print_jobs(jobs: &[Job], output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(jobs)?),
        OutputFormat::Human => {
            if jobs.is_empty() {
                println!("No jobs");
            }
            for job in jobs {
                let state = if job.is_applied {
                    "applied"
                } else if job.should_apply {
                    "pending"
                } else {
                    "idle"
                };
                println!("{}  {:<8} {}  {}", job.id, state, job.title, job.url);
                if let Some(attempt) = job.last_attempt() {
                    println!(
                        "    last attempt {} at {}{}",
                        attempt.status,
                        attempt.timestamp.to_rfc3339(),
                        attempt
                            .error_message
                            .as_deref()
                            .map(|msg| format!(": {msg}"))
                            .unwrap_or_default()
                    );
                }
            }
        }
    }
    Ok(())
}
