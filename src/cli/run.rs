use anyhow::{Context, Result};
use autoapply_cli::AppContext;
use autoapply_scheduler::metrics as scheduler_metrics;
use serde_json::json;

use super::{shutdown_token, OutputFormat};

pub async fn cmd_run(context: &AppContext) -> Result<()> {
    let scheduler = context.scheduler();
    let cancel = shutdown_token();
    scheduler.run(cancel).await;

    let totals = scheduler_metrics::snapshot();
    println!(
        "Scheduler stopped after {} polls: {} succeeded, {} failed, {} interrupted",
        totals.polls, totals.succeeded, totals.failed, totals.cancelled
    );
    Ok(())
}

pub async fn cmd_poll_once(context: &AppContext, output: OutputFormat) -> Result<()> {
    let report = context
        .scheduler()
        .poll_once(&shutdown_token())
        .await
        .context("poll failed")?;

    match output {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "selected": report.selected,
                "succeeded": report.succeeded,
                "failed": report.failed,
                "cancelled": report.cancelled,
            })
        ),
        OutputFormat::Human => {
            if report.selected == 0 {
                println!("No pending jobs");
            } else {
                println!(
                    "Processed {} jobs: {} succeeded, {} failed, {} interrupted",
                    report.selected, report.succeeded, report.failed, report.cancelled
                );
            }
        }
    }
    Ok(())
}
