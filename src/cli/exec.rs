use action_flow::WorkflowSource;
use anyhow::{Context, Result};
use autoapply_cli::AppContext;
use autoapply_scheduler::{initial_context, Job};
use clap::Args;
use serde_json::{json, Map, Value};

use super::{shutdown_token, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ExecArgs {
    /// Workflow name; resolved from the URL's host when omitted
    #[arg(short, long)]
    pub workflow: Option<String>,

    /// Job offer URL
    #[arg(short, long)]
    pub url: String,

    /// Job title bound as JobTitle
    #[arg(short, long, default_value = "")]
    pub title: String,

    /// Employer bound as CompanyName
    #[arg(short, long)]
    pub employer: Option<String>,
}

/// Run one workflow against one URL; the job store is not touched.
pub async fn cmd_exec(args: ExecArgs, context: &AppContext, output: OutputFormat) -> Result<()> {
    let workflow = match &args.workflow {
        Some(name) => name.clone(),
        None => context.routes().resolve(&args.url)?.to_string(),
    };
    let command = context
        .workflows()
        .get_workflow(&workflow)
        .await
        .with_context(|| format!("Failed to load workflow '{workflow}'"))?;

    let mut job = Job::new(&args.url, &args.title);
    job.employer = args.employer.clone();
    let initial = initial_context(&job, &context.config().applicant);

    let ctx = context
        .runner()
        .run(&command, Some(initial), &shutdown_token())
        .await
        .with_context(|| format!("Workflow '{workflow}' failed"))?;
    let (success, message) = ctx.outcome();

    match output {
        OutputFormat::Json => {
            let variables: Map<String, Value> = ctx
                .entries()
                .into_iter()
                .map(|(name, value)| {
                    let value = serde_json::to_value(value).unwrap_or(Value::Null);
                    (name.to_string(), value)
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "workflow": workflow,
                    "success": success,
                    "message": message,
                    "context": variables,
                }))?
            );
        }
        OutputFormat::Human => {
            println!(
                "Workflow '{}' finished: {}",
                workflow,
                if success { "success" } else { "failure" }
            );
            if !message.is_empty() {
                println!("Message: {message}");
            }
            println!("Context:");
            for (name, value) in ctx.entries() {
                println!("  {name} = {value}");
            }
        }
    }
    Ok(())
}
