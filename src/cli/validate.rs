use action_flow::compile;
use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

use super::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Workflow JSON document
    pub file: PathBuf,
}

pub async fn cmd_validate(args: ValidateArgs, output: OutputFormat) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let command =
        compile(&text).with_context(|| format!("{} is not a valid workflow", args.file.display()))?;

    match output {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "file": args.file.display().to_string(),
                "root": command.kind(),
                "nodes": command.node_count(),
                "tree": command,
            }))?
        ),
        OutputFormat::Human => {
            println!(
                "{}: ok ({} nodes)",
                args.file.display(),
                command.node_count()
            );
            print!("{}", command.outline());
        }
    }
    Ok(())
}
