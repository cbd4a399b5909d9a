use anyhow::{Context, Result};
use autoapply_cli::config::default_config_path;
use autoapply_cli::{AppConfig, AppContext};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{
    cmd_exec, cmd_info, cmd_jobs, cmd_poll_once, cmd_run, cmd_validate, ExecArgs, JobsArgs,
    OutputFormat, ValidateArgs,
};

/// AutoApply - declarative browser workflows for job applications
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for pending jobs until interrupted
    Run,

    /// Run a single poll cycle and exit
    PollOnce,

    /// Compile a workflow document and print its tree
    Validate(ValidateArgs),

    /// Execute one workflow against one URL
    Exec(ExecArgs),

    /// Inspect and edit the job backlog
    Jobs(JobsArgs),

    /// Show version and effective configuration
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!("Starting AutoApply v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Validate(args) => cmd_validate(args, cli.output).await,
        Commands::Info => {
            let path = cli.config.clone().or_else(default_config_path);
            let shown = path.filter(|path| path.exists());
            cmd_info(&config, shown.as_deref()).await
        }
        Commands::Run => cmd_run(&app_context(config)?).await,
        Commands::PollOnce => cmd_poll_once(&app_context(config)?, cli.output).await,
        Commands::Exec(args) => cmd_exec(args, &app_context(config)?, cli.output).await,
        Commands::Jobs(args) => cmd_jobs(args, &app_context(config)?, cli.output).await,
    }
}

fn app_context(config: AppConfig) -> Result<AppContext> {
    AppContext::new(config).context("Invalid configuration")
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
