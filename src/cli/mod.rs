pub mod exec;
pub mod info;
pub mod jobs;
pub mod run;
pub mod validate;

pub use exec::{cmd_exec, ExecArgs};
pub use info::cmd_info;
pub use jobs::{cmd_jobs, JobsArgs};
pub use run::{cmd_poll_once, cmd_run};
pub use validate::{cmd_validate, ValidateArgs};

use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// A token cancelled by the first Ctrl-C.
pub fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            trigger.cancel();
        }
    });
    cancel
}
