//! Chromium DevTools driver
//!
//! Implements the `action-primitives` session capability on top of `chromiumoxide`.
//! Every session launches its own Chromium process with a throwaway profile and a
//! single page; nothing is shared between sessions.

mod cookies;
mod detect;
mod launch;
mod scripts;
mod session;

pub use detect::detect_chrome_executable;
pub use launch::ChromiumSessionProvider;
pub use session::{ChromiumDriver, ChromiumSession};

pub mod config {
    use crate::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::{env, path::PathBuf};

    /// Launch and timing options for Chromium sessions.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CdpConfig {
        /// Browser binary; empty means "let chromiumoxide find one"
        pub executable: PathBuf,
        pub headless: bool,
        pub user_agent: Option<String>,
        /// Default deadline for clicks, selector waits and navigation
        pub default_timeout_ms: u64,
        pub launch_timeout_ms: u64,
        pub no_sandbox: bool,
        /// Parent directory for per-session profiles
        pub profile_root: PathBuf,
        /// Quiet window used by load-idle waits
        pub idle_window_ms: u64,
        #[serde(default)]
        pub extra_args: Vec<String>,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: detect_chrome_executable().unwrap_or_default(),
                headless: true,
                user_agent: None,
                default_timeout_ms: 30_000,
                launch_timeout_ms: 20_000,
                no_sandbox: resolve_no_sandbox(),
                profile_root: env::temp_dir().join("autoapply-profiles"),
                idle_window_ms: 500,
                extra_args: Vec::new(),
            }
        }
    }

    fn resolve_no_sandbox() -> bool {
        env::var("AUTOAPPLY_DISABLE_SANDBOX")
            .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }
}

pub use config::CdpConfig;
