//! Application configuration
//!
//! A YAML document with one section per concern. Every section is optional and
//! falls back to the service defaults; a handful of `AUTOAPPLY_*` environment
//! variables override the file.

use autoapply_scheduler::{ApplicantProfile, SchedulerConfig, SchedulerError, WorkflowRoutes};
use cdp_adapter::CdpConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<SchedulerError> for ConfigError {
    fn from(err: SchedulerError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerSection {
    pub polling_interval_secs: u64,
    pub max_concurrent_instances: usize,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            polling_interval_secs: 60,
            max_concurrent_instances: 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsSection {
    pub workflows_dir: PathBuf,
    pub forms_dir: PathBuf,
    pub cookies_dir: PathBuf,
    pub jobs_file: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            workflows_dir: PathBuf::from("Workflows"),
            forms_dir: PathBuf::from("Forms"),
            cookies_dir: PathBuf::from("Cookies"),
            jobs_file: PathBuf::from("jobs.json"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrowserSection {
    pub headless: bool,
    /// Detected on `PATH` and in install locations when unset
    pub executable: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub use_saved_cookies: bool,
    pub default_timeout_ms: u64,
    pub no_sandbox: bool,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_agent: None,
            use_saved_cookies: true,
            default_timeout_ms: 30_000,
            no_sandbox: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerSection,
    pub paths: PathsSection,
    pub browser: BrowserSection,
    pub applicant: ApplicantProfile,
    /// Job host → workflow name
    pub routes: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSection::default(),
            paths: PathsSection::default(),
            browser: BrowserSection::default(),
            applicant: ApplicantProfile::default(),
            routes: WorkflowRoutes::default()
                .iter()
                .map(|(host, workflow)| (host.to_string(), workflow.to_string()))
                .collect(),
        }
    }
}

/// `{config_dir}/autoapply/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("autoapply").join("config.yaml"))
}

fn truthy(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read `path`, or the default location. A missing file yields the defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
            warn!("no configuration directory on this platform, using defaults");
            return Ok(Self::default());
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                let config = Self::from_yaml(&text, &path)?;
                info!("Loaded configuration from: {}", path.display());
                Ok(config)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file not found, using defaults: {}", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// Apply `AUTOAPPLY_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup; unparsable values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("AUTOAPPLY_HEADLESS") {
            match truthy(&raw) {
                Some(headless) => self.browser.headless = headless,
                None => warn!(value = %raw, "ignoring AUTOAPPLY_HEADLESS"),
            }
        }
        if let Some(raw) = lookup("AUTOAPPLY_CHROME") {
            if !raw.trim().is_empty() {
                self.browser.executable = Some(PathBuf::from(raw.trim()));
            }
        }
        if let Some(raw) = lookup("AUTOAPPLY_MAX_CONCURRENT") {
            match raw.trim().parse() {
                Ok(max) => self.scheduler.max_concurrent_instances = max,
                Err(_) => warn!(value = %raw, "ignoring AUTOAPPLY_MAX_CONCURRENT"),
            }
        }
        if let Some(raw) = lookup("AUTOAPPLY_POLL_SECS") {
            match raw.trim().parse() {
                Ok(secs) => self.scheduler.polling_interval_secs = secs,
                Err(_) => warn!(value = %raw, "ignoring AUTOAPPLY_POLL_SECS"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.max_concurrent_instances == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.max_concurrent_instances must be at least 1".into(),
            ));
        }
        if self.scheduler.polling_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.polling_interval_secs must be at least 1".into(),
            ));
        }
        self.workflow_routes()?;
        Ok(())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            polling_interval: Duration::from_secs(self.scheduler.polling_interval_secs),
            max_concurrent_instances: self.scheduler.max_concurrent_instances,
        }
    }

    pub fn workflow_routes(&self) -> Result<WorkflowRoutes, ConfigError> {
        Ok(WorkflowRoutes::new(&self.routes)?)
    }

    pub fn cdp_config(&self) -> CdpConfig {
        let mut cfg = CdpConfig::default();
        if let Some(executable) = &self.browser.executable {
            cfg.executable = executable.clone();
        }
        cfg.headless = self.browser.headless;
        cfg.user_agent = self.browser.user_agent.clone();
        cfg.default_timeout_ms = self.browser.default_timeout_ms;
        cfg.no_sandbox |= self.browser.no_sandbox;
        cfg
    }
}
