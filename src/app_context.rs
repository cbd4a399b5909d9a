//! Service wiring shared by the CLI commands

use action_flow::{FileFormRepository, FileWorkflowRepository, SessionStateStore, WorkflowRunner};
use action_primitives::SessionProvider;
use autoapply_scheduler::{AutoApplyScheduler, JobStore, WorkflowRoutes};
use cdp_adapter::ChromiumSessionProvider;
use std::sync::Arc;
use tracing::info;

use crate::config::{AppConfig, ConfigError};
use crate::storage::JsonFileJobStore;

/// Everything a command needs, built once from the effective configuration.
pub struct AppContext {
    config: AppConfig,
    routes: WorkflowRoutes,
    workflows: Arc<FileWorkflowRepository>,
    jobs: Arc<JsonFileJobStore>,
    runner: Arc<WorkflowRunner>,
}

impl AppContext {
    /// Wire the services against real Chromium sessions.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        let sessions = Arc::new(ChromiumSessionProvider::new(config.cdp_config()));
        Self::with_sessions(config, sessions)
    }

    pub fn with_sessions(
        config: AppConfig,
        sessions: Arc<dyn SessionProvider>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let routes = config.workflow_routes()?;
        let workflows = Arc::new(FileWorkflowRepository::new(&config.paths.workflows_dir));
        let forms = Arc::new(FileFormRepository::new(&config.paths.forms_dir));
        let jobs = Arc::new(JsonFileJobStore::new(&config.paths.jobs_file));

        let mut runner = WorkflowRunner::new(sessions, forms);
        if config.browser.use_saved_cookies {
            runner = runner.with_cookie_store(Arc::new(SessionStateStore::new(
                &config.paths.cookies_dir,
            )));
        }
        info!(
            workflows = %config.paths.workflows_dir.display(),
            forms = %config.paths.forms_dir.display(),
            jobs = %config.paths.jobs_file.display(),
            routes = routes.len(),
            cookies = runner.persists_cookies(),
            "services ready"
        );

        Ok(Self {
            config,
            routes,
            workflows,
            jobs,
            runner: Arc::new(runner),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn routes(&self) -> &WorkflowRoutes {
        &self.routes
    }

    pub fn workflows(&self) -> Arc<FileWorkflowRepository> {
        Arc::clone(&self.workflows)
    }

    pub fn jobs(&self) -> Arc<JsonFileJobStore> {
        Arc::clone(&self.jobs)
    }

    pub fn runner(&self) -> Arc<WorkflowRunner> {
        Arc::clone(&self.runner)
    }

    pub fn scheduler(&self) -> AutoApplyScheduler {
        let jobs: Arc<dyn JobStore> = self.jobs.clone();
        AutoApplyScheduler::new(
            self.config.scheduler_config(),
            jobs,
            self.workflows.clone(),
            self.runner(),
            self.routes.clone(),
            self.config.applicant.clone(),
        )
    }
}
