//! Domain → workflow name table

use std::collections::BTreeMap;
use url::Url;

use crate::error::SchedulerError;

/// Host-to-workflow table, validated once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowRoutes {
    routes: BTreeMap<String, String>,
}

fn normalise_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

impl WorkflowRoutes {
    /// Builds the table, rejecting empty entries and hosts that collide once lower-cased.
    pub fn new<I, H, W>(entries: I) -> Result<Self, SchedulerError>
    where
        I: IntoIterator<Item = (H, W)>,
        H: AsRef<str>,
        W: AsRef<str>,
    {
        let mut routes = BTreeMap::new();
        for (host, workflow) in entries {
            let host = normalise_host(host.as_ref());
            let workflow = workflow.as_ref().trim();
            if host.is_empty() {
                return Err(SchedulerError::InvalidRoutes("empty host".into()));
            }
            if host.contains(['/', ':']) {
                return Err(SchedulerError::InvalidRoutes(format!(
                    "'{host}' is not a bare host name"
                )));
            }
            if workflow.is_empty() {
                return Err(SchedulerError::InvalidRoutes(format!(
                    "host '{host}' has no workflow"
                )));
            }
            if routes.insert(host.clone(), workflow.to_string()).is_some() {
                return Err(SchedulerError::InvalidRoutes(format!(
                    "host '{host}' is listed twice"
                )));
            }
        }
        Ok(Self { routes })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.routes
            .iter()
            .map(|(host, workflow)| (host.as_str(), workflow.as_str()))
    }

    /// Workflow for a host: exact match first, then without a leading `www.`.
    pub fn for_host(&self, host: &str) -> Option<&str> {
        let host = normalise_host(host);
        self.routes
            .get(&host)
            .or_else(|| {
                host.strip_prefix("www.")
                    .and_then(|bare| self.routes.get(bare))
            })
            .map(String::as_str)
    }

    /// Workflow for a job URL.
    pub fn resolve(&self, job_url: &str) -> Result<&str, SchedulerError> {
        let url = Url::parse(job_url).map_err(|err| SchedulerError::InvalidJobUrl {
            url: job_url.to_string(),
            reason: err.to_string(),
        })?;
        let host = url.host_str().ok_or_else(|| SchedulerError::InvalidJobUrl {
            url: job_url.to_string(),
            reason: "no host".into(),
        })?;
        self.for_host(host)
            .ok_or_else(|| SchedulerError::UnmappedDomain(normalise_host(host)))
    }
}

impl Default for WorkflowRoutes {
    fn default() -> Self {
        let routes = [
            ("www.pracuj.pl", "pracuj"),
            ("linkedin.com", "linkedin"),
            ("indeed.com", "indeed"),
        ]
        .into_iter()
        .map(|(host, workflow)| (host.to_string(), workflow.to_string()))
        .collect();
        Self { routes }
    }
}
