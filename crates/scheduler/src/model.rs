use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(JobId)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptStatus {
    Success,
    Failure,
}

impl AttemptStatus {
    pub fn from_outcome(success: bool) -> Self {
        if success {
            AttemptStatus::Success
        } else {
            AttemptStatus::Failure
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::Success => f.write_str("success"),
            AttemptStatus::Failure => f.write_str("failure"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationAttempt {
    pub timestamp: DateTime<Utc>,
    pub status: AttemptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// A job offer tracked by the scheduler.
///
/// Selected while `should_apply && !is_applied`; attempts are only ever appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_applied: bool,
    #[serde(default)]
    pub should_apply: bool,
    #[serde(default)]
    pub attempts: Vec<ApplicationAttempt>,
}

impl Job {
    /// A freshly ingested job, armed for one application attempt.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            url: url.into(),
            title: title.into(),
            employer: None,
            created_at: Utc::now(),
            is_applied: false,
            should_apply: true,
            attempts: Vec::new(),
        }
    }

    pub fn with_employer(mut self, employer: impl Into<String>) -> Self {
        self.employer = Some(employer.into());
        self
    }

    pub fn is_pending(&self) -> bool {
        self.should_apply && !self.is_applied
    }

    pub fn last_attempt(&self) -> Option<&ApplicationAttempt> {
        self.attempts.last()
    }

    /// Append `attempt` and disarm the job.
    ///
    /// `is_applied` only ever moves to `true`, so a flag set by someone else while
    /// the attempt was running survives a failure.
    pub fn record_attempt(&mut self, attempt: ApplicationAttempt) -> AttemptStatus {
        let status = attempt.status;
        self.attempts.push(attempt);
        self.should_apply = false;
        self.is_applied |= status == AttemptStatus::Success;
        status
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub polling_interval: Duration,
    /// Batch size of one poll; also the bound on concurrently running workflows.
    pub max_concurrent_instances: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(60),
            max_concurrent_instances: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_jobs_are_pending() {
        let job = Job::new("https://indeed.com/viewjob?jk=1", "Rust developer");
        assert!(job.is_pending());
        assert!(job.attempts.is_empty());
        assert_eq!(job.employer, None);
    }

    #[test]
    fn recording_a_failure_keeps_is_applied() {
        let mut job = Job::new("https://indeed.com/viewjob?jk=1", "Dev");
        job.is_applied = true;
        let status = job.record_attempt(ApplicationAttempt {
            timestamp: Utc::now(),
            status: AttemptStatus::Failure,
            error_message: Some("timeout".into()),
        });
        assert_eq!(status, AttemptStatus::Failure);
        assert!(job.is_applied);
        assert!(!job.should_apply);
        assert_eq!(job.attempts.len(), 1);
    }

    #[test]
    fn job_ids_parse_from_text() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
        assert!("nope".parse::<JobId>().is_err());
    }

    #[test]
    fn jobs_serialise_in_camel_case() {
        let job = Job::new("https://www.pracuj.pl/praca/1", "Tester").with_employer("ACME");
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["shouldApply"], true);
        assert_eq!(value["isApplied"], false);
        assert_eq!(value["employer"], "ACME");
        let back: Job = serde_json::from_value(value).unwrap();
        assert_eq!(back, job);
    }
}
