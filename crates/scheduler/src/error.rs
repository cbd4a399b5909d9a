use action_flow::FlowError;
use thiserror::Error;

use crate::model::JobId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("job {0} already exists")]
    Duplicate(JobId),
    #[error("job store I/O: {0}")]
    Io(String),
    #[error("job store data: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("no workflow mapped for domain '{0}'")]
    UnmappedDomain(String),
    #[error("invalid job url '{url}': {reason}")]
    InvalidJobUrl { url: String, reason: String },
    #[error("invalid route table: {0}")]
    InvalidRoutes(String),
    #[error(transparent)]
    Workflow(#[from] FlowError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("job task aborted: {0}")]
    TaskAborted(String),
}

impl SchedulerError {
    /// Failures decided before a browser was ever opened.
    pub fn is_routing(&self) -> bool {
        matches!(
            self,
            SchedulerError::UnmappedDomain(_) | SchedulerError::InvalidJobUrl { .. }
        )
    }
}
