//! Workflow error types

use action_primitives::DriverError;
use thiserror::Error;

/// Workflow compilation and execution errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    /// Workflow document could not be compiled
    #[error("Malformed workflow: {0}")]
    MalformedWorkflow(String),

    /// Browser driver failure that no node recovered from
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Form or routing configuration is unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Workflow or form definition does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// An `ifelse` condition finished without binding `ConditionResult`
    #[error("Condition did not set ConditionResult")]
    ConditionNotSet,

    /// Local filesystem failure outside the driver
    #[error("I/O error: {0}")]
    Io(String),

    /// Execution stopped by a shutdown request
    #[error("Workflow execution cancelled")]
    Cancelled,
}

impl FlowError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FlowError::Driver(err) if err.is_timeout())
    }

    /// Errors caused by the workflow or its inputs rather than by the page.
    pub fn is_job_fatal(&self) -> bool {
        matches!(
            self,
            FlowError::MalformedWorkflow(_)
                | FlowError::Configuration(_)
                | FlowError::NotFound(_)
                | FlowError::ConditionNotSet
        )
    }
}

impl From<std::io::Error> for FlowError {
    fn from(err: std::io::Error) -> Self {
        FlowError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::MalformedWorkflow(err.to_string())
    }
}
