//! Per-run variable store

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Bound by `exit`; its presence means the run terminated explicitly.
pub const WORKFLOW_FINISHED_SUCCESSFULLY: &str = "WorkflowFinishedSuccessfully";
/// Optional message written by `exit`.
pub const WORKFLOW_FINISHED_MESSAGE: &str = "WorkflowFinishedMessage";
/// Written by `exists`, read by `ifelse`.
pub const CONDITION_RESULT: &str = "ConditionResult";
pub const JOB_URL: &str = "JobUrl";
pub const JOB_ID: &str = "JobId";
pub const JOB_TITLE: &str = "JobTitle";
pub const COMPANY_NAME: &str = "CompanyName";
pub const RESUME_PATH: &str = "ResumePath";
pub const COVER_LETTER_PATH: &str = "CoverLetterPath";
pub const USER_FIRST_NAME: &str = "UserFirstName";
pub const USER_SECOND_NAME: &str = "UserSecondName";
pub const USER_PHONE: &str = "UserPhone";
pub const USER_EMAIL: &str = "UserEmail";

/// A context value; lookups never coerce between kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Str(String),
    Bool(bool),
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Str(value) => f.write_str(value),
            ContextValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Str(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Str(value.to_string())
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

/// Variables of one workflow run. Owned by that run; never shared between jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    variables: HashMap<String, ContextValue>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.variables.get(name)
    }

    /// String value of `name`; `None` when absent or bound to a bool.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.variables.get(name) {
            Some(ContextValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// Bool value of `name`; `None` when absent or bound to a string.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.variables.get(name) {
            Some(ContextValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ContextValue>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Remove `name`, returning whether it was bound.
    pub fn remove(&mut self, name: &str) -> bool {
        self.variables.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variables sorted by name.
    pub fn entries(&self) -> Vec<(&str, &ContextValue)> {
        let mut entries: Vec<_> = self
            .variables
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Terminal outcome as reconciled by the scheduler: `(success, message)`.
    pub fn outcome(&self) -> (bool, String) {
        (
            self.get_bool(WORKFLOW_FINISHED_SUCCESSFULLY).unwrap_or(false),
            self.get_str(WORKFLOW_FINISHED_MESSAGE)
                .unwrap_or_default()
                .to_string(),
        )
    }
}
