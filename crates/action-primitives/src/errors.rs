//! Error types for driver operations

use thiserror::Error;

/// Failures surfaced by an automation driver
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Navigation could not be completed
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// A wait or interaction exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// No element matched the selector
    #[error("Selector not found: {0}")]
    SelectorNotFound(String),

    /// The element exists but the interaction failed
    #[error("Interaction failed: {0}")]
    Interaction(String),

    /// Browser session could not be opened, used or closed
    #[error("Session error: {0}")]
    Session(String),

    /// Local filesystem failure (screenshots, uploads)
    #[error("I/O error: {0}")]
    Io(String),

    /// DevTools protocol or transport failure
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout(_))
    }

    /// Errors that mean "the element is not there" rather than "the browser broke".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DriverError::SelectorNotFound(_) | DriverError::Timeout(_)
        )
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_not_found_errors() {
        assert!(DriverError::SelectorNotFound("#x".into()).is_not_found());
        assert!(DriverError::Timeout("wait".into()).is_not_found());
        assert!(!DriverError::Protocol("closed".into()).is_not_found());
        assert!(DriverError::Timeout("wait".into()).is_timeout());
    }

    #[test]
    fn io_errors_convert() {
        let err: DriverError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, DriverError::Io(msg) if msg.contains("gone")));
    }
}
