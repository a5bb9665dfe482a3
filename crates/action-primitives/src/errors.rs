//! Error types for action primitives

use thiserror::Error;

/// Failures reported by a [`crate::PageDriver`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// No element matched the locator
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// More than one element matched where exactly one was required
    #[error("Locator is ambiguous: {0}")]
    Ambiguous(String),

    /// Element was removed from the document mid-operation
    #[error("Element detached: {0}")]
    Detached(String),

    /// Element exists but cannot take the requested interaction
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// Navigation failed or was aborted
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Page never reached a settled state
    #[error("Page did not settle: {0}")]
    SettleTimeout(String),

    /// Transport or protocol failure talking to the browser
    #[error("Driver I/O error: {0}")]
    Io(String),
}

/// Errors raised by [`crate::ActionExecutor`].
///
/// `UnsupportedMethod` is the only fault the executor names itself; the
/// other variants carry driver and timeout failures back to the caller for
/// classification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Verb is not in the action table
    #[error("Method not supported: {0}")]
    UnsupportedMethod(String),

    /// Verb needs more arguments than were supplied
    #[error("Method {method} requires argument #{index}")]
    MissingArgument { method: String, index: usize },

    /// Primitive operation exceeded its bound
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// Driver rejected the operation
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::Timeout { .. }
                | ActionError::Driver(DriverError::Detached(_))
                | ActionError::Driver(DriverError::NotInteractable(_))
                | ActionError::Driver(DriverError::SettleTimeout(_))
        )
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::UnsupportedMethod(_) | ActionError::MissingArgument { .. } => 2,
            ActionError::Driver(DriverError::Io(_)) => 3,
            ActionError::Driver(DriverError::Navigation(_)) => 2,
            ActionError::Timeout { .. }
            | ActionError::Driver(DriverError::ElementNotFound(_))
            | ActionError::Driver(DriverError::Ambiguous(_)) => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_retryable_unsupported_is_not() {
        let timeout = ActionError::Timeout {
            operation: "click".to_string(),
            after_ms: 10_000,
        };
        assert!(timeout.is_retryable());
        assert!(!ActionError::UnsupportedMethod("teleport".to_string()).is_retryable());
    }

    #[test]
    fn driver_errors_convert_transparently() {
        let err: ActionError = DriverError::ElementNotFound("#cart".to_string()).into();
        assert_eq!(err.to_string(), "Element not found: #cart");
        assert_eq!(err.severity(), 1);
    }
}
