//! Error types for element grounding

use action_primitives::DriverError;
use testpilot_core_types::ElementRef;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// Reference is absent from the snapshot that is supposed to contain it
    #[error("Element {0} is not in the current snapshot")]
    NotFound(ElementRef),

    /// Reference text does not have the `frame-node` shape
    #[error("Invalid element reference: {0}")]
    InvalidReference(String),

    /// Page query failed while characterizing the element
    #[error("Driver error during grounding: {0}")]
    Driver(#[from] DriverError),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LocatorError::Driver(DriverError::Io(_)) | LocatorError::Driver(DriverError::Detached(_))
        )
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Driver(DriverError::Io(_)) => 3,
            LocatorError::Driver(_) => 2,
            LocatorError::NotFound(_) | LocatorError::InvalidReference(_) => 1,
        }
    }
}
