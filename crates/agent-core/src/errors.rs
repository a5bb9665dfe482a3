use thiserror::Error;

use crate::steps::StepKind;

/// Errors emitted by the agent-core crate.
///
/// Expected step failures never surface here; they become failed
/// [`crate::ExecutionOutcome`]s. These variants are contract violations and
/// collaborator faults that end a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// A handler was asked to execute a step of another kind.
    #[error("handler for '{expected}' received a '{actual}' step")]
    StepKindMismatch { expected: StepKind, actual: StepKind },

    /// No handler is registered for the step kind.
    #[error("no handler registered for '{0}'")]
    NoHandler(StepKind),

    /// The language-model client failed to produce a tool call.
    #[error("model client failed: {0}")]
    Model(String),

    /// The tree-extraction function failed to produce a snapshot.
    #[error("snapshot extraction failed: {0}")]
    Snapshot(String),

    /// The external visual verifier failed.
    #[error("visual verification failed: {0}")]
    Visual(String),
}

impl AgentError {
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot(message.into())
    }

    pub fn visual(message: impl Into<String>) -> Self {
        Self::Visual(message.into())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::Model(_) | AgentError::Visual(_))
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            AgentError::StepKindMismatch { .. } | AgentError::NoHandler(_) => 3,
            AgentError::Model(_) | AgentError::Snapshot(_) => 2,
            AgentError::Visual(_) => 1,
        }
    }
}
