//! Visual-verifier boundary for `aiVisualCheck` steps

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualVerdict {
    pub passed: bool,
    pub explanation: String,
}

impl VisualVerdict {
    pub fn pass(explanation: impl Into<String>) -> Self {
        Self {
            passed: true,
            explanation: explanation.into(),
        }
    }

    pub fn fail(explanation: impl Into<String>) -> Self {
        Self {
            passed: false,
            explanation: explanation.into(),
        }
    }
}

/// Judges a screenshot against a natural-language prompt.
#[async_trait]
pub trait VisualVerifier: Send + Sync {
    async fn verify(&self, screenshot: &[u8], prompt: &str) -> Result<VisualVerdict, AgentError>;
}
