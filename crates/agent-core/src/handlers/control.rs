use async_trait::async_trait;
use tracing::info;

use super::{mismatch, string_arg, StepContext, StepHandler};
use crate::errors::AgentError;
use crate::model::ToolCall;
use crate::outcome::{ExecutionOutcome, HandlerOutcome};
use crate::steps::{PlannedStep, StepCommon, StepKind, StepPayload};

/// `fail`, `goBack` and `skipSection`. These steer the loop and never touch
/// the page; their outcome is always unsuccessful.
#[derive(Debug)]
pub struct ControlHandler {
    kind: StepKind,
}

impl ControlHandler {
    /// `None` for kinds that are not control signals.
    pub fn new(kind: StepKind) -> Option<Self> {
        kind.is_control().then_some(Self { kind })
    }

    pub fn fail() -> Self {
        Self {
            kind: StepKind::Fail,
        }
    }

    pub fn go_back() -> Self {
        Self {
            kind: StepKind::GoBack,
        }
    }

    pub fn skip_section() -> Self {
        Self {
            kind: StepKind::SkipSection,
        }
    }
}

#[async_trait]
impl StepHandler for ControlHandler {
    fn kind(&self) -> StepKind {
        self.kind
    }

    async fn parse(&self, call: &ToolCall, _ctx: &StepContext<'_>) -> Option<PlannedStep> {
        let common = StepCommon::from_arguments(&call.arguments);
        let reason = string_arg(&call.arguments, "reason")
            .or_else(|| Some(common.description.clone()).filter(|d| !d.is_empty()))
            .unwrap_or_else(|| "no reason given".to_string());
        let payload = match self.kind {
            StepKind::Fail => StepPayload::Fail { reason },
            StepKind::GoBack => StepPayload::GoBack { reason },
            _ => StepPayload::SkipSection { reason },
        };
        Some(PlannedStep::new(common, payload))
    }

    async fn execute(
        &self,
        step: &PlannedStep,
        ctx: &StepContext<'_>,
    ) -> Result<HandlerOutcome, AgentError> {
        if step.kind() != self.kind {
            return Err(mismatch(self.kind, step));
        }
        let reason = step.reason().unwrap_or_default();
        info!(kind = %self.kind, request_id = %ctx.request_id, reason, "control step");
        Ok(ExecutionOutcome::failed(self.kind.name(), reason).into())
    }
}
