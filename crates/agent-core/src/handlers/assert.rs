use async_trait::async_trait;
use tracing::info;

use super::{ground_target, mismatch, string_arg, StepContext, StepHandler};
use crate::errors::AgentError;
use crate::model::ToolCall;
use crate::outcome::{ExecutionOutcome, HandlerOutcome};
use crate::steps::{PlannedStep, StepCommon, StepKind, StepPayload};

/// Evaluates one check on a grounded element. A mismatch is a failed outcome,
/// never an error.
#[derive(Debug, Default)]
pub struct AssertHandler;

#[async_trait]
impl StepHandler for AssertHandler {
    fn kind(&self) -> StepKind {
        StepKind::Assert
    }

    async fn parse(&self, call: &ToolCall, ctx: &StepContext<'_>) -> Option<PlannedStep> {
        let target = ground_target(call, ctx).await?;
        let expected = string_arg(&call.arguments, "value")
            .or_else(|| string_arg(&call.arguments, "expected"));
        Some(PlannedStep::new(
            StepCommon::from_arguments(&call.arguments),
            StepPayload::Assert {
                method: target.method,
                element_ref: target.element_ref,
                locator: target.locator,
                expected,
            },
        ))
    }

    async fn execute(
        &self,
        step: &PlannedStep,
        ctx: &StepContext<'_>,
    ) -> Result<HandlerOutcome, AgentError> {
        let StepPayload::Assert {
            method,
            locator,
            expected,
            ..
        } = &step.payload
        else {
            return Err(mismatch(StepKind::Assert, step));
        };

        let live_expected = expected.as_deref().map(|value| ctx.variables.substitute(value));
        let passed = ctx
            .services
            .evaluator
            .evaluate_assertion(
                method,
                locator,
                live_expected.as_deref(),
                ctx.services.timings.assertion_timeout(),
            )
            .await;

        let subject = match expected {
            Some(value) => format!("{} {:?} on {}", method, value, locator.address),
            None => format!("{} on {}", method, locator.address),
        };
        info!(method = %method, locator = %locator, passed, "assertion evaluated");

        let outcome = if passed {
            ExecutionOutcome::succeeded(method.clone(), format!("Assertion {} passed", subject))
        } else {
            ExecutionOutcome::failed(method.clone(), format!("Assertion {} failed", subject))
        };
        Ok(outcome
            .with_locator(locator.clone())
            .with_args(expected.iter().cloned().collect())
            .into())
    }
}
