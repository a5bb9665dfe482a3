use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{ground_target, list_arg, mismatch, string_arg, StepContext, StepHandler};
use crate::errors::AgentError;
use crate::model::ToolCall;
use crate::outcome::{ExecutionOutcome, HandlerOutcome};
use crate::steps::{PlannedStep, StepCommon, StepKind, StepPayload};
use crate::variables::Variables;

/// Performs one verb on a grounded element.
///
/// The verb itself is not validated while parsing; an unknown verb reaches the
/// executor and comes back as a failed outcome.
#[derive(Debug, Default)]
pub struct ActHandler;

#[async_trait]
impl StepHandler for ActHandler {
    fn kind(&self) -> StepKind {
        StepKind::Act
    }

    async fn parse(&self, call: &ToolCall, ctx: &StepContext<'_>) -> Option<PlannedStep> {
        let target = ground_target(call, ctx).await?;
        Some(PlannedStep::new(
            StepCommon::from_arguments(&call.arguments),
            StepPayload::Act {
                method: target.method,
                element_ref: target.element_ref,
                locator: target.locator,
                args: list_arg(&call.arguments, "args"),
                store_as: string_arg(&call.arguments, "storeAs"),
            },
        ))
    }

    async fn execute(
        &self,
        step: &PlannedStep,
        ctx: &StepContext<'_>,
    ) -> Result<HandlerOutcome, AgentError> {
        let StepPayload::Act {
            method,
            locator,
            args,
            store_as,
            ..
        } = &step.payload
        else {
            return Err(mismatch(StepKind::Act, step));
        };

        let live_args = ctx.variables.substitute_all(args);
        let executor = &ctx.services.executor;
        let result = executor
            .perform_action(method, locator, &live_args, ctx.services.timings.settle_timeout())
            .await;

        if let Err(err) = result {
            warn!(
                method = %method,
                locator = %locator,
                request_id = %ctx.request_id,
                "action failed: {}",
                err
            );
            let outcome = ExecutionOutcome::failed(method.clone(), err.to_string())
                .with_locator(locator.clone())
                .with_args(args.clone());
            return Ok(outcome.into());
        }

        let mut new_variables = Variables::new();
        if let Some(name) = store_as {
            match executor.read_text(locator).await {
                Ok(text) => {
                    let text = text.unwrap_or_default();
                    debug!(variable = %name, "stored element text");
                    new_variables.insert(name.clone(), text.trim());
                }
                Err(err) => warn!(variable = %name, "could not read element text: {}", err),
            }
        }

        info!(method = %method, locator = %locator, "action succeeded");
        let outcome = ExecutionOutcome::succeeded(
            method.clone(),
            format!("{} on {} succeeded", method, locator.address),
        )
        .with_locator(locator.clone())
        .with_args(args.clone());
        Ok(HandlerOutcome::new(outcome).with_variables(new_variables))
    }
}
