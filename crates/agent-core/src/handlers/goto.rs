use async_trait::async_trait;
use tracing::{info, warn};

use super::{mismatch, string_arg, StepContext, StepHandler};
use crate::errors::AgentError;
use crate::model::ToolCall;
use crate::outcome::{ExecutionOutcome, HandlerOutcome};
use crate::steps::{PlannedStep, StepCommon, StepKind, StepPayload};

/// Navigates to a URL template. Variables are substituted only for the live
/// navigation; the stored step and its outcome keep the template.
#[derive(Debug, Default)]
pub struct GotoHandler;

#[async_trait]
impl StepHandler for GotoHandler {
    fn kind(&self) -> StepKind {
        StepKind::Goto
    }

    async fn parse(&self, call: &ToolCall, _ctx: &StepContext<'_>) -> Option<PlannedStep> {
        let Some(url) = string_arg(&call.arguments, "url") else {
            warn!("dropping goto without a url");
            return None;
        };
        Some(PlannedStep::new(
            StepCommon::from_arguments(&call.arguments),
            StepPayload::Goto { url },
        ))
    }

    async fn execute(
        &self,
        step: &PlannedStep,
        ctx: &StepContext<'_>,
    ) -> Result<HandlerOutcome, AgentError> {
        let StepPayload::Goto { url } = &step.payload else {
            return Err(mismatch(StepKind::Goto, step));
        };

        let live = ctx.variables.substitute(url);
        let method = StepKind::Goto.name();
        let outcome = match ctx
            .services
            .executor
            .navigate(&live, ctx.services.timings.settle_timeout())
            .await
        {
            Ok(()) => {
                info!(url = %url, request_id = %ctx.request_id, "navigated");
                ExecutionOutcome::succeeded(method, format!("Navigated to {}", url))
            }
            Err(err) => {
                warn!(url = %url, "navigation failed: {}", err);
                ExecutionOutcome::failed(method, format!("Navigation to {} failed: {}", url, err))
            }
        };
        Ok(outcome.with_args(vec![url.clone()]).into())
    }
}
