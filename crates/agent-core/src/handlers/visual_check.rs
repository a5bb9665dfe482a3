use async_trait::async_trait;
use result_cache::{content_hash, hash_bytes};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{mismatch, string_arg, StepContext, StepHandler};
use crate::errors::AgentError;
use crate::model::ToolCall;
use crate::outcome::{ExecutionOutcome, HandlerOutcome};
use crate::steps::{PlannedStep, StepCommon, StepKind, StepPayload};
use crate::visual::VisualVerdict;

/// Screenshot plus prompt, judged by the external visual verifier. Verdicts
/// are memoized per screenshot content and prompt.
#[derive(Debug, Default)]
pub struct VisualCheckHandler;

#[async_trait]
impl StepHandler for VisualCheckHandler {
    fn kind(&self) -> StepKind {
        StepKind::AiVisualCheck
    }

    async fn parse(&self, call: &ToolCall, _ctx: &StepContext<'_>) -> Option<PlannedStep> {
        let Some(prompt) = string_arg(&call.arguments, "prompt")
            .or_else(|| string_arg(&call.arguments, "description"))
        else {
            warn!("dropping aiVisualCheck without a prompt");
            return None;
        };
        Some(PlannedStep::new(
            StepCommon::from_arguments(&call.arguments),
            StepPayload::AiVisualCheck { prompt },
        ))
    }

    async fn execute(
        &self,
        step: &PlannedStep,
        ctx: &StepContext<'_>,
    ) -> Result<HandlerOutcome, AgentError> {
        let StepPayload::AiVisualCheck { prompt } = &step.payload else {
            return Err(mismatch(StepKind::AiVisualCheck, step));
        };
        let method = StepKind::AiVisualCheck.name();
        let failed = |message: String| -> Result<HandlerOutcome, AgentError> {
            Ok(ExecutionOutcome::failed(method, message)
                .with_args(vec![prompt.clone()])
                .into())
        };

        let Some(verifier) = &ctx.services.visual else {
            return failed("No visual verifier configured".to_string());
        };
        let live_prompt = ctx.variables.substitute(prompt);
        let screenshot = match ctx.services.executor.screenshot().await {
            Ok(bytes) => bytes,
            Err(err) => return failed(format!("Screenshot failed: {}", err)),
        };

        let key = content_hash(&json!({
            "kind": "visual",
            "screenshot": hash_bytes(&screenshot),
            "prompt": live_prompt,
        }))
        .ok();

        let cached = match (&ctx.services.cache, &key) {
            (Some(cache), Some(key)) => cache.get_json::<VisualVerdict>(key, ctx.request_id).await,
            _ => None,
        };

        let verdict = match cached {
            Some(verdict) => {
                debug!("visual verdict served from cache");
                verdict
            }
            None => match verifier.verify(&screenshot, &live_prompt).await {
                Ok(verdict) => {
                    if let (Some(cache), Some(key)) = (&ctx.services.cache, &key) {
                        cache.set_json(key, &verdict, ctx.request_id).await;
                    }
                    verdict
                }
                Err(err) => {
                    warn!("visual verifier failed: {}", err);
                    return failed(err.to_string());
                }
            },
        };

        info!(passed = verdict.passed, "visual check evaluated");
        let outcome = if verdict.passed {
            ExecutionOutcome::succeeded(method, verdict.explanation)
        } else {
            ExecutionOutcome::failed(method, verdict.explanation)
        };
        Ok(outcome.with_args(vec![prompt.clone()]).into())
    }
}
