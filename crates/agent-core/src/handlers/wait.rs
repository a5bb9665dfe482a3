use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{mismatch, StepContext, StepHandler};
use crate::errors::AgentError;
use crate::model::ToolCall;
use crate::outcome::{ExecutionOutcome, HandlerOutcome};
use crate::steps::{PlannedStep, StepCommon, StepKind, StepPayload};

/// Bounded suspension. Always succeeds.
#[derive(Debug, Default)]
pub struct WaitHandler;

#[async_trait]
impl StepHandler for WaitHandler {
    fn kind(&self) -> StepKind {
        StepKind::Wait
    }

    async fn parse(&self, call: &ToolCall, ctx: &StepContext<'_>) -> Option<PlannedStep> {
        let timings = &ctx.services.timings;
        let requested = ["durationMs", "duration", "ms"]
            .iter()
            .find_map(|name| call.arguments.get(*name).and_then(as_millis))
            .unwrap_or(timings.default_wait_ms);
        Some(PlannedStep::new(
            StepCommon::from_arguments(&call.arguments),
            StepPayload::Wait {
                duration_ms: requested.min(timings.max_wait_ms),
            },
        ))
    }

    async fn execute(
        &self,
        step: &PlannedStep,
        _ctx: &StepContext<'_>,
    ) -> Result<HandlerOutcome, AgentError> {
        let StepPayload::Wait { duration_ms } = &step.payload else {
            return Err(mismatch(StepKind::Wait, step));
        };
        debug!(duration_ms, "waiting");
        tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
        Ok(ExecutionOutcome::succeeded(StepKind::Wait.name(), format!("Waited {}ms", duration_ms))
            .with_args(vec![duration_ms.to_string()])
            .into())
    }
}

fn as_millis(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
