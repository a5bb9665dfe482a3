use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    ActHandler, AssertHandler, ControlHandler, GotoHandler, StepContext, StepHandler,
    VisualCheckHandler, WaitHandler,
};
use crate::errors::AgentError;
use crate::model::ToolCall;
use crate::outcome::HandlerOutcome;
use crate::steps::{PlannedStep, StepKind};

/// Kind → handler dispatch table.
pub struct StepHandlerRegistry {
    entries: HashMap<StepKind, Arc<dyn StepHandler>>,
}

impl Default for StepHandlerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StepHandlerRegistry {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// A handler for every step kind.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(GotoHandler);
        registry.register(ActHandler);
        registry.register(AssertHandler);
        registry.register(VisualCheckHandler);
        registry.register(WaitHandler);
        registry.register(ControlHandler::fail());
        registry.register(ControlHandler::go_back());
        registry.register(ControlHandler::skip_section());
        registry
    }

    /// Install `handler` for its kind, replacing any previous one.
    pub fn register<H: StepHandler + 'static>(&mut self, handler: H) {
        self.entries.insert(handler.kind(), Arc::new(handler));
    }

    pub fn get(&self, kind: StepKind) -> Option<Arc<dyn StepHandler>> {
        self.entries.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<StepKind> {
        StepKind::ALL
            .into_iter()
            .filter(|kind| self.entries.contains_key(kind))
            .collect()
    }

    /// Route `call` to the handler named by its tool name. Unknown tools and
    /// calls the handler rejects yield `None`.
    pub async fn parse(&self, call: &ToolCall, ctx: &StepContext<'_>) -> Option<PlannedStep> {
        let Some(kind) = call.kind() else {
            warn!(tool = %call.name, "dropping call to unknown tool");
            return None;
        };
        let Some(handler) = self.get(kind) else {
            warn!(kind = %kind, "dropping step without a registered handler");
            return None;
        };
        let step = handler.parse(call, ctx).await?;
        debug!(kind = %kind, "step parsed");
        Some(step)
    }

    pub async fn execute(
        &self,
        step: &PlannedStep,
        ctx: &StepContext<'_>,
    ) -> Result<HandlerOutcome, AgentError> {
        let kind = step.kind();
        let handler = self.get(kind).ok_or(AgentError::NoHandler(kind))?;
        handler.execute(step, ctx).await
    }
}
