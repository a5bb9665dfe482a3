//! Step handlers
//!
//! One handler per [`StepKind`]. `parse` grounds a raw tool call into a typed
//! [`PlannedStep`] or drops it; `execute` runs the step and always classifies
//! the result as an [`ExecutionOutcome`]. The only error a handler returns is a
//! contract violation such as being handed a step of another kind.

mod act;
mod assert;
mod control;
mod goto;
mod registry;
mod visual_check;
mod wait;

pub use act::ActHandler;
pub use assert::AssertHandler;
pub use control::ControlHandler;
pub use goto::GotoHandler;
pub use registry::StepHandlerRegistry;
pub use visual_check::VisualCheckHandler;
pub use wait::WaitHandler;

use std::sync::Arc;
use std::time::Duration;

use action_locator::{DefaultElementResolver, ElementResolver, TreeSnapshot};
use action_primitives::{ActionExecutor, AssertionEvaluator, PageDriver};
use async_trait::async_trait;
use result_cache::ResultCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use testpilot_core_types::{ElementRef, LocatorDescriptor, RequestId};
use tracing::warn;

use crate::errors::AgentError;
use crate::model::ToolCall;
use crate::outcome::HandlerOutcome;
use crate::steps::{PlannedStep, StepKind};
use crate::variables::Variables;
use crate::visual::VisualVerifier;

/// Time budgets applied while executing steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTimings {
    /// Settle wait after navigation and successful actions.
    /// Default: 5000
    pub settle_timeout_ms: u64,

    /// How long an assertion is polled before it counts as failed.
    /// Default: 5000
    pub assertion_timeout_ms: u64,

    /// `wait` duration when the step names none.
    /// Default: 5000
    pub default_wait_ms: u64,

    /// Upper bound on any single `wait`.
    /// Default: 30000
    pub max_wait_ms: u64,
}

impl Default for StepTimings {
    fn default() -> Self {
        Self {
            settle_timeout_ms: 5_000,
            assertion_timeout_ms: 5_000,
            default_wait_ms: 5_000,
            max_wait_ms: 30_000,
        }
    }
}

impl StepTimings {
    /// Short budgets for tests.
    pub fn minimal() -> Self {
        Self {
            settle_timeout_ms: 100,
            assertion_timeout_ms: 300,
            default_wait_ms: 10,
            max_wait_ms: 100,
        }
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn assertion_timeout(&self) -> Duration {
        Duration::from_millis(self.assertion_timeout_ms)
    }
}

/// Long-lived collaborators shared by every handler in a session.
pub struct StepServices {
    pub executor: Arc<ActionExecutor>,
    pub evaluator: Arc<AssertionEvaluator>,
    pub resolver: Arc<dyn ElementResolver>,
    pub cache: Option<Arc<ResultCache>>,
    pub visual: Option<Arc<dyn VisualVerifier>>,
    pub timings: StepTimings,
}

impl StepServices {
    /// Default executor, evaluator and resolver over one page.
    pub fn new(page: Arc<dyn PageDriver>) -> Self {
        Self {
            executor: Arc::new(ActionExecutor::new(page.clone())),
            evaluator: Arc::new(AssertionEvaluator::new(page.clone())),
            resolver: Arc::new(DefaultElementResolver::new(page)),
            cache: None,
            visual: None,
            timings: StepTimings::default(),
        }
    }

    /// Share `cache` for groundings, visual verdicts and model steps. The
    /// default resolver is rebuilt to memoize through it; call
    /// [`Self::with_resolver`] afterwards to override.
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        let page = self.executor.driver().clone();
        self.resolver = Arc::new(DefaultElementResolver::new(page).with_cache(cache.clone()));
        self.cache = Some(cache);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ElementResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_executor(mut self, executor: ActionExecutor) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    pub fn with_evaluator(mut self, evaluator: AssertionEvaluator) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    pub fn with_visual_verifier(mut self, verifier: Arc<dyn VisualVerifier>) -> Self {
        self.visual = Some(verifier);
        self
    }

    pub fn with_timings(mut self, timings: StepTimings) -> Self {
        self.timings = timings;
        self
    }
}

/// Per-iteration view handed to `parse` and `execute`.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub services: &'a StepServices,
    pub snapshot: &'a TreeSnapshot,
    pub variables: &'a Variables,
    pub request_id: &'a RequestId,
}

/// Handler for one step kind.
#[async_trait]
pub trait StepHandler: Send + Sync {
    fn kind(&self) -> StepKind;

    /// Ground `call` into a typed step, or `None` to drop it.
    async fn parse(&self, call: &ToolCall, ctx: &StepContext<'_>) -> Option<PlannedStep>;

    async fn execute(
        &self,
        step: &PlannedStep,
        ctx: &StepContext<'_>,
    ) -> Result<HandlerOutcome, AgentError>;
}

pub(crate) fn mismatch(expected: StepKind, step: &PlannedStep) -> AgentError {
    AgentError::StepKindMismatch {
        expected,
        actual: step.kind(),
    }
}

/// Scalar argument as text; numbers and booleans are stringified.
pub(crate) fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn string_arg(arguments: &Value, name: &str) -> Option<String> {
    arguments
        .get(name)
        .and_then(scalar)
        .filter(|value| !value.trim().is_empty())
}

/// A list argument; a lone scalar is treated as a one-element list.
pub(crate) fn list_arg(arguments: &Value, name: &str) -> Vec<String> {
    match arguments.get(name) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar).collect(),
        Some(other) => scalar(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Element target of an `act` or `assert` call.
pub(crate) struct GroundedTarget {
    pub method: String,
    pub element_ref: ElementRef,
    pub locator: LocatorDescriptor,
}

/// Read `method` and `elementRef` from `call` and ground the reference
/// against the current snapshot. `None` means the step must be dropped.
pub(crate) async fn ground_target(call: &ToolCall, ctx: &StepContext<'_>) -> Option<GroundedTarget> {
    let Some(method) = string_arg(&call.arguments, "method") else {
        warn!(tool = %call.name, "dropping step without a method");
        return None;
    };
    let Some(raw_ref) = string_arg(&call.arguments, "elementRef") else {
        warn!(tool = %call.name, method = %method, "dropping step without an element reference");
        return None;
    };
    let element_ref = match raw_ref.parse::<ElementRef>() {
        Ok(element_ref) => element_ref,
        Err(err) => {
            warn!(tool = %call.name, method = %method, "dropping step: {}", err);
            return None;
        }
    };

    match ctx
        .services
        .resolver
        .ground(&element_ref, ctx.snapshot, ctx.request_id)
        .await
    {
        Ok(grounding) => Some(GroundedTarget {
            method,
            element_ref,
            locator: grounding.locator,
        }),
        Err(err) => {
            warn!(
                tool = %call.name,
                method = %method,
                element = %element_ref,
                request_id = %ctx.request_id,
                "dropping ungrounded step: {}",
                err
            );
            None
        }
    }
}
