//! Language-model boundary
//!
//! The loop asks for exactly one tool call per iteration. Prompting, schema
//! validation and the provider wire format live behind [`ModelClient`].

use std::collections::VecDeque;

use action_locator::TreeSnapshot;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AgentError;
use crate::session::HistoryEntry;
use crate::steps::StepKind;
use crate::variables::Variables;

/// One structured tool call, already schema-validated by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    pub fn goto(url: &str) -> Self {
        Self::new(StepKind::Goto.name(), json!({ "url": url }))
    }

    pub fn act(method: &str, element_ref: &str, args: &[&str]) -> Self {
        Self::new(
            StepKind::Act.name(),
            json!({ "method": method, "elementRef": element_ref, "args": args }),
        )
    }

    pub fn assert(method: &str, element_ref: &str, value: Option<&str>) -> Self {
        let mut arguments = json!({ "method": method, "elementRef": element_ref });
        if let (Some(value), Some(map)) = (value, arguments.as_object_mut()) {
            map.insert("value".to_string(), Value::String(value.to_string()));
        }
        Self::new(StepKind::Assert.name(), arguments)
    }

    pub fn wait(duration_ms: u64) -> Self {
        Self::new(StepKind::Wait.name(), json!({ "durationMs": duration_ms }))
    }

    pub fn control(kind: StepKind, reason: &str) -> Self {
        Self::new(kind.name(), json!({ "reason": reason }))
    }

    /// Set a top-level argument, e.g. `isLastStep` or `storeAs`.
    pub fn with_arg(mut self, name: &str, value: impl Into<Value>) -> Self {
        if !self.arguments.is_object() {
            self.arguments = json!({});
        }
        if let Some(map) = self.arguments.as_object_mut() {
            map.insert(name.to_string(), value.into());
        }
        self
    }

    pub fn last_step(self) -> Self {
        self.with_arg("isLastStep", true)
    }

    pub fn kind(&self) -> Option<StepKind> {
        StepKind::parse(&self.name)
    }
}

/// Everything the model sees for one planning call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub objective: String,
    /// Trimmed to the configured history window.
    pub history: Vec<HistoryEntry>,
    pub tree_snapshot: TreeSnapshot,
    pub variables: Variables,
}

/// Language-model client.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Next step for the objective, given the run so far and the current page.
    async fn next_step(&self, request: &PlanRequest) -> Result<ToolCall, AgentError>;
}

/// Replays a fixed list of tool calls in order and records every request.
/// Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<ToolCall>>,
    requests: Mutex<Vec<PlanRequest>>,
}

impl ScriptedModel {
    pub fn new(script: impl IntoIterator<Item = ToolCall>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, call: ToolCall) {
        self.script.lock().push_back(call);
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }

    pub fn requests(&self) -> Vec<PlanRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn next_step(&self, request: &PlanRequest) -> Result<ToolCall, AgentError> {
        self.requests.lock().push(request.clone());
        self.script
            .lock()
            .pop_front()
            .ok_or_else(|| AgentError::model("script exhausted"))
    }
}
