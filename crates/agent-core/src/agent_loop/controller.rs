//! Planning loop controller - one model step at a time.
//!
//! Each iteration asks the model for the next step against a fresh tree
//! snapshot, grounds it, executes it and records the outcome. The loop's only
//! memory is the session history plus a backtrack counter.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use result_cache::content_hash;
use serde::{Deserialize, Serialize};
use testpilot_core_types::RequestId;
use tracing::{debug, info, warn};

use super::config::PlanningConfig;
use crate::errors::AgentError;
use crate::handlers::{StepContext, StepHandlerRegistry, StepServices};
use crate::model::{ModelClient, PlanRequest, ToolCall};
use crate::session::{HistoryEntry, SessionHistory};
use crate::snapshot::SnapshotProvider;
use crate::steps::StepKind;
use crate::variables::Variables;

/// Result of a planning run. Always carries the complete history, whatever
/// the verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningResult {
    /// Final status of the loop.
    pub status: LoopStatus,
    /// Completion or error message.
    pub message: String,
    pub history: SessionHistory,
    /// Steps executed in this run, seeded entries excluded.
    pub steps_taken: u32,
    pub backtracks: u32,
    /// Variables known at the end of the run.
    pub variables: Variables,
    pub request_id: RequestId,
    pub started_at: DateTime<Utc>,
    /// Total execution time in milliseconds.
    pub total_time_ms: u64,
}

impl PlanningResult {
    /// Check if the loop completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self.status, LoopStatus::Succeeded)
    }
}

/// Terminal status of the planning loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    /// A step marked `isLastStep` succeeded.
    Succeeded,
    /// The model reported failure, or a collaborator faulted.
    Failed,
    /// Reached the iteration limit without completion.
    MaxDepthReached,
    /// Too many `goBack`/`skipSection` steps.
    BacktracksExhausted,
    /// The wall-clock budget ran out between iterations.
    TimedOut,
    /// Too many consecutive steps could not be grounded.
    Ungrounded,
}

impl LoopStatus {
    pub fn name(&self) -> &'static str {
        match self {
            LoopStatus::Succeeded => "succeeded",
            LoopStatus::Failed => "failed",
            LoopStatus::MaxDepthReached => "max_depth_reached",
            LoopStatus::BacktracksExhausted => "backtracks_exhausted",
            LoopStatus::TimedOut => "timed_out",
            LoopStatus::Ungrounded => "ungrounded",
        }
    }
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub objective: String,
    pub variables: Variables,
    /// History of an earlier partial run to resume from.
    pub seed: SessionHistory,
    pub request_id: RequestId,
}

impl RunRequest {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            variables: Variables::new(),
            seed: SessionHistory::new(),
            request_id: RequestId::new(),
        }
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn seed(mut self, history: SessionHistory) -> Self {
        self.seed = history;
        self
    }

    pub fn request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }
}

#[derive(Debug, Default)]
struct LoopState {
    history: SessionHistory,
    variables: Variables,
    depth: u32,
    steps_taken: u32,
    backtracks: u32,
    ungrounded_streak: u32,
}

#[derive(Serialize)]
struct PlanKey<'a> {
    kind: &'static str,
    request: &'a PlanRequest,
}

/// Tool call for one iteration, with where it came from.
struct PlannedCall {
    call: ToolCall,
    key: Option<String>,
    cached: bool,
}

/// Orchestrates request → ground → execute → record until a terminal state.
pub struct PlanningLoop {
    config: PlanningConfig,
    model: Arc<dyn ModelClient>,
    snapshots: Arc<dyn SnapshotProvider>,
    registry: StepHandlerRegistry,
    services: StepServices,
}

impl PlanningLoop {
    pub fn new(
        config: PlanningConfig,
        model: Arc<dyn ModelClient>,
        snapshots: Arc<dyn SnapshotProvider>,
        services: StepServices,
    ) -> Self {
        Self {
            config,
            model,
            snapshots,
            registry: StepHandlerRegistry::builtin(),
            services,
        }
    }

    pub fn with_registry(mut self, registry: StepHandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    pub fn services(&self) -> &StepServices {
        &self.services
    }

    /// Drive one objective to a terminal state.
    ///
    /// Never fails: collaborator faults become a `Failed` result. When the run
    /// does not succeed, every cache entry written under its request id is
    /// rolled back.
    pub async fn run(&self, request: RunRequest) -> PlanningResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let RunRequest {
            objective,
            variables,
            seed,
            request_id,
        } = request;

        let mut state = LoopState {
            variables,
            depth: u32::try_from(seed.len()).unwrap_or(u32::MAX),
            ..LoopState::default()
        };
        state.variables.merge(&seed.discovered_variables());
        state.history = seed;

        info!(
            request_id = %request_id,
            objective = %objective,
            seeded = state.history.len(),
            "planning run started"
        );

        let (status, message) = self.drive(&objective, &request_id, start, &mut state).await;

        if status != LoopStatus::Succeeded {
            self.rollback(&request_id).await;
        }

        let total_time_ms = start.elapsed().as_millis() as u64;
        info!(
            request_id = %request_id,
            status = %status,
            steps = state.steps_taken,
            backtracks = state.backtracks,
            total_time_ms,
            "planning run finished: {}",
            message
        );

        PlanningResult {
            status,
            message,
            history: state.history,
            steps_taken: state.steps_taken,
            backtracks: state.backtracks,
            variables: state.variables,
            request_id,
            started_at,
            total_time_ms,
        }
    }

    async fn drive(
        &self,
        objective: &str,
        request_id: &RequestId,
        start: Instant,
        state: &mut LoopState,
    ) -> (LoopStatus, String) {
        loop {
            if let Some(limit) = self.config.timeout() {
                if start.elapsed() >= limit {
                    return (
                        LoopStatus::TimedOut,
                        format!("Wall-clock timeout of {}ms exceeded", limit.as_millis()),
                    );
                }
            }
            if state.depth >= self.config.max_depth {
                return (
                    LoopStatus::MaxDepthReached,
                    format!("Reached maximum depth: {}", self.config.max_depth),
                );
            }
            state.depth += 1;

            let snapshot = match self.snapshots.snapshot().await {
                Ok(snapshot) => snapshot,
                Err(err) => return (LoopStatus::Failed, err.to_string()),
            };
            let plan_request = PlanRequest {
                objective: objective.to_string(),
                history: state.history.recent(self.config.history_window).to_vec(),
                tree_snapshot: snapshot,
                variables: state.variables.clone(),
            };

            let planned = match self.request_step(&plan_request, request_id).await {
                Ok(planned) => planned,
                Err(err) => return (LoopStatus::Failed, err.to_string()),
            };

            let ctx = StepContext {
                services: &self.services,
                snapshot: &plan_request.tree_snapshot,
                variables: &state.variables,
                request_id,
            };

            let Some(step) = self.registry.parse(&planned.call, &ctx).await else {
                if planned.cached {
                    self.forget(planned.key.as_deref()).await;
                }
                state.ungrounded_streak += 1;
                warn!(
                    request_id = %request_id,
                    tool = %planned.call.name,
                    streak = state.ungrounded_streak,
                    "step dropped, requesting another"
                );
                if state.ungrounded_streak >= self.config.max_ungrounded_retries {
                    return (
                        LoopStatus::Ungrounded,
                        format!(
                            "{} consecutive steps could not be grounded",
                            state.ungrounded_streak
                        ),
                    );
                }
                continue;
            };
            state.ungrounded_streak = 0;
            if !planned.cached {
                self.remember(planned.key.as_deref(), &planned.call, request_id)
                    .await;
            }

            let kind = step.kind();
            info!(
                request_id = %request_id,
                step = state.depth,
                kind = %kind,
                description = %step.common.description,
                "executing step"
            );
            let handled = match self.registry.execute(&step, &ctx).await {
                Ok(handled) => handled,
                Err(err) => {
                    warn!(request_id = %request_id, kind = %kind, "handler fault: {}", err);
                    return (LoopStatus::Failed, format!("Step handler fault: {}", err));
                }
            };

            let success = handled.outcome.success;
            let message = handled.outcome.message.clone();
            let is_last_step = step.is_last_step();
            state.variables.merge(&handled.new_variables);
            state
                .history
                .push(HistoryEntry::new(step, handled.outcome, handled.new_variables));
            state.steps_taken += 1;

            match kind {
                StepKind::Fail => {
                    return (LoopStatus::Failed, format!("Agent gave up: {}", message));
                }
                kind if kind.is_backtrack() => {
                    state.backtracks += 1;
                    debug!(backtracks = state.backtracks, "backtracking");
                    if state.backtracks >= self.config.max_backtracks {
                        return (
                            LoopStatus::BacktracksExhausted,
                            format!(
                                "Reached maximum backtracks: {}",
                                self.config.max_backtracks
                            ),
                        );
                    }
                }
                _ if success && is_last_step => return (LoopStatus::Succeeded, message),
                _ => {
                    if !success {
                        debug!(kind = %kind, "step failed, continuing: {}", message);
                    }
                }
            }
        }
    }

    async fn request_step(
        &self,
        request: &PlanRequest,
        request_id: &RequestId,
    ) -> Result<PlannedCall, AgentError> {
        let key = match (&self.services.cache, self.config.cache_model_steps) {
            (Some(_), true) => content_hash(&PlanKey {
                kind: "plan",
                request,
            })
            .map_err(|err| warn!("plan key not computable: {}", err))
            .ok(),
            _ => None,
        };

        if let (Some(cache), Some(key)) = (&self.services.cache, &key) {
            if let Some(call) = cache.get_json::<ToolCall>(key, request_id).await {
                debug!(tool = %call.name, "model step served from cache");
                return Ok(PlannedCall {
                    call,
                    key: Some(key.clone()),
                    cached: true,
                });
            }
        }

        let call = self.model.next_step(request).await?;
        debug!(tool = %call.name, "model proposed step");
        Ok(PlannedCall {
            call,
            key,
            cached: false,
        })
    }

    async fn remember(&self, key: Option<&str>, call: &ToolCall, request_id: &RequestId) {
        if let (Some(cache), Some(key)) = (&self.services.cache, key) {
            cache.set_json(key, call, request_id).await;
        }
    }

    async fn forget(&self, key: Option<&str>) {
        if let (Some(cache), Some(key)) = (&self.services.cache, key) {
            cache.delete(key).await;
        }
    }

    async fn rollback(&self, request_id: &RequestId) {
        if let Some(cache) = &self.services.cache {
            let removed = cache.delete_all_for_request_id(request_id).await;
            if removed > 0 {
                info!(request_id = %request_id, removed, "rolled back cached results");
            }
        }
    }
}
