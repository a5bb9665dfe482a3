//! Agent core - the plan-execution engine.
//!
//! Turns a natural-language test objective into grounded browser steps, one
//! model tool call at a time, and records every outcome in an append-only
//! session history.

pub mod agent_loop;
pub mod errors;
pub mod handlers;
pub mod model;
pub mod outcome;
pub mod session;
pub mod snapshot;
pub mod steps;
pub mod variables;
pub mod visual;

pub use agent_loop::{LoopStatus, PlanningConfig, PlanningLoop, PlanningResult, RunRequest};
pub use errors::AgentError;
pub use handlers::{StepContext, StepHandler, StepHandlerRegistry, StepServices, StepTimings};
pub use model::{ModelClient, PlanRequest, ScriptedModel, ToolCall};
pub use outcome::{ExecutionOutcome, HandlerOutcome, StepRecord};
pub use session::{HistoryEntry, SessionHistory};
pub use snapshot::{SnapshotProvider, TreeSnapshot};
pub use steps::{PlannedStep, StepCommon, StepKind, StepPayload};
pub use variables::Variables;
pub use visual::{VisualVerdict, VisualVerifier};
