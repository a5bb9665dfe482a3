//! Planning loop execution mode.
//!
//! The model is consulted once per iteration for exactly one step, based on
//! the objective, the recent history and a fresh tree snapshot.
//!
//! # Architecture
//!
//! ```text
//! Init → RequestStep → GroundStep → ExecuteStep → RecordHistory → {RequestStep | Terminal}
//! ```
//!
//! - `Init` seeds history (possibly from a partial run) and zeroes counters
//! - `GroundStep` drops ungrounded steps without recording them
//! - `Terminal` on `isLastStep` + success, on `fail`, or when a limit is hit
//!
//! # Key Components
//!
//! - [`PlanningConfig`]: limits for one run
//! - [`PlanningLoop`]: main loop orchestrator
//! - [`PlanningResult`]: verdict plus complete history

pub mod config;
pub mod controller;

pub use config::PlanningConfig;
pub use controller::{LoopStatus, PlanningLoop, PlanningResult, RunRequest};
