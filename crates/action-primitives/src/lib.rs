//! Action primitives - browser operations behind a driver boundary
//!
//! This crate provides the building blocks the planning engine executes with:
//! - `PageDriver`/`BrowserContext` traits as the browser-driver boundary
//! - a verb table and `ActionExecutor` with bounded timeouts and settle waiting
//! - an `AssertionEvaluator` that turns every check into a boolean
//! - a tracking decorator for browser contexts
//! - an in-memory driver for dry runs and tests

mod assertions;
mod driver;
pub mod errors;
mod executor;
mod locator;
pub mod memory;
mod primitives;
mod tracked;
pub mod types;
mod waiting;

pub use assertions::*;
pub use driver::*;
pub use errors::*;
pub use executor::*;
pub use locator::*;
pub use primitives::*;
pub use tracked::*;
pub use types::*;
pub use waiting::*;
