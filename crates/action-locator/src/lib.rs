//! Element grounding - snapshot references to durable locators
//!
//! This crate turns an element reference from an accessibility-tree snapshot
//! into a locator that survives re-renders:
//! - fail-closed resolution of references through the snapshot map
//! - role, text, label, placeholder and test-id strategies, first unique wins
//! - reliability tiers, with the literal address as the `low` fallback
//! - groundings memoized in the shared result cache per snapshot content

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
