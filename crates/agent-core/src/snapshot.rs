//! Tree-extraction boundary

use action_primitives::memory::MemoryPage;
use async_trait::async_trait;

pub use action_locator::TreeSnapshot;

use crate::errors::AgentError;

/// Produces `{simplifiedTree, idToAddress}` for the page's current state.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn snapshot(&self) -> Result<TreeSnapshot, AgentError>;
}

#[async_trait]
impl SnapshotProvider for MemoryPage {
    async fn snapshot(&self) -> Result<TreeSnapshot, AgentError> {
        let (tree, refs) = self.accessibility_outline();
        Ok(TreeSnapshot::from_pairs(tree, refs))
    }
}
