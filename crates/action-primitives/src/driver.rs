//! Browser-driver boundary
//!
//! The engine never manages a browser process. It talks to an opaque page
//! handle through [`PageDriver`] and obtains pages from a [`BrowserContext`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use testpilot_core_types::LocatorDescriptor;

use crate::errors::DriverError;
use crate::types::{ElementOp, ElementQuery, ElementTraits, QueryValue};

/// Primitive operations on one page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    /// Apply `op` to the single element matched by `locator`.
    async fn perform(&self, locator: &LocatorDescriptor, op: &ElementOp)
        -> Result<(), DriverError>;

    async fn query(
        &self,
        locator: &LocatorDescriptor,
        query: &ElementQuery,
    ) -> Result<QueryValue, DriverError>;

    /// Number of attached elements matched by `locator`.
    async fn count(&self, locator: &LocatorDescriptor) -> Result<usize, DriverError>;

    /// Traits of the element at a raw page address, `None` when nothing lives
    /// there any more.
    async fn describe(&self, address: &str) -> Result<Option<ElementTraits>, DriverError>;

    /// Wait for network and DOM quiescence.
    async fn wait_for_settled(&self, timeout: Duration) -> Result<(), DriverError>;

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;
}

/// Source of pages, e.g. one isolated browser context.
#[async_trait]
pub trait BrowserContext: Send + Sync {
    type Page: PageDriver + 'static;

    async fn new_page(&self) -> Result<Arc<Self::Page>, DriverError>;

    async fn pages(&self) -> Result<Vec<Arc<Self::Page>>, DriverError>;
}
