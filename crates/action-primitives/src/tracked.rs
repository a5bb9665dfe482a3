//! Page tracking decorator over a browser context
//!
//! [`TrackedContext`] intercepts `new_page` and `pages` and hands out
//! [`TrackedPage`] wrappers. Each wrapper owns its raw page and keeps its own
//! interaction log. The context remembers wrappers only through `Weak`
//! references keyed by raw page identity, so the same raw page maps to the
//! same wrapper while that wrapper is alive, and dropping the last wrapper
//! frees the log.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use testpilot_core_types::LocatorDescriptor;
use tracing::debug;

use crate::driver::{BrowserContext, PageDriver};
use crate::errors::DriverError;
use crate::types::{ElementOp, ElementQuery, ElementTraits, PageEvent, QueryValue};

/// Wrapped page handle with a per-instance interaction log.
pub struct TrackedPage<P: PageDriver> {
    raw: Arc<P>,
    events: Mutex<Vec<PageEvent>>,
}

impl<P: PageDriver> TrackedPage<P> {
    fn new(raw: Arc<P>) -> Self {
        Self {
            raw,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn raw(&self) -> &Arc<P> {
        &self.raw
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.events.lock().clone()
    }

    fn note<T>(&self, kind: &str, target: Option<&str>, result: &Result<T, DriverError>) {
        self.events.lock().push(PageEvent::new(
            kind,
            target.map(str::to_string),
            result.is_ok(),
        ));
    }
}

#[async_trait]
impl<P: PageDriver + 'static> PageDriver for TrackedPage<P> {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let result = self.raw.navigate(url).await;
        self.note("navigate", Some(url), &result);
        result
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.raw.current_url().await
    }

    async fn perform(&self, locator: &LocatorDescriptor, op: &ElementOp) -> Result<(), DriverError> {
        let result = self.raw.perform(locator, op).await;
        self.note(op.name(), Some(&locator.address), &result);
        result
    }

    async fn query(
        &self,
        locator: &LocatorDescriptor,
        query: &ElementQuery,
    ) -> Result<QueryValue, DriverError> {
        self.raw.query(locator, query).await
    }

    async fn count(&self, locator: &LocatorDescriptor) -> Result<usize, DriverError> {
        self.raw.count(locator).await
    }

    async fn describe(&self, address: &str) -> Result<Option<ElementTraits>, DriverError> {
        self.raw.describe(address).await
    }

    async fn wait_for_settled(&self, timeout: Duration) -> Result<(), DriverError> {
        self.raw.wait_for_settled(timeout).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let result = self.raw.screenshot().await;
        self.note("screenshot", None, &result);
        result
    }
}

/// Decorator returning [`TrackedPage`] wrappers for every page of `C`.
pub struct TrackedContext<C: BrowserContext> {
    inner: C,
    wrappers: DashMap<usize, Weak<TrackedPage<C::Page>>>,
}

impl<C: BrowserContext> TrackedContext<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            wrappers: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Number of wrappers still alive.
    pub fn live_wrappers(&self) -> usize {
        self.wrappers
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    fn wrap(&self, raw: Arc<C::Page>) -> Arc<TrackedPage<C::Page>> {
        let key = Arc::as_ptr(&raw) as *const () as usize;
        let mut slot = self.wrappers.entry(key).or_insert_with(Weak::new);
        if let Some(existing) = slot.upgrade() {
            return existing;
        }
        let wrapper = Arc::new(TrackedPage::new(raw));
        *slot = Arc::downgrade(&wrapper);
        debug!(page = key, "tracking new page");
        wrapper
    }

    fn prune(&self) {
        self.wrappers.retain(|_, weak| weak.strong_count() > 0);
    }

    pub async fn new_page(&self) -> Result<Arc<TrackedPage<C::Page>>, DriverError> {
        let raw = self.inner.new_page().await?;
        self.prune();
        Ok(self.wrap(raw))
    }

    pub async fn pages(&self) -> Result<Vec<Arc<TrackedPage<C::Page>>>, DriverError> {
        let raws = self.inner.pages().await?;
        self.prune();
        Ok(raws.into_iter().map(|raw| self.wrap(raw)).collect())
    }
}
