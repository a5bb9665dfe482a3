//! Built-in settle waiting for action primitives

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::driver::PageDriver;
use crate::errors::{ActionError, DriverError};

/// Default settle budget after an action.
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Waiting strategy trait
#[async_trait]
pub trait WaitStrategy: Send + Sync {
    /// Wait until the page is stable enough to be snapshotted again.
    async fn settle(&self, page: &dyn PageDriver, timeout: Duration) -> Result<(), ActionError>;
}

/// Delegates to the driver's own quiescence detection, bounded by a hard
/// timeout in case the driver ignores its budget.
#[derive(Debug, Clone)]
pub struct SettleWaitStrategy {
    /// Extra time granted to the driver beyond the requested budget
    pub grace: Duration,
}

impl Default for SettleWaitStrategy {
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(250),
        }
    }
}

#[async_trait]
impl WaitStrategy for SettleWaitStrategy {
    async fn settle(&self, page: &dyn PageDriver, timeout: Duration) -> Result<(), ActionError> {
        if timeout.is_zero() {
            debug!("settle wait skipped");
            return Ok(());
        }

        match tokio::time::timeout(timeout + self.grace, page.wait_for_settled(timeout)).await {
            Ok(result) => result.map_err(ActionError::from),
            Err(_) => Err(ActionError::Driver(DriverError::SettleTimeout(format!(
                "no quiescence within {}ms",
                timeout.as_millis()
            )))),
        }
    }
}

/// Skips settling entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWait;

#[async_trait]
impl WaitStrategy for NoWait {
    async fn settle(&self, _page: &dyn PageDriver, _timeout: Duration) -> Result<(), ActionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPage;

    #[test]
    fn zero_budget_skips_the_driver() {
        let page = MemoryPage::new();
        page.set_settle_delay(Duration::from_secs(60));
        let strategy = SettleWaitStrategy::default();
        let result = tokio_test::block_on(strategy.settle(&page, Duration::ZERO));
        assert!(result.is_ok());
    }

    #[test]
    fn busy_page_reports_settle_timeout() {
        let page = MemoryPage::new();
        page.set_settle_delay(Duration::from_millis(200));
        let strategy = SettleWaitStrategy {
            grace: Duration::from_millis(10),
        };

        let result = tokio_test::block_on(strategy.settle(&page, Duration::from_millis(20)));
        assert!(matches!(
            result,
            Err(ActionError::Driver(DriverError::SettleTimeout(_)))
        ));
        assert!(tokio_test::block_on(NoWait.settle(&page, Duration::from_millis(20))).is_ok());
    }
}
