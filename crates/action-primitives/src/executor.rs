use std::sync::Arc;
use std::time::{Duration, Instant};

use testpilot_core_types::LocatorDescriptor;
use tracing::{debug, info, warn};

use crate::driver::PageDriver;
use crate::errors::{ActionError, DriverError};
use crate::primitives::ActionMethod;
use crate::types::ElementQuery;
use crate::waiting::{SettleWaitStrategy, WaitStrategy};

/// Default bound on a single primitive operation.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Translates `(method, locator, args)` into driver operations.
pub struct ActionExecutor {
    driver: Arc<dyn PageDriver>,
    wait_strategy: Arc<dyn WaitStrategy>,
    action_timeout: Duration,
}

impl ActionExecutor {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            wait_strategy: Arc::new(SettleWaitStrategy::default()),
            action_timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    pub fn with_wait_strategy(mut self, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    pub fn action_timeout(&self) -> Duration {
        self.action_timeout
    }

    /// Run one verb against the element behind `locator`, then wait for the
    /// page to settle.
    ///
    /// A settle failure after a successful action is logged and ignored; the
    /// action itself already happened.
    pub async fn perform_action(
        &self,
        method: &str,
        locator: &LocatorDescriptor,
        args: &[String],
        settle_timeout: Duration,
    ) -> Result<(), ActionError> {
        let method = ActionMethod::parse(method)?;
        let op = method.to_op(args)?;
        let start = Instant::now();

        info!(
            method = %method,
            locator = %locator,
            "Executing action"
        );

        self.bounded(op.name(), self.driver.perform(locator, &op))
            .await?;
        self.settle(settle_timeout).await;

        info!(
            method = %method,
            latency_ms = start.elapsed().as_millis() as u64,
            "Action completed"
        );
        Ok(())
    }

    pub async fn navigate(&self, url: &str, settle_timeout: Duration) -> Result<(), ActionError> {
        info!(url, "Navigating");
        self.bounded("navigate", self.driver.navigate(url)).await?;
        self.settle(settle_timeout).await;
        Ok(())
    }

    /// Visible text of the element, used when an action stores its result.
    pub async fn read_text(&self, locator: &LocatorDescriptor) -> Result<Option<String>, ActionError> {
        let value = self
            .bounded("innerText", self.driver.query(locator, &ElementQuery::InnerText))
            .await?;
        Ok(value.into_text())
    }

    pub async fn screenshot(&self) -> Result<Vec<u8>, ActionError> {
        self.bounded("screenshot", self.driver.screenshot()).await
    }

    async fn settle(&self, timeout: Duration) {
        if let Err(err) = self.wait_strategy.settle(self.driver.as_ref(), timeout).await {
            warn!("page did not settle after action: {}", err);
        } else {
            debug!("page settled");
        }
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, ActionError>
    where
        F: std::future::Future<Output = Result<T, DriverError>>,
    {
        match tokio::time::timeout(self.action_timeout, fut).await {
            Ok(result) => result.map_err(ActionError::from),
            Err(_) => Err(ActionError::Timeout {
                operation: operation.to_string(),
                after_ms: self.action_timeout.as_millis() as u64,
            }),
        }
    }
}
