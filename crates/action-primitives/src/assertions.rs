//! Boolean checks against the live page
//!
//! Assertions are expected to fail as a normal test outcome, so nothing here
//! returns an error. Every failure, including an unknown assertion name,
//! evaluates to `false`.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use testpilot_core_types::LocatorDescriptor;
use tracing::{debug, warn};

use crate::driver::PageDriver;
use crate::errors::DriverError;
use crate::primitives::normalize;
use crate::types::ElementQuery;

pub const DEFAULT_ASSERTION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssertionMethod {
    Visible,
    Hidden,
    Enabled,
    Disabled,
    Checked,
    Attached,
    Empty,
    Focused,
    HasText,
    ContainsText,
    HasValue,
    HasAttribute,
    HasCount,
}

impl AssertionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            AssertionMethod::Visible => "visible",
            AssertionMethod::Hidden => "hidden",
            AssertionMethod::Enabled => "enabled",
            AssertionMethod::Disabled => "disabled",
            AssertionMethod::Checked => "checked",
            AssertionMethod::Attached => "attached",
            AssertionMethod::Empty => "empty",
            AssertionMethod::Focused => "focused",
            AssertionMethod::HasText => "hasText",
            AssertionMethod::ContainsText => "containsText",
            AssertionMethod::HasValue => "hasValue",
            AssertionMethod::HasAttribute => "hasAttribute",
            AssertionMethod::HasCount => "hasCount",
        }
    }

    /// Accepts the canonical names plus `is*`/`toBe*`/`toHave*` spellings.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = normalize(name);
        let stripped = ["tobe", "tohave", "is"]
            .iter()
            .find_map(|prefix| normalized.strip_prefix(*prefix))
            .unwrap_or(normalized.as_str());

        let method = match stripped {
            "visible" => AssertionMethod::Visible,
            "hidden" => AssertionMethod::Hidden,
            "enabled" => AssertionMethod::Enabled,
            "disabled" => AssertionMethod::Disabled,
            "checked" => AssertionMethod::Checked,
            "attached" => AssertionMethod::Attached,
            "empty" => AssertionMethod::Empty,
            "focused" => AssertionMethod::Focused,
            "hastext" | "text" => AssertionMethod::HasText,
            "containstext" | "tocontaintext" => AssertionMethod::ContainsText,
            "hasvalue" | "value" => AssertionMethod::HasValue,
            "hasattribute" | "attribute" => AssertionMethod::HasAttribute,
            "hascount" | "count" => AssertionMethod::HasCount,
            _ => return None,
        };
        Some(method)
    }

    pub fn needs_expected_value(&self) -> bool {
        matches!(
            self,
            AssertionMethod::HasText
                | AssertionMethod::ContainsText
                | AssertionMethod::HasValue
                | AssertionMethod::HasAttribute
                | AssertionMethod::HasCount
        )
    }
}

impl fmt::Display for AssertionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Polls a check until it holds or the timeout elapses.
pub struct AssertionEvaluator {
    driver: Arc<dyn PageDriver>,
    poll_interval: Duration,
}

impl AssertionEvaluator {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub async fn evaluate_assertion(
        &self,
        method: &str,
        locator: &LocatorDescriptor,
        expected: Option<&str>,
        timeout: Duration,
    ) -> bool {
        let Some(assertion) = AssertionMethod::parse(method) else {
            warn!(method, "unsupported assertion");
            return false;
        };
        if assertion.needs_expected_value() && expected.is_none() {
            warn!(method = %assertion, "assertion needs an expected value");
            return false;
        }

        let deadline = Instant::now() + timeout;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            let budget = remaining.max(self.poll_interval);
            let outcome = tokio::time::timeout(budget, self.check(assertion, locator, expected)).await;

            match outcome {
                Ok(Ok(true)) => {
                    debug!(method = %assertion, locator = %locator, attempts, "assertion holds");
                    return true;
                }
                Ok(Ok(false)) => {}
                Ok(Err(err)) => debug!(method = %assertion, "assertion probe failed: {}", err),
                Err(_) => debug!(method = %assertion, "assertion probe timed out"),
            }

            if Instant::now() >= deadline {
                debug!(method = %assertion, locator = %locator, attempts, "assertion failed");
                return false;
            }
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }

    async fn check(
        &self,
        assertion: AssertionMethod,
        locator: &LocatorDescriptor,
        expected: Option<&str>,
    ) -> Result<bool, DriverError> {
        let expected = expected.unwrap_or_default();
        let driver = self.driver.as_ref();

        match assertion {
            AssertionMethod::Attached => Ok(driver.count(locator).await? > 0),
            AssertionMethod::HasCount => match expected.trim().parse::<usize>() {
                Ok(count) => Ok(driver.count(locator).await? == count),
                Err(_) => Ok(false),
            },
            AssertionMethod::Hidden => {
                if driver.count(locator).await? == 0 {
                    return Ok(true);
                }
                Ok(!self.flag(locator, ElementQuery::Visible).await?)
            }
            AssertionMethod::Visible => self.flag(locator, ElementQuery::Visible).await,
            AssertionMethod::Enabled => self.flag(locator, ElementQuery::Enabled).await,
            AssertionMethod::Disabled => Ok(!self.flag(locator, ElementQuery::Enabled).await?),
            AssertionMethod::Checked => self.flag(locator, ElementQuery::Checked).await,
            AssertionMethod::Focused => self.flag(locator, ElementQuery::Focused).await,
            AssertionMethod::Empty => {
                let text = self.text(locator, ElementQuery::InnerText).await?;
                let value = self.text(locator, ElementQuery::InputValue).await?;
                Ok(is_blank(text.as_deref()) && is_blank(value.as_deref()))
            }
            AssertionMethod::HasText => {
                let text = self.text(locator, ElementQuery::InnerText).await?;
                Ok(text.map(|t| collapse(&t) == collapse(expected)).unwrap_or(false))
            }
            AssertionMethod::ContainsText => {
                let text = self.text(locator, ElementQuery::InnerText).await?;
                Ok(text
                    .map(|t| collapse(&t).contains(&collapse(expected)))
                    .unwrap_or(false))
            }
            AssertionMethod::HasValue => {
                let value = self.text(locator, ElementQuery::InputValue).await?;
                Ok(value.as_deref() == Some(expected))
            }
            AssertionMethod::HasAttribute => {
                let (name, wanted) = match expected.split_once('=') {
                    Some((name, value)) => (name.trim(), Some(value)),
                    None => (expected.trim(), None),
                };
                let actual = self
                    .text(locator, ElementQuery::Attribute(name.to_string()))
                    .await?;
                Ok(match (actual, wanted) {
                    (Some(actual), Some(wanted)) => actual == wanted,
                    (Some(_), None) => true,
                    (None, _) => false,
                })
            }
        }
    }

    async fn flag(&self, locator: &LocatorDescriptor, query: ElementQuery) -> Result<bool, DriverError> {
        Ok(self.driver.query(locator, &query).await?.as_flag())
    }

    async fn text(
        &self,
        locator: &LocatorDescriptor,
        query: ElementQuery,
    ) -> Result<Option<String>, DriverError> {
        Ok(self.driver.query(locator, &query).await?.into_text())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_spellings() {
        assert_eq!(AssertionMethod::parse("hasText"), Some(AssertionMethod::HasText));
        assert_eq!(AssertionMethod::parse("toHaveText"), Some(AssertionMethod::HasText));
        assert_eq!(AssertionMethod::parse("toBeVisible"), Some(AssertionMethod::Visible));
        assert_eq!(AssertionMethod::parse("is_checked"), Some(AssertionMethod::Checked));
        assert_eq!(
            AssertionMethod::parse("contains-text"),
            Some(AssertionMethod::ContainsText)
        );
        assert_eq!(AssertionMethod::parse("toHaveCount"), Some(AssertionMethod::HasCount));
        assert_eq!(AssertionMethod::parse("looksNice"), None);
    }

    #[test]
    fn whitespace_is_collapsed_for_text_comparison() {
        assert_eq!(collapse("  Cart\n (1) "), "Cart (1)");
        assert!(is_blank(Some("   ")));
        assert!(is_blank(None));
    }
}
