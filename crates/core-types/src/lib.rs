use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

/// Shared error type for the core primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("malformed element reference: {0}")]
    MalformedElementRef(String),
    #[error("unknown locator strategy: {0}")]
    UnknownStrategy(String),
    #[error("unknown reliability tier: {0}")]
    UnknownReliability(String),
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of one logical request (a whole plan execution). Every cache entry
/// written on behalf of the request carries it so the request can be rolled back.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Snapshot-scoped element reference in the form `frameIndex-backendNodeId`.
///
/// Only meaningful inside the accessibility-tree snapshot that produced it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ElementRef {
    pub frame_index: u32,
    pub backend_node_id: i64,
}

impl ElementRef {
    pub fn new(frame_index: u32, backend_node_id: i64) -> Self {
        Self {
            frame_index,
            backend_node_id,
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.frame_index, self.backend_node_id)
    }
}

impl FromStr for ElementRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (frame, node) = trimmed
            .split_once('-')
            .ok_or_else(|| CoreError::MalformedElementRef(s.to_string()))?;
        let frame_index = frame
            .parse::<u32>()
            .map_err(|_| CoreError::MalformedElementRef(s.to_string()))?;
        let backend_node_id = node
            .parse::<i64>()
            .map_err(|_| CoreError::MalformedElementRef(s.to_string()))?;
        Ok(Self::new(frame_index, backend_node_id))
    }
}

#[cfg(feature = "serde-full")]
impl serde::Serialize for ElementRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde-full")]
impl<'de> serde::Deserialize<'de> for ElementRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// How a locator address should be interpreted by the browser driver.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "camelCase"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LocatorStrategy {
    Role,
    Text,
    Label,
    Placeholder,
    TestId,
    Css,
    Xpath,
}

impl LocatorStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::Role => "role",
            LocatorStrategy::Text => "text",
            LocatorStrategy::Label => "label",
            LocatorStrategy::Placeholder => "placeholder",
            LocatorStrategy::TestId => "testId",
            LocatorStrategy::Css => "css",
            LocatorStrategy::Xpath => "xpath",
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LocatorStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "role" => Ok(LocatorStrategy::Role),
            "text" => Ok(LocatorStrategy::Text),
            "label" => Ok(LocatorStrategy::Label),
            "placeholder" => Ok(LocatorStrategy::Placeholder),
            "testId" | "test-id" | "test_id" => Ok(LocatorStrategy::TestId),
            "css" => Ok(LocatorStrategy::Css),
            "xpath" => Ok(LocatorStrategy::Xpath),
            other => Err(CoreError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Coarse confidence label on a synthesized locator. Ordered `Low < Medium < High`.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Reliability {
    Low,
    Medium,
    High,
}

impl Reliability {
    pub fn name(&self) -> &'static str {
        match self {
            Reliability::Low => "low",
            Reliability::Medium => "medium",
            Reliability::High => "high",
        }
    }
}

impl fmt::Display for Reliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Reliability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Reliability::Low),
            "medium" => Ok(Reliability::Medium),
            "high" => Ok(Reliability::High),
            other => Err(CoreError::UnknownReliability(other.to_string())),
        }
    }
}

/// Durable element locator produced once per grounding operation.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct LocatorDescriptor {
    pub address: String,
    pub strategy: LocatorStrategy,
    pub reliability: Reliability,
}

impl LocatorDescriptor {
    pub fn new(
        address: impl Into<String>,
        strategy: LocatorStrategy,
        reliability: Reliability,
    ) -> Self {
        Self {
            address: address.into(),
            strategy,
            reliability,
        }
    }

    /// Wrap a raw page address recovered from a snapshot map. Addresses that look
    /// like XPath expressions keep the xpath strategy; anything else is CSS.
    pub fn literal(address: impl Into<String>) -> Self {
        let address = address.into();
        let strategy = if address.starts_with('/') || address.starts_with("xpath=") {
            LocatorStrategy::Xpath
        } else {
            LocatorStrategy::Css
        };
        Self::new(address, strategy, Reliability::Low)
    }

    pub fn is_stable(&self) -> bool {
        self.reliability >= Reliability::Medium
    }
}

impl fmt::Display for LocatorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.strategy, self.address, self.reliability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_ref_round_trips_through_display() {
        let parsed: ElementRef = "0-1542".parse().unwrap();
        assert_eq!(parsed, ElementRef::new(0, 1542));
        assert_eq!(parsed.to_string(), "0-1542");
    }

    #[test]
    fn element_ref_rejects_malformed_input() {
        assert!("1542".parse::<ElementRef>().is_err());
        assert!("a-12".parse::<ElementRef>().is_err());
        assert!("1-".parse::<ElementRef>().is_err());
    }

    #[test]
    fn reliability_is_ordered() {
        assert!(Reliability::High > Reliability::Medium);
        assert!(Reliability::Medium > Reliability::Low);
    }

    #[test]
    fn literal_locator_picks_strategy_from_shape() {
        let xpath = LocatorDescriptor::literal("/html/body/div[2]/button");
        assert_eq!(xpath.strategy, LocatorStrategy::Xpath);
        assert_eq!(xpath.reliability, Reliability::Low);
        assert!(!xpath.is_stable());

        let css = LocatorDescriptor::literal("#cart > button:nth-child(2)");
        assert_eq!(css.strategy, LocatorStrategy::Css);
    }

    #[test]
    fn strategy_names_parse_back() {
        for strategy in [
            LocatorStrategy::Role,
            LocatorStrategy::Text,
            LocatorStrategy::Label,
            LocatorStrategy::Placeholder,
            LocatorStrategy::TestId,
            LocatorStrategy::Css,
            LocatorStrategy::Xpath,
        ] {
            assert_eq!(strategy.name().parse::<LocatorStrategy>().unwrap(), strategy);
        }
    }
}
