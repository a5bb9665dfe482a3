//! Selector addresses for each locator strategy
//!
//! Synthesized locators carry a textual address whose shape depends on the
//! strategy:
//!
//! | strategy      | address                          |
//! |---------------|----------------------------------|
//! | `role`        | `role=button[name="Add to Cart"]` |
//! | `text`        | `text="Add to Cart"`             |
//! | `label`       | `label="Email"`                  |
//! | `placeholder` | `placeholder="Search"`           |
//! | `testId`      | `[data-testid="add-to-cart"]`    |
//! | `css`/`xpath` | the literal address              |

use std::fmt;

use testpilot_core_types::{LocatorDescriptor, LocatorStrategy};

/// Parsed form of a locator address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Role { role: String, name: Option<String> },
    Text(String),
    Label(String),
    Placeholder(String),
    TestId(String),
    Css(String),
    Xpath(String),
}

impl Selector {
    pub fn strategy(&self) -> LocatorStrategy {
        match self {
            Selector::Role { .. } => LocatorStrategy::Role,
            Selector::Text(_) => LocatorStrategy::Text,
            Selector::Label(_) => LocatorStrategy::Label,
            Selector::Placeholder(_) => LocatorStrategy::Placeholder,
            Selector::TestId(_) => LocatorStrategy::TestId,
            Selector::Css(_) => LocatorStrategy::Css,
            Selector::Xpath(_) => LocatorStrategy::Xpath,
        }
    }

    pub fn address(&self) -> String {
        self.to_string()
    }

    /// Parse a descriptor's address according to its strategy.
    ///
    /// Addresses that do not have the expected shape are kept as literal
    /// css/xpath so a driver can still try them verbatim.
    pub fn from_descriptor(locator: &LocatorDescriptor) -> Self {
        let address = locator.address.as_str();
        let parsed = match locator.strategy {
            LocatorStrategy::Role => parse_role(address),
            LocatorStrategy::Text => parse_quoted(address, "text=").map(Selector::Text),
            LocatorStrategy::Label => parse_quoted(address, "label=").map(Selector::Label),
            LocatorStrategy::Placeholder => {
                parse_quoted(address, "placeholder=").map(Selector::Placeholder)
            }
            LocatorStrategy::TestId => address
                .strip_prefix("[data-testid=")
                .and_then(|rest| rest.strip_suffix(']'))
                .and_then(unquote)
                .map(Selector::TestId),
            LocatorStrategy::Css => Some(Selector::Css(address.to_string())),
            LocatorStrategy::Xpath => Some(Selector::Xpath(
                address.strip_prefix("xpath=").unwrap_or(address).to_string(),
            )),
        };
        parsed.unwrap_or_else(|| literal(address))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Role { role, name: None } => write!(f, "role={}", role),
            Selector::Role {
                role,
                name: Some(name),
            } => write!(f, "role={}[name={}]", role, quote(name)),
            Selector::Text(text) => write!(f, "text={}", quote(text)),
            Selector::Label(label) => write!(f, "label={}", quote(label)),
            Selector::Placeholder(value) => write!(f, "placeholder={}", quote(value)),
            Selector::TestId(id) => write!(f, "[data-testid={}]", quote(id)),
            Selector::Css(css) => f.write_str(css),
            Selector::Xpath(xpath) => f.write_str(xpath),
        }
    }
}

fn literal(address: &str) -> Selector {
    if address.starts_with('/') {
        Selector::Xpath(address.to_string())
    } else if let Some(xpath) = address.strip_prefix("xpath=") {
        Selector::Xpath(xpath.to_string())
    } else {
        Selector::Css(address.to_string())
    }
}

fn parse_role(address: &str) -> Option<Selector> {
    let rest = address.strip_prefix("role=")?;
    match rest.find('[') {
        None => Some(Selector::Role {
            role: rest.to_string(),
            name: None,
        }),
        Some(open) => {
            let role = rest[..open].to_string();
            let name = rest[open..]
                .strip_prefix("[name=")?
                .strip_suffix(']')
                .and_then(unquote)?;
            Some(Selector::Role {
                role,
                name: Some(name),
            })
        }
    }
}

fn parse_quoted(address: &str, prefix: &str) -> Option<String> {
    unquote(address.strip_prefix(prefix)?)
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn unquote(value: &str) -> Option<String> {
    serde_json::from_str::<String>(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use testpilot_core_types::Reliability;

    fn descriptor(selector: &Selector) -> LocatorDescriptor {
        LocatorDescriptor::new(selector.address(), selector.strategy(), Reliability::High)
    }

    #[test]
    fn addresses_parse_back_to_the_same_selector() {
        let selectors = [
            Selector::Role {
                role: "button".into(),
                name: Some("Add \"deluxe\" to Cart".into()),
            },
            Selector::Role {
                role: "navigation".into(),
                name: None,
            },
            Selector::Text("Cart (1)".into()),
            Selector::Label("Email".into()),
            Selector::Placeholder("Search products".into()),
            Selector::TestId("add-to-cart".into()),
        ];
        for selector in selectors {
            assert_eq!(Selector::from_descriptor(&descriptor(&selector)), selector);
        }
    }

    #[test]
    fn test_id_address_is_an_attribute_selector() {
        assert_eq!(
            Selector::TestId("add-to-cart".into()).address(),
            "[data-testid=\"add-to-cart\"]"
        );
    }

    #[test]
    fn malformed_address_falls_back_to_literal() {
        let locator = LocatorDescriptor::new("#cart", LocatorStrategy::Text, Reliability::Medium);
        assert_eq!(
            Selector::from_descriptor(&locator),
            Selector::Css("#cart".into())
        );
        let xpath = LocatorDescriptor::literal("/html/body/div[2]");
        assert_eq!(
            Selector::from_descriptor(&xpath),
            Selector::Xpath("/html/body/div[2]".into())
        );
    }
}
