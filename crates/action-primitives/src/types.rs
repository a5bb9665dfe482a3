//! Core data types for action primitives

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single primitive interaction with one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "camelCase")]
pub enum ElementOp {
    Click,
    DoubleClick,
    /// Replace the field's value in one step
    Fill(String),
    /// Type key by key, firing input events per character
    TypeSequentially(String),
    PressKey(String),
    SelectOption(String),
    Check,
    Uncheck,
    Hover,
    Focus,
    Blur,
    Clear,
    ScrollIntoView,
}

impl ElementOp {
    pub fn name(&self) -> &'static str {
        match self {
            ElementOp::Click => "click",
            ElementOp::DoubleClick => "doubleClick",
            ElementOp::Fill(_) => "fill",
            ElementOp::TypeSequentially(_) => "typeSequentially",
            ElementOp::PressKey(_) => "pressKey",
            ElementOp::SelectOption(_) => "selectOption",
            ElementOp::Check => "check",
            ElementOp::Uncheck => "uncheck",
            ElementOp::Hover => "hover",
            ElementOp::Focus => "focus",
            ElementOp::Blur => "blur",
            ElementOp::Clear => "clear",
            ElementOp::ScrollIntoView => "scrollIntoView",
        }
    }
}

/// Read-only probes used by assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", content = "name", rename_all = "camelCase")]
pub enum ElementQuery {
    Visible,
    Enabled,
    Checked,
    Focused,
    InnerText,
    InputValue,
    Attribute(String),
}

/// Answer to an [`ElementQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Flag(bool),
    Text(Option<String>),
}

impl QueryValue {
    pub fn as_flag(&self) -> bool {
        match self {
            QueryValue::Flag(flag) => *flag,
            QueryValue::Text(text) => text.is_some(),
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            QueryValue::Flag(_) => None,
            QueryValue::Text(text) => text,
        }
    }
}

/// Stable characteristics of one live element, used to synthesize durable
/// locators for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementTraits {
    pub role: Option<String>,
    /// Accessible name
    pub name: Option<String>,
    pub text: Option<String>,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub test_id: Option<String>,
}

/// One entry in a tracked page's interaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEvent {
    pub kind: String,
    pub target: Option<String>,
    pub ok: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub at: DateTime<Utc>,
}

impl PageEvent {
    pub fn new(kind: impl Into<String>, target: Option<String>, ok: bool) -> Self {
        Self {
            kind: kind.into(),
            target,
            ok,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_value_accessors() {
        assert!(QueryValue::Flag(true).as_flag());
        assert!(!QueryValue::Text(None).as_flag());
        assert_eq!(
            QueryValue::Text(Some("Cart (1)".into())).into_text(),
            Some("Cart (1)".to_string())
        );
        assert_eq!(QueryValue::Flag(true).into_text(), None);
    }

    #[test]
    fn ops_serialize_with_camel_case_tags() {
        let json = serde_json::to_value(ElementOp::TypeSequentially("abc".into())).unwrap();
        assert_eq!(json["op"], "typeSequentially");
        assert_eq!(json["value"], "abc");
    }
}
