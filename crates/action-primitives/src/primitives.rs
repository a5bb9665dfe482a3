//! Verb table for element actions
//!
//! Thirteen verbs map onto [`ElementOp`] primitives:
//! click, doubleClick, hover, focus, blur, clear, check, uncheck,
//! scrollIntoView (no arguments) and fill, typeSequentially, pressKey,
//! selectOption (one argument).
//!
//! Verb names are matched case-insensitively with `-` and `_` ignored, so
//! `type-sequentially`, `type_sequentially` and `typeSequentially` are the
//! same verb.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ActionError;
use crate::types::ElementOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionMethod {
    Click,
    Fill,
    TypeSequentially,
    PressKey,
    SelectOption,
    Check,
    Uncheck,
    Hover,
    Focus,
    Blur,
    Clear,
    DoubleClick,
    ScrollIntoView,
}

impl ActionMethod {
    pub const ALL: [ActionMethod; 13] = [
        ActionMethod::Click,
        ActionMethod::Fill,
        ActionMethod::TypeSequentially,
        ActionMethod::PressKey,
        ActionMethod::SelectOption,
        ActionMethod::Check,
        ActionMethod::Uncheck,
        ActionMethod::Hover,
        ActionMethod::Focus,
        ActionMethod::Blur,
        ActionMethod::Clear,
        ActionMethod::DoubleClick,
        ActionMethod::ScrollIntoView,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActionMethod::Click => "click",
            ActionMethod::Fill => "fill",
            ActionMethod::TypeSequentially => "typeSequentially",
            ActionMethod::PressKey => "pressKey",
            ActionMethod::SelectOption => "selectOption",
            ActionMethod::Check => "check",
            ActionMethod::Uncheck => "uncheck",
            ActionMethod::Hover => "hover",
            ActionMethod::Focus => "focus",
            ActionMethod::Blur => "blur",
            ActionMethod::Clear => "clear",
            ActionMethod::DoubleClick => "doubleClick",
            ActionMethod::ScrollIntoView => "scrollIntoView",
        }
    }

    pub fn parse(name: &str) -> Result<Self, ActionError> {
        let normalized = normalize(name);
        let method = match normalized.as_str() {
            "click" => ActionMethod::Click,
            "fill" => ActionMethod::Fill,
            "typesequentially" | "type" => ActionMethod::TypeSequentially,
            "presskey" | "press" => ActionMethod::PressKey,
            "selectoption" | "select" => ActionMethod::SelectOption,
            "check" => ActionMethod::Check,
            "uncheck" => ActionMethod::Uncheck,
            "hover" => ActionMethod::Hover,
            "focus" => ActionMethod::Focus,
            "blur" => ActionMethod::Blur,
            "clear" => ActionMethod::Clear,
            "doubleclick" | "dblclick" => ActionMethod::DoubleClick,
            "scrollintoview" | "scrollintoviewifneeded" => ActionMethod::ScrollIntoView,
            _ => return Err(ActionError::UnsupportedMethod(name.to_string())),
        };
        Ok(method)
    }

    /// Number of leading arguments the verb consumes.
    pub fn arity(&self) -> usize {
        match self {
            ActionMethod::Fill
            | ActionMethod::TypeSequentially
            | ActionMethod::PressKey
            | ActionMethod::SelectOption => 1,
            _ => 0,
        }
    }

    /// Build the element operation for this verb from its argument list.
    pub fn to_op(&self, args: &[String]) -> Result<ElementOp, ActionError> {
        let first = || {
            args.first().cloned().ok_or_else(|| ActionError::MissingArgument {
                method: self.name().to_string(),
                index: 0,
            })
        };

        let op = match self {
            ActionMethod::Click => ElementOp::Click,
            ActionMethod::DoubleClick => ElementOp::DoubleClick,
            ActionMethod::Fill => ElementOp::Fill(first()?),
            ActionMethod::TypeSequentially => ElementOp::TypeSequentially(first()?),
            ActionMethod::PressKey => ElementOp::PressKey(first()?),
            ActionMethod::SelectOption => ElementOp::SelectOption(first()?),
            ActionMethod::Check => ElementOp::Check,
            ActionMethod::Uncheck => ElementOp::Uncheck,
            ActionMethod::Hover => ElementOp::Hover,
            ActionMethod::Focus => ElementOp::Focus,
            ActionMethod::Blur => ElementOp::Blur,
            ActionMethod::Clear => ElementOp::Clear,
            ActionMethod::ScrollIntoView => ElementOp::ScrollIntoView,
        };
        Ok(op)
    }
}

impl fmt::Display for ActionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionMethod {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionMethod::parse(s)
    }
}

pub(crate) fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_canonical_name_parses_back() {
        for method in ActionMethod::ALL {
            assert_eq!(ActionMethod::parse(method.name()).unwrap(), method);
        }
    }

    #[test]
    fn spelling_variants_are_accepted() {
        assert_eq!(
            ActionMethod::parse("type-sequentially").unwrap(),
            ActionMethod::TypeSequentially
        );
        assert_eq!(
            ActionMethod::parse("SCROLL_INTO_VIEW").unwrap(),
            ActionMethod::ScrollIntoView
        );
        assert_eq!(ActionMethod::parse("press-key").unwrap(), ActionMethod::PressKey);
    }

    #[test]
    fn unknown_verb_is_unsupported() {
        assert_eq!(
            ActionMethod::parse("teleport").unwrap_err(),
            ActionError::UnsupportedMethod("teleport".to_string())
        );
    }

    #[test]
    fn fill_without_value_is_missing_argument() {
        let err = ActionMethod::Fill.to_op(&[]).unwrap_err();
        assert!(matches!(err, ActionError::MissingArgument { index: 0, .. }));
        assert_eq!(
            ActionMethod::Fill.to_op(&["alice@example.com".to_string()]).unwrap(),
            ElementOp::Fill("alice@example.com".to_string())
        );
    }
}
