//! Execution outcomes and persisted step records

use serde::{Deserialize, Serialize};
use testpilot_core_types::{LocatorDescriptor, Reliability};

use crate::steps::{PlannedStep, StepPayload};
use crate::variables::Variables;

/// Result of executing one step. Produced for every handled step, success or
/// not; arguments are kept in template form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub success: bool,
    pub message: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator_snapshot: Option<LocatorDescriptor>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ExecutionOutcome {
    pub fn succeeded(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            method: method.into(),
            locator_snapshot: None,
            args: Vec::new(),
        }
    }

    pub fn failed(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::succeeded(method, message)
        }
    }

    pub fn with_locator(mut self, locator: LocatorDescriptor) -> Self {
        self.locator_snapshot = Some(locator);
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// What a handler hands back to the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub outcome: ExecutionOutcome,
    /// Variables discovered while executing, e.g. an `act` with `storeAs`.
    pub new_variables: Variables,
}

impl HandlerOutcome {
    pub fn new(outcome: ExecutionOutcome) -> Self {
        Self {
            outcome,
            new_variables: Variables::new(),
        }
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.new_variables = variables;
        self
    }

    pub fn success(&self) -> bool {
        self.outcome.success
    }
}

impl From<ExecutionOutcome> for HandlerOutcome {
    fn from(outcome: ExecutionOutcome) -> Self {
        Self::new(outcome)
    }
}

/// Persisted form of a planned step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_reliability: Option<Reliability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl StepRecord {
    fn bare(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            selector: None,
            selector_type: None,
            selector_reliability: None,
            args: None,
            value: None,
        }
    }

    fn with_selector(mut self, locator: &LocatorDescriptor) -> Self {
        self.selector = Some(locator.address.clone());
        self.selector_type = Some(locator.strategy.name().to_string());
        self.selector_reliability = Some(locator.reliability);
        self
    }
}

impl From<&PlannedStep> for StepRecord {
    fn from(step: &PlannedStep) -> Self {
        let kind = step.kind().name();
        match &step.payload {
            StepPayload::Goto { url } => Self {
                args: Some(vec![url.clone()]),
                ..Self::bare(kind)
            },
            StepPayload::Act {
                method,
                locator,
                args,
                ..
            } => Self {
                args: Some(args.clone()),
                ..Self::bare(method.clone()).with_selector(locator)
            },
            StepPayload::Assert {
                method,
                locator,
                expected,
                ..
            } => Self {
                value: expected.clone(),
                ..Self::bare(method.clone()).with_selector(locator)
            },
            StepPayload::AiVisualCheck { prompt } => Self {
                value: Some(prompt.clone()),
                ..Self::bare(kind)
            },
            StepPayload::Wait { duration_ms } => Self {
                args: Some(vec![duration_ms.to_string()]),
                ..Self::bare(kind)
            },
            StepPayload::Fail { reason }
            | StepPayload::GoBack { reason }
            | StepPayload::SkipSection { reason } => Self {
                value: Some(reason.clone()),
                ..Self::bare(kind)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::StepCommon;
    use testpilot_core_types::{ElementRef, LocatorStrategy};

    #[test]
    fn act_record_keeps_templates_and_selector() {
        let step = PlannedStep::new(
            StepCommon::default(),
            StepPayload::Act {
                method: "fill".into(),
                element_ref: ElementRef::new(0, 4),
                locator: LocatorDescriptor::new(
                    "label=\"Email\"",
                    LocatorStrategy::Label,
                    Reliability::High,
                ),
                args: vec!["{{EMAIL}}".into()],
                store_as: None,
            },
        );
        let record = StepRecord::from(&step);
        assert_eq!(record.method, "fill");
        assert_eq!(record.selector.as_deref(), Some("label=\"Email\""));
        assert_eq!(record.selector_type.as_deref(), Some("label"));
        assert_eq!(record.selector_reliability, Some(Reliability::High));
        assert_eq!(record.args, Some(vec!["{{EMAIL}}".to_string()]));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["selectorType"], "label");
        assert_eq!(json["selectorReliability"], "high");
        assert!(json.get("value").is_none());
    }

    #[test]
    fn assert_record_uses_value() {
        let step = PlannedStep::new(
            StepCommon::default(),
            StepPayload::Assert {
                method: "hasText".into(),
                element_ref: ElementRef::new(0, 2),
                locator: LocatorDescriptor::literal("#cart"),
                expected: Some("Cart ({{COUNT}})".into()),
            },
        );
        let record = StepRecord::from(&step);
        assert_eq!(record.value.as_deref(), Some("Cart ({{COUNT}})"));
        assert!(record.args.is_none());
        assert_eq!(record.selector_type.as_deref(), Some("css"));
    }

    #[test]
    fn failed_outcome_keeps_method() {
        let outcome = ExecutionOutcome::failed("click", "boom").with_args(vec!["x".into()]);
        assert!(!outcome.success);
        assert_eq!(outcome.method, "click");
        assert_eq!(outcome.args, vec!["x".to_string()]);
    }
}
