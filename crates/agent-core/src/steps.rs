//! Planned steps - the typed form of one model tool call

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use testpilot_core_types::{ElementRef, LocatorDescriptor};

/// Every kind of step the model may plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    Goto,
    Act,
    Assert,
    AiVisualCheck,
    Wait,
    Fail,
    GoBack,
    SkipSection,
}

impl StepKind {
    pub const ALL: [StepKind; 8] = [
        StepKind::Goto,
        StepKind::Act,
        StepKind::Assert,
        StepKind::AiVisualCheck,
        StepKind::Wait,
        StepKind::Fail,
        StepKind::GoBack,
        StepKind::SkipSection,
    ];

    /// Tool name the model uses for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Goto => "goto",
            StepKind::Act => "act",
            StepKind::Assert => "assert",
            StepKind::AiVisualCheck => "aiVisualCheck",
            StepKind::Wait => "wait",
            StepKind::Fail => "fail",
            StepKind::GoBack => "goBack",
            StepKind::SkipSection => "skipSection",
        }
    }

    /// Tool-name lookup, tolerant of case and `-`/`_` separators.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().to_ascii_lowercase() == normalized)
    }

    /// Steps that steer the loop instead of touching the page.
    pub fn is_control(&self) -> bool {
        matches!(self, StepKind::Fail | StepKind::GoBack | StepKind::SkipSection)
    }

    /// Steps that count against the backtrack budget.
    pub fn is_backtrack(&self) -> bool {
        matches!(self, StepKind::GoBack | StepKind::SkipSection)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown step kind '{}'", s))
    }
}

/// Fields every planned step carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepCommon {
    pub description: String,
    /// Model confidence, clamped to `0.0..=1.0`.
    pub confidence: f64,
    pub is_last_step: bool,
    /// The step may legitimately fail without derailing the objective.
    pub conditional: bool,
}

impl Default for StepCommon {
    fn default() -> Self {
        Self {
            description: String::new(),
            confidence: 1.0,
            is_last_step: false,
            conditional: false,
        }
    }
}

impl StepCommon {
    /// Read the common fields from tool-call arguments; absent fields take
    /// their defaults.
    pub fn from_arguments(arguments: &Value) -> Self {
        let defaults = Self::default();
        Self {
            description: arguments
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            confidence: arguments
                .get("confidence")
                .and_then(Value::as_f64)
                .filter(|value| value.is_finite())
                .map(|value| value.clamp(0.0, 1.0))
                .unwrap_or(defaults.confidence),
            is_last_step: flag(arguments, "isLastStep"),
            conditional: flag(arguments, "conditional"),
        }
    }
}

fn flag(arguments: &Value, name: &str) -> bool {
    arguments.get(name).and_then(Value::as_bool).unwrap_or(false)
}

/// Kind-specific step data. Variable-bearing fields hold the `{{NAME}}`
/// template, never the substituted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StepPayload {
    Goto {
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    Act {
        method: String,
        element_ref: ElementRef,
        locator: LocatorDescriptor,
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        store_as: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Assert {
        method: String,
        element_ref: ElementRef,
        locator: LocatorDescriptor,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected: Option<String>,
    },
    AiVisualCheck {
        prompt: String,
    },
    #[serde(rename_all = "camelCase")]
    Wait {
        duration_ms: u64,
    },
    Fail {
        reason: String,
    },
    GoBack {
        reason: String,
    },
    SkipSection {
        reason: String,
    },
}

impl StepPayload {
    pub fn kind(&self) -> StepKind {
        match self {
            StepPayload::Goto { .. } => StepKind::Goto,
            StepPayload::Act { .. } => StepKind::Act,
            StepPayload::Assert { .. } => StepKind::Assert,
            StepPayload::AiVisualCheck { .. } => StepKind::AiVisualCheck,
            StepPayload::Wait { .. } => StepKind::Wait,
            StepPayload::Fail { .. } => StepKind::Fail,
            StepPayload::GoBack { .. } => StepKind::GoBack,
            StepPayload::SkipSection { .. } => StepKind::SkipSection,
        }
    }
}

/// One grounded, typed step ready for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    #[serde(flatten)]
    pub common: StepCommon,
    #[serde(flatten)]
    pub payload: StepPayload,
}

impl PlannedStep {
    pub fn new(common: StepCommon, payload: StepPayload) -> Self {
        Self { common, payload }
    }

    pub fn kind(&self) -> StepKind {
        self.payload.kind()
    }

    pub fn is_last_step(&self) -> bool {
        self.common.is_last_step
    }

    /// Locator resolved at parse time, for element steps.
    pub fn locator(&self) -> Option<&LocatorDescriptor> {
        match &self.payload {
            StepPayload::Act { locator, .. } | StepPayload::Assert { locator, .. } => Some(locator),
            _ => None,
        }
    }

    /// Reason carried by a control step.
    pub fn reason(&self) -> Option<&str> {
        match &self.payload {
            StepPayload::Fail { reason }
            | StepPayload::GoBack { reason }
            | StepPayload::SkipSection { reason } => Some(reason),
            _ => None,
        }
    }
}
