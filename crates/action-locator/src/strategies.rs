//! Locator synthesis strategies
//!
//! Five characterizations of a live element, in descending preference:
//! 1. Role - ARIA role plus accessible name
//! 2. Text - visible text content
//! 3. Label - associated label text
//! 4. Placeholder - input placeholder
//! 5. TestId - `data-testid` attribute
//!
//! Each strategy proposes a selector from the element's traits; the resolver
//! keeps the first one that matches exactly one element on the page.

use action_primitives::{ElementTraits, Selector};
use testpilot_core_types::{LocatorDescriptor, LocatorStrategy, Reliability};

/// Strategy trait for locator synthesis
pub trait Strategy: Send + Sync {
    /// Selector characterizing the element, if its traits allow one
    fn propose(&self, traits: &ElementTraits) -> Option<Selector>;

    /// Reliability tier assigned when the proposal is unique
    fn reliability(&self, selector: &Selector) -> Reliability;

    fn strategy_type(&self) -> LocatorStrategy;

    fn name(&self) -> &'static str {
        self.strategy_type().name()
    }

    fn describe(&self, traits: &ElementTraits) -> Option<LocatorDescriptor> {
        let selector = self.propose(traits)?;
        let reliability = self.reliability(&selector);
        Some(LocatorDescriptor::new(
            selector.address(),
            self.strategy_type(),
            reliability,
        ))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// ARIA role strategy. A role narrowed by accessible name is `high`; a bare
/// role is only `medium`.
pub struct RoleStrategy;

impl Strategy for RoleStrategy {
    fn propose(&self, traits: &ElementTraits) -> Option<Selector> {
        let role = non_empty(&traits.role)?;
        if role == "generic" || role == "none" || role == "presentation" {
            return None;
        }
        Some(Selector::Role {
            role,
            name: non_empty(&traits.name),
        })
    }

    fn reliability(&self, selector: &Selector) -> Reliability {
        match selector {
            Selector::Role { name: Some(_), .. } => Reliability::High,
            _ => Reliability::Medium,
        }
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Role
    }
}

/// Text content strategy
pub struct TextStrategy {
    /// Longer texts are usually copy that churns; skip them
    pub max_len: usize,
}

impl Default for TextStrategy {
    fn default() -> Self {
        Self { max_len: 80 }
    }
}

impl Strategy for TextStrategy {
    fn propose(&self, traits: &ElementTraits) -> Option<Selector> {
        non_empty(&traits.text)
            .filter(|text| text.chars().count() <= self.max_len)
            .map(Selector::Text)
    }

    fn reliability(&self, _selector: &Selector) -> Reliability {
        Reliability::Medium
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Text
    }
}

pub struct LabelStrategy;

impl Strategy for LabelStrategy {
    fn propose(&self, traits: &ElementTraits) -> Option<Selector> {
        non_empty(&traits.label).map(Selector::Label)
    }

    fn reliability(&self, _selector: &Selector) -> Reliability {
        Reliability::High
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Label
    }
}

pub struct PlaceholderStrategy;

impl Strategy for PlaceholderStrategy {
    fn propose(&self, traits: &ElementTraits) -> Option<Selector> {
        non_empty(&traits.placeholder).map(Selector::Placeholder)
    }

    fn reliability(&self, _selector: &Selector) -> Reliability {
        Reliability::Medium
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Placeholder
    }
}

pub struct TestIdStrategy;

impl Strategy for TestIdStrategy {
    fn propose(&self, traits: &ElementTraits) -> Option<Selector> {
        non_empty(&traits.test_id).map(Selector::TestId)
    }

    fn reliability(&self, _selector: &Selector) -> Reliability {
        Reliability::High
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::TestId
    }
}

/// All strategies in preference order
pub fn fallback_chain() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(RoleStrategy),
        Box::new(TextStrategy::default()),
        Box::new(LabelStrategy),
        Box::new(PlaceholderStrategy),
        Box::new(TestIdStrategy),
    ]
}
