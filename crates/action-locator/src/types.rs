//! Core types for element grounding

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use testpilot_core_types::{ElementRef, LocatorDescriptor};

/// Output of the external tree-extraction function for one page state.
///
/// References in `id_to_address` are meaningful only for this snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    pub simplified_tree: String,
    pub id_to_address: HashMap<ElementRef, String>,
}

impl TreeSnapshot {
    pub fn new(simplified_tree: impl Into<String>) -> Self {
        Self {
            simplified_tree: simplified_tree.into(),
            id_to_address: HashMap::new(),
        }
    }

    pub fn from_pairs<I>(simplified_tree: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (ElementRef, String)>,
    {
        Self {
            simplified_tree: simplified_tree.into(),
            id_to_address: pairs.into_iter().collect(),
        }
    }

    pub fn with_element(mut self, element_ref: ElementRef, address: impl Into<String>) -> Self {
        self.id_to_address.insert(element_ref, address.into());
        self
    }

    pub fn address(&self, element_ref: &ElementRef) -> Option<&str> {
        self.id_to_address.get(element_ref).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_address.is_empty()
    }
}

/// Outcome of grounding one element reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grounding {
    pub element_ref: ElementRef,
    pub address: String,
    pub locator: LocatorDescriptor,
    /// Served from the result cache instead of probing the page
    #[serde(default, skip_serializing)]
    pub cached: bool,
}
