//! `{{NAME}}` variables
//!
//! Steps keep their templates; substitution happens only at the moment a value
//! reaches the page. Unknown names stay verbatim so a missing variable is
//! visible in the action log instead of silently becoming an empty string.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::warn;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Named values available to a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(BTreeMap<String, String>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fold `other` in; its values win on conflicts.
    pub fn merge(&mut self, other: &Variables) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    /// Replace every known `{{NAME}}` in `template`. Names left unresolved
    /// are logged before the value reaches the page.
    pub fn substitute(&self, template: &str) -> String {
        let missing = self.unresolved(template);
        if !missing.is_empty() {
            warn!(template, missing = ?missing, "unresolved variables left verbatim");
        }
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| match self.0.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Names referenced by `template` that have no value, first occurrence
    /// only.
    pub fn unresolved(&self, template: &str) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for name in placeholders(template) {
            if !self.0.contains_key(&name) && !missing.contains(&name) {
                missing.push(name);
            }
        }
        missing
    }

    pub fn substitute_all(&self, templates: &[String]) -> Vec<String> {
        templates.iter().map(|t| self.substitute(t)).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Names referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_are_replaced_unknown_kept() {
        let vars = Variables::new()
            .with("BASE_URL", "https://shop.test")
            .with("USER", "ada");
        assert_eq!(
            vars.substitute("{{BASE_URL}}/login?u={{ USER }}&t={{TOKEN}}"),
            "https://shop.test/login?u=ada&t={{TOKEN}}"
        );
        assert_eq!(vars.substitute("no placeholders"), "no placeholders");
    }

    #[test]
    fn merge_overrides() {
        let mut vars = Variables::new().with("A", "1").with("B", "2");
        vars.merge(&Variables::new().with("B", "3").with("C", "4"));
        assert_eq!(vars.get("B"), Some("3"));
        assert_eq!(vars.len(), 3);
    }

    #[test]
    fn placeholder_names_in_order() {
        assert_eq!(
            placeholders("{{A}} and {{B}} then {{A}}"),
            vec!["A".to_string(), "B".to_string(), "A".to_string()]
        );
    }

    #[test]
    fn unresolved_lists_missing_names_once() {
        let vars = Variables::new().with("USER", "ada");
        assert_eq!(
            vars.unresolved("{{TOKEN}}/{{ USER }}/{{TOKEN}}/{{SKU}}"),
            vec!["TOKEN".to_string(), "SKU".to_string()]
        );
        assert!(vars.unresolved("{{USER}} only").is_empty());
    }

    #[test]
    fn substituted_value_is_not_rescanned() {
        let vars = Variables::new().with("A", "{{B}}").with("B", "boom");
        assert_eq!(vars.substitute("{{A}}"), "{{B}}");
    }
}
