//! In-memory workspace state captured by export and rebuilt by restore.
//!
//! Everything here except the exchange log (see [`crate::log`]) lives in
//! plain mutable collections owned by the host. Restore replaces scalars
//! outright and merges collections with duplicate detection.

use std::collections::BTreeMap;

use relay_common::{MatchReplaceRule, SavedHeaderSet};
use serde::{Deserialize, Serialize};

/// AI analysis credentials and endpoint configuration.
///
/// Absent from the workspace when the feature is not configured, in which
/// case secret records in a state file are ignored on restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

impl AiConfig {
    /// Placeholder endpoint shown in the configuration panel. Never
    /// persisted, so example URLs cannot leak into state files.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:11434/v1/chat/completions";
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// How the entries of an enforcement-detector filter pair are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterCombinator {
    And,
    Or,
}

impl FilterCombinator {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterCombinator::And => "And",
            FilterCombinator::Or => "Or",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "And" => Some(FilterCombinator::And),
            "Or" => Some(FilterCombinator::Or),
            _ => None,
        }
    }
}

impl Default for FilterCombinator {
    fn default() -> Self {
        FilterCombinator::And
    }
}

/// An ordered, deduplicating set of URL-matching patterns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSet {
    entries: Vec<String>,
}

impl FilterSet {
    /// Insert a pattern unless it is already present. Returns whether the
    /// set changed.
    pub fn insert(&mut self, pattern: impl Into<String>) -> bool {
        let pattern = pattern.into();
        if self.contains(&pattern) {
            return false;
        }
        self.entries.push(pattern);
        true
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.entries.iter().any(|entry| entry == pattern)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Names of the workspace toggles persisted as one record.
pub const TOGGLE_NAMES: &[&str] = &[
    "autoScroll",
    "ignore304",
    "prevent304",
    "interceptRequestsfromRepeater",
    "doUnauthorizedRequest",
    "replaceQueryParam",
    "showAuthBypassModified",
    "showAuthPotentiallyEnforcedModified",
    "showAuthEnforcedModified",
    "showAuthBypassUnauthenticated",
    "showAuthPotentiallyEnforcedUnauthenticated",
    "showAuthEnforcedUnauthenticated",
    "showDisabledUnauthenticated",
];

/// Boolean option states, keyed by toggle name.
///
/// The default carries every known toggle switched off, so an export always
/// writes the complete set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToggleSet(BTreeMap<String, bool>);

impl ToggleSet {
    /// Set one toggle. Unknown names are rejected.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        if !TOGGLE_NAMES.contains(&name) {
            return false;
        }
        self.0.insert(name.to_string(), value);
        true
    }

    pub fn get(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    /// Apply every known toggle from `values`, keeping current states for
    /// names the map does not mention. Returns the number of names ignored
    /// because they are unknown.
    pub fn apply(&mut self, values: &BTreeMap<String, bool>) -> usize {
        let mut ignored = 0;
        for (name, value) in values {
            if !self.set(name, *value) {
                ignored += 1;
            }
        }
        ignored
    }
}

impl Default for ToggleSet {
    fn default() -> Self {
        Self(
            TOGGLE_NAMES
                .iter()
                .map(|name| (name.to_string(), false))
                .collect(),
        )
    }
}

/// Match/replace rules keyed by their composite identity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleTable {
    rules: Vec<MatchReplaceRule>,
}

impl RuleTable {
    /// Insert a rule unless one with the same identity key exists. Returns
    /// whether the table changed.
    pub fn insert(&mut self, rule: MatchReplaceRule) -> bool {
        if self.contains_key(&rule.key()) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.rules.iter().any(|rule| rule.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchReplaceRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Options from the export panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportOptions {
    pub remove_duplicates: bool,
}

/// The full mutable workspace the persistence layer captures and rebuilds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workspace {
    /// Privilege-reduction header block substituted into replayed requests.
    pub replace_string: String,
    /// AI analysis configuration; `None` when the feature is not configured.
    pub ai: Option<AiConfig>,
    /// Endpoint-detection filters for the authenticated comparison.
    pub endpoint_filters: FilterSet,
    /// Endpoint-detection filters for the unauthenticated comparison.
    pub endpoint_filters_unauth: FilterSet,
    /// Filters restricting which intercepted requests are replayed.
    pub interception_filters: FilterSet,
    pub combinator: FilterCombinator,
    pub combinator_unauth: FilterCombinator,
    pub rules: RuleTable,
    pub toggles: ToggleSet,
    pub export_options: ExportOptions,
    pub saved_headers: Vec<SavedHeaderSet>,
}

#[cfg(test)]
mod tests {
    use relay_common::RuleKind;

    use super::*;

    #[test]
    fn test_filter_set_deduplicates_preserving_order() {
        let mut set = FilterSet::default();
        assert!(set.insert("^https://a/"));
        assert!(set.insert("^https://b/"));
        assert!(!set.insert("^https://a/"));

        let entries: Vec<&str> = set.iter().collect();
        assert_eq!(entries, vec!["^https://a/", "^https://b/"]);
    }

    #[test]
    fn test_rule_table_rejects_duplicate_keys() {
        let mut table = RuleTable::default();
        let rule = MatchReplaceRule::new(RuleKind::HeaderSimple, "Cookie: a", "Cookie: b", false);
        assert!(table.insert(rule.clone()));
        assert!(!table.insert(rule));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_toggle_set_ignores_unknown_names() {
        let mut toggles = ToggleSet::default();
        let mut values = BTreeMap::new();
        values.insert("autoScroll".to_string(), true);
        values.insert("notARealToggle".to_string(), true);

        assert_eq!(toggles.apply(&values), 1);
        assert!(toggles.get("autoScroll"));
        assert!(!toggles.get("notARealToggle"));
    }

    #[test]
    fn test_toggle_apply_keeps_unmentioned_states() {
        let mut toggles = ToggleSet::default();
        toggles.set("ignore304", true);

        let mut values = BTreeMap::new();
        values.insert("autoScroll".to_string(), true);
        toggles.apply(&values);

        assert!(toggles.get("ignore304"));
        assert!(toggles.get("autoScroll"));
    }

    #[test]
    fn test_default_ai_config_uses_placeholder_endpoint() {
        assert_eq!(AiConfig::default().endpoint, AiConfig::DEFAULT_ENDPOINT);
    }
}
