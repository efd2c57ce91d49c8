//! Match/replace rules and saved header sets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a match/replace rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    /// Header replacement by exact substring.
    #[serde(rename = "header-simple")]
    HeaderSimple,
    /// Header replacement by regular expression.
    #[serde(rename = "header-regex")]
    HeaderRegex,
    /// Generic match/replace applied anywhere in the request.
    #[serde(rename = "match-replace")]
    MatchReplace,
}

impl RuleKind {
    /// Header kinds share their storage with generic match/replace rules;
    /// only header kinds are persisted in a state file.
    pub fn is_header(self) -> bool {
        !matches!(self, RuleKind::MatchReplace)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::HeaderSimple => "header-simple",
            RuleKind::HeaderRegex => "header-regex",
            RuleKind::MatchReplace => "match-replace",
        };
        f.write_str(name)
    }
}

/// A match/replace or header-injection rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReplaceRule {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    /// Pattern to look for; compiled as a regex when `regex` is set.
    #[serde(rename = "match")]
    pub pattern: String,
    pub replace: String,
    #[serde(rename = "regexMatch")]
    pub regex: bool,
}

impl MatchReplaceRule {
    pub fn new(
        kind: RuleKind,
        pattern: impl Into<String>,
        replace: impl Into<String>,
        regex: bool,
    ) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
            replace: replace.into(),
            regex,
        }
    }

    /// Composite identity key; the rule table rejects duplicates by this.
    pub fn key(&self) -> String {
        format!("{} {}->{}", self.kind, self.pattern, self.replace)
    }
}

/// A reusable, titled list of header definitions.
///
/// Both fields are required; a persisted object missing either is rejected
/// during restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedHeaderSet {
    pub title: String,
    pub headers: Vec<String>,
}
