//! Vulnerability classes and the rules of the non-snippet injection approaches.

use serde::{Deserialize, Serialize};

/// A vulnerability class that can be injected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugType {
    /// Numeric id, stable across releases.
    pub id: u32,
    /// Name used for output directories and the `bug type` column of the bug log.
    pub name: String,
    /// Directory below `bugs_dir` holding the snippets of this class.
    pub dir: String,
}

impl BugType {
    /// Creates a class whose snippet directory is named like the class.
    pub fn new(id: u32, name: &str) -> Self {
        Self { id, name: name.to_string(), dir: name.to_string() }
    }

    /// Whether `key` names this class, either by id or by case-insensitive name.
    pub fn matches(&self, key: &str) -> bool {
        let key = key.trim();
        key.parse::<u32>().map(|id| id == self.id).unwrap_or(false)
            || self.name.eq_ignore_ascii_case(key)
    }

    /// The classes known out of the box.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(1, "Re-entrancy"),
            Self::new(2, "Timestamp-Dependency"),
            Self::new(3, "Unchecked-Send"),
            Self::new(4, "Unhandled-Exceptions"),
            Self::new(5, "TOD"),
            Self::new(6, "Overflow-Underflow"),
            Self::new(7, "tx.origin"),
        ]
    }
}

/// Names of the two snippet sub-directories of a class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnippetForms {
    /// Fragments inserted before a statement.
    pub statement: String,
    /// Fragments inserted after a block or definition.
    pub block: String,
}

impl Default for SnippetForms {
    fn default() -> Self {
        Self { statement: "ts".to_string(), block: "tf".to_string() }
    }
}

/// Replaces secure code with a vulnerable variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRule {
    /// Class the rule belongs to.
    pub bug_type: String,
    /// Regex matching the secure code.
    pub secure: String,
    /// Replacement, may reference capture groups.
    pub vulnerable: String,
}

/// Disables a `revert();` guard on lines matching `pattern`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakenRule {
    /// Class the rule belongs to.
    pub bug_type: String,
    /// Regex selecting the lines whose guard is removed.
    pub pattern: String,
}
