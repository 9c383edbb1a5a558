//! Keyword-based payment category classification for free-text lines.

use serde::{Deserialize, Serialize};

/// Maps a keyword found in a line to a category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keyword: String,
    pub label: String,
}

impl CategoryRule {
    pub fn new(keyword: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            label: label.into(),
        }
    }

    /// Default keyword precedence for commission statements.
    pub fn standard_rules() -> Vec<CategoryRule> {
        vec![
            Self::new("packaging", "Packaging Fee Payment"),
            Self::new("proc", "Proc Fee"),
            Self::new("broker", "Broker Fee"),
        ]
    }
}

/// First-match keyword classifier with a default label.
#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    rules: Vec<CategoryRule>,
    default_label: String,
}

impl CategoryClassifier {
    pub fn new(rules: Vec<CategoryRule>, default_label: impl Into<String>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| CategoryRule::new(r.keyword.to_lowercase(), r.label))
            .collect();
        Self {
            rules,
            default_label: default_label.into(),
        }
    }

    /// Classify a line. Keywords are matched case-insensitively in rule order.
    pub fn classify(&self, line: &str) -> &str {
        let lower = line.to_lowercase();
        self.rules
            .iter()
            .find(|rule| lower.contains(&rule.keyword))
            .map(|rule| rule.label.as_str())
            .unwrap_or(self.default_label.as_str())
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new(CategoryRule::standard_rules(), "Commission")
    }
}
