//! Column role detection for statement tables.
//!
//! Statement layouts differ between providers, so columns are located by
//! keyword rules instead of exact names. Rules are kept as an ordered list of
//! `(predicate, role)` pairs so they can be tested and extended on their own.

use serde::{Deserialize, Serialize};

/// The role a table column plays in a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Case identifier.
    Identifier,
    /// Amount paid.
    Amount,
    /// Payment category.
    Category,
}

impl ColumnRole {
    /// Resolution order. Earlier roles claim headers first.
    pub const ALL: [ColumnRole; 3] = [ColumnRole::Identifier, ColumnRole::Amount, ColumnRole::Category];

    pub fn name(&self) -> &'static str {
        match self {
            ColumnRole::Identifier => "identifier",
            ColumnRole::Amount => "amount",
            ColumnRole::Category => "category",
        }
    }
}

/// Header test applied to a normalized (lowercase, whitespace-free) header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPredicate {
    /// Header contains the keyword.
    Contains(String),
    /// Header contains every keyword, in any order.
    ContainsAll(Vec<String>),
}

impl HeaderPredicate {
    pub fn matches(&self, normalized_header: &str) -> bool {
        match self {
            HeaderPredicate::Contains(keyword) => normalized_header.contains(&normalize_header(keyword)),
            HeaderPredicate::ContainsAll(keywords) => keywords
                .iter()
                .all(|k| normalized_header.contains(&normalize_header(k))),
        }
    }
}

/// A single detection rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRule {
    pub role: ColumnRole,
    pub predicate: HeaderPredicate,
}

impl DetectionRule {
    pub fn new(role: ColumnRole, predicate: HeaderPredicate) -> Self {
        Self { role, predicate }
    }

    fn contains(role: ColumnRole, keyword: &str) -> Self {
        Self::new(role, HeaderPredicate::Contains(keyword.to_string()))
    }

    /// Default rules for commission statements.
    pub fn standard_rules() -> Vec<DetectionRule> {
        vec![
            Self::new(
                ColumnRole::Identifier,
                HeaderPredicate::ContainsAll(vec!["case".to_string(), "id".to_string()]),
            ),
            Self::contains(ColumnRole::Amount, "paid"),
            Self::contains(ColumnRole::Amount, "amount"),
            Self::contains(ColumnRole::Amount, "received"),
            Self::contains(ColumnRole::Category, "payment"),
            Self::contains(ColumnRole::Category, "type"),
            Self::contains(ColumnRole::Category, "fee"),
        ]
    }
}

/// Lowercase a header and drop all whitespace.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Column indices resolved for each role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaMatch {
    pub identifier: Option<usize>,
    pub amount: Option<usize>,
    pub category: Option<usize>,
}

impl SchemaMatch {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Identifier => self.identifier,
            ColumnRole::Amount => self.amount,
            ColumnRole::Category => self.category,
        }
    }

    fn set(&mut self, role: ColumnRole, index: usize) {
        match role {
            ColumnRole::Identifier => self.identifier = Some(index),
            ColumnRole::Amount => self.amount = Some(index),
            ColumnRole::Category => self.category = Some(index),
        }
    }

    /// A table can be extracted once identifier and amount are known.
    pub fn is_extractable(&self) -> bool {
        self.identifier.is_some() && self.amount.is_some()
    }

    /// First required role that is missing, if any.
    pub fn missing_required(&self) -> Option<ColumnRole> {
        if self.identifier.is_none() {
            Some(ColumnRole::Identifier)
        } else if self.amount.is_none() {
            Some(ColumnRole::Amount)
        } else {
            None
        }
    }
}

/// Ordered rule set used to map headers to roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionPolicy {
    rules: Vec<DetectionRule>,
}

impl DetectionPolicy {
    pub fn new(rules: Vec<DetectionRule>) -> Self {
        Self { rules }
    }

    /// Add a rule after the existing ones.
    pub fn with_rule(mut self, rule: DetectionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[DetectionRule] {
        &self.rules
    }

    /// Resolve a column for each role.
    ///
    /// Within a role, headers are scanned left to right and the first one
    /// matching any of the role's rules wins. A header already taken by an
    /// earlier role is only reused when no free header matches.
    pub fn detect<S: AsRef<str>>(&self, headers: &[S]) -> SchemaMatch {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();
        let mut result = SchemaMatch::default();
        let mut claimed = vec![false; normalized.len()];

        for role in ColumnRole::ALL {
            let found = self
                .find(role, &normalized, |i| !claimed[i])
                .or_else(|| self.find(role, &normalized, |_| true));

            if let Some(index) = found {
                claimed[index] = true;
                result.set(role, index);
            }
        }

        result
    }

    fn find(&self, role: ColumnRole, headers: &[String], available: impl Fn(usize) -> bool) -> Option<usize> {
        let rules: Vec<&DetectionRule> = self.rules.iter().filter(|rule| rule.role == role).collect();

        headers
            .iter()
            .enumerate()
            .find(|(i, h)| available(*i) && rules.iter().any(|rule| rule.predicate.matches(h)))
            .map(|(i, _)| i)
    }
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self::new(DetectionRule::standard_rules())
    }
}
