//! Configuration structures for the reconciliation pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::extract::rules::category::CategoryRule;
use crate::extract::rules::schema::DetectionRule;

/// Main configuration for a reconciliation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Ledger configuration.
    pub ledger: LedgerConfig,

    /// Record extraction configuration.
    pub extraction: ExtractionConfig,

    /// Attachment classification configuration.
    pub intake: IntakeConfig,
}

/// Ledger shape and persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Path of the persisted ledger (`.csv` or `.xlsx`).
    pub path: PathBuf,

    /// Canonical name of the case identifier column.
    pub id_column: String,

    /// Ordinary fields whose changes are logged at info level.
    pub notable_fields: Vec<String>,

    /// Currency symbol used when displaying amounts.
    pub currency_symbol: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("master_data.csv"),
            id_column: "CaseID".to_string(),
            notable_fields: vec![
                "Status".to_string(),
                "Last Action".to_string(),
                "Priority".to_string(),
            ],
            currency_symbol: "£".to_string(),
        }
    }
}

/// Record extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Category used when a statement table has no category column.
    pub default_category: String,

    /// Scan raw text lines when no table yields a record.
    pub fallback_enabled: bool,

    /// Require statement table identifiers to be all digits.
    pub digits_only_case_ids: bool,

    /// Header substrings that mark a report column as a fee accumulator.
    pub report_fee_keywords: Vec<String>,

    /// Column role detection rules, in priority order.
    pub detection_rules: Vec<DetectionRule>,

    /// Fallback category keywords, in precedence order.
    pub category_rules: Vec<CategoryRule>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_category: "Commission".to_string(),
            fallback_enabled: true,
            digits_only_case_ids: true,
            report_fee_keywords: vec!["fee".to_string(), "proc".to_string()],
            detection_rules: DetectionRule::standard_rules(),
            category_rules: CategoryRule::standard_rules(),
        }
    }
}

/// Filename rules deciding which attachments enter a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Filename substrings marking a PDF as a commission statement.
    pub statement_keywords: Vec<String>,

    /// Filename substrings marking a spreadsheet as an introducer report.
    pub report_keywords: Vec<String>,

    /// Accepted statement extensions.
    pub statement_extensions: Vec<String>,

    /// Accepted report extensions.
    pub report_extensions: Vec<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            statement_keywords: vec!["commission".to_string(), "statement".to_string()],
            report_keywords: vec!["introducer".to_string(), "report".to_string()],
            statement_extensions: vec!["pdf".to_string()],
            report_extensions: vec!["xlsx".to_string(), "xls".to_string(), "csv".to_string()],
        }
    }
}

impl ReconConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ReconConfig =
            serde_json::from_str(r#"{"ledger": {"id_column": "Case Ref"}}"#).unwrap();

        assert_eq!(config.ledger.id_column, "Case Ref");
        assert_eq!(config.ledger.path, PathBuf::from("master_data.csv"));
        assert_eq!(config.extraction.default_category, "Commission");
        assert_eq!(config.extraction.category_rules.len(), 3);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = ReconConfig::default();
        config.extraction.fallback_enabled = false;
        config.save(&path).unwrap();

        let loaded = ReconConfig::from_file(&path).unwrap();
        assert!(!loaded.extraction.fallback_enabled);
        assert_eq!(loaded.intake.report_keywords, vec!["introducer", "report"]);
    }
}
