//! Last-resort line scanning for statements without usable tables.

use rust_decimal::Decimal;
use tracing::{debug, trace};

use super::rules::patterns::{CASE_ID_TOKEN, MONEY_TOKEN};
use super::rules::{CategoryClassifier, normalize_amount};
use super::{ExtractionRecord, RecordExtractor, Result};
use crate::models::ExtractionConfig;
use crate::pdf::StatementDocument;

/// Scans raw page text for lines holding both a case number and an amount.
pub struct LineScanner {
    classifier: CategoryClassifier,
}

impl LineScanner {
    pub fn new() -> Self {
        Self {
            classifier: CategoryClassifier::default(),
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new().with_classifier(CategoryClassifier::new(
            config.category_rules.clone(),
            config.default_category.clone(),
        ))
    }

    /// Set the category classifier.
    pub fn with_classifier(mut self, classifier: CategoryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Scan a single line, returning `(case_id, category, amount)`.
    pub fn scan_line(&self, line: &str) -> Option<(String, String, Decimal)> {
        let case_id = CASE_ID_TOKEN.captures(line)?.get(1)?.as_str().to_string();
        let amount = normalize_amount(MONEY_TOKEN.captures(line)?.get(1)?.as_str());

        if amount <= Decimal::ZERO {
            trace!("Skipping zero amount line: {}", line);
            return None;
        }

        let category = self.classifier.classify(line).to_string();
        Some((case_id, category, amount))
    }
}

impl Default for LineScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordExtractor for LineScanner {
    type Input = StatementDocument;

    fn extract(&self, document: &StatementDocument, source: &str) -> Result<Vec<ExtractionRecord>> {
        let mut records = Vec::new();

        for page in &document.pages {
            for line in page.text.lines() {
                if let Some((case_id, category, amount)) = self.scan_line(line) {
                    debug!("Page {}: {} {} {} from text line", page.number, case_id, category, amount);
                    records.push(ExtractionRecord::fee(case_id, category, amount, source));
                }
            }
        }

        Ok(records)
    }
}
