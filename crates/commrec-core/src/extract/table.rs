//! Structured extraction from statement tables.

use rust_decimal::Decimal;
use tracing::{debug, info, trace};

use super::rules::patterns::DIGITS_ONLY;
use super::rules::{DetectionPolicy, SchemaMatch, is_blank_identifier, normalize_amount};
use super::{ExtractionRecord, RecordExtractor, Result};
use crate::models::ExtractionConfig;
use crate::pdf::{RawTable, StatementDocument};

/// Extracts fee records from every recognizable table in a statement.
pub struct TableExtractor {
    policy: DetectionPolicy,
    default_category: String,
    digits_only: bool,
}

impl TableExtractor {
    /// Create an extractor with the standard detection rules.
    pub fn new() -> Self {
        Self {
            policy: DetectionPolicy::default(),
            default_category: "Commission".to_string(),
            digits_only: true,
        }
    }

    /// Create an extractor from configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new()
            .with_policy(DetectionPolicy::new(config.detection_rules.clone()))
            .with_default_category(config.default_category.clone())
            .with_digits_only(config.digits_only_case_ids)
    }

    /// Set the column detection policy.
    pub fn with_policy(mut self, policy: DetectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the category used when a table has no category column.
    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    /// Set whether identifiers must be all digits.
    pub fn with_digits_only(mut self, digits_only: bool) -> Self {
        self.digits_only = digits_only;
        self
    }

    /// Extract records from a single table. Unrecognized tables yield nothing.
    pub fn extract_table(&self, table: &RawTable, source: &str) -> Vec<ExtractionRecord> {
        let schema = self.policy.detect(table.headers());

        if let Some(role) = schema.missing_required() {
            debug!(
                "Skipping table in {}: no {} column in {:?}",
                source,
                role.name(),
                table.headers()
            );
            return Vec::new();
        }

        info!("Found statement table with {} rows in {}", table.data_rows().len(), source);

        table
            .data_rows()
            .iter()
            .enumerate()
            .filter_map(|(i, row)| self.extract_row(row, &schema, source, i + 1))
            .collect()
    }

    fn extract_row(
        &self,
        row: &[String],
        schema: &SchemaMatch,
        source: &str,
        row_number: usize,
    ) -> Option<ExtractionRecord> {
        let case_id = schema
            .identifier
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .unwrap_or("");

        if is_blank_identifier(case_id) {
            trace!("Row {}: missing case id", row_number);
            return None;
        }
        if self.digits_only && !DIGITS_ONLY.is_match(case_id) {
            trace!("Row {}: {:?} is not a case number", row_number, case_id);
            return None;
        }

        let raw_amount = schema.amount.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("");
        let amount = normalize_amount(raw_amount);
        if amount <= Decimal::ZERO {
            trace!("Row {}: no payment in {:?}", row_number, raw_amount);
            return None;
        }

        let category = match schema.category {
            Some(i) => {
                let cell = row.get(i).map(|s| s.trim()).unwrap_or("");
                if cell.is_empty() {
                    trace!("Row {}: missing payment type", row_number);
                    return None;
                }
                cell.to_string()
            }
            None => self.default_category.clone(),
        };

        Some(ExtractionRecord::fee(case_id, category, amount, source))
    }
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordExtractor for TableExtractor {
    type Input = StatementDocument;

    /// Extract from every table on every page. An empty result means no
    /// structured data was found.
    fn extract(&self, document: &StatementDocument, source: &str) -> Result<Vec<ExtractionRecord>> {
        let mut records = Vec::new();

        for page in &document.pages {
            debug!("Extracting tables from page {} of {}", page.number, source);
            for table in &page.tables {
                records.extend(self.extract_table(table, source));
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::StatementPage;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn statement_table() -> RawTable {
        RawTable::from_rows(&[
            vec!["Date", "Case ID", "Customer", "Payment Type", "Reference", "Paid"],
            vec!["01/03/2024", "100234", "J Smith", "Proc Fee", "REF-1", "£50.00"],
            vec!["02/03/2024", "100235", "A Jones", "Commission", "REF-2", "£1,200.00"],
            vec!["", "Total", "", "", "", "£1,250.00"],
            vec!["03/03/2024", "100236", "B Brown", "Proc Fee", "REF-3", "£0.00"],
            vec!["04/03/2024", "nan", "C White", "Proc Fee", "REF-4", "£10.00"],
            vec!["05/03/2024", "100237", "D Green", "", "REF-5", "£10.00"],
        ])
    }

    #[test]
    fn test_extract_accepted_rows() {
        let records = TableExtractor::new().extract_table(&statement_table(), "march.pdf");

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            ExtractionRecord::fee("100234", "Proc Fee", Decimal::from_str("50.00").unwrap(), "march.pdf")
        );
        assert_eq!(records[1].case_id, "100235");
        assert_eq!(records[1].category(), Some("Commission"));
        assert_eq!(records[1].amount(), Some(Decimal::from_str("1200.00").unwrap()));
    }

    #[test]
    fn test_schema_rejection_yields_nothing() {
        let table = RawTable::from_rows(&[vec!["Name", "Notes"], vec!["J Smith", "call back"]]);
        assert!(TableExtractor::new().extract_table(&table, "notes.pdf").is_empty());
    }

    #[test]
    fn test_default_category_without_category_column() {
        let table = RawTable::from_rows(&[vec!["Case Id", "Amount"], vec!["200100", "75"]]);
        let records = TableExtractor::new().extract_table(&table, "s.pdf");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category(), Some("Commission"));

        let records = TableExtractor::new()
            .with_default_category("Introducer Fee")
            .extract_table(&table, "s.pdf");
        assert_eq!(records[0].category(), Some("Introducer Fee"));
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let table = RawTable::from_rows(&[vec!["Case ID", "Paid"], vec!["300100"]]);
        assert!(TableExtractor::new().extract_table(&table, "s.pdf").is_empty());
    }

    #[test]
    fn test_non_digit_ids_allowed_when_configured() {
        let table = RawTable::from_rows(&[vec!["Case ID", "Paid"], vec!["AB-100", "£5"]]);
        assert!(TableExtractor::new().extract_table(&table, "s.pdf").is_empty());

        let records = TableExtractor::new()
            .with_digits_only(false)
            .extract_table(&table, "s.pdf");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].case_id, "AB-100");
    }

    #[test]
    fn test_document_order_across_pages() {
        let second = RawTable::from_rows(&[vec!["Case ID", "Paid"], vec!["400100", "£5"]]);
        let document = StatementDocument::new(vec![
            StatementPage { number: 1, text: String::new(), tables: vec![statement_table()] },
            StatementPage { number: 2, text: String::new(), tables: vec![second] },
        ]);

        let records = TableExtractor::new().extract(&document, "doc.pdf").unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.case_id.as_str()).collect();
        assert_eq!(ids, vec!["100234", "100235", "400100"]);
    }
}
