//! Record extraction from decoded statements and reports.

mod fallback;
mod report;
pub mod rules;
mod table;

pub use fallback::LineScanner;
pub use report::ReportReader;
pub use table::TableExtractor;

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ExtractionError;
use crate::models::Value;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// What an extraction record asks the ledger to do.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordPayload {
    /// Add `amount` to the case's `category` accumulator.
    Fee { category: String, amount: Decimal },
    /// Upsert a full report row.
    Report {
        /// Row fields in source column order, identifier column excluded.
        fields: Vec<(String, Value)>,
        /// Field names that accumulate rather than overwrite.
        fee_fields: BTreeSet<String>,
    },
}

/// A normalized unit of work produced from one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionRecord {
    /// Case identifier, trimmed.
    pub case_id: String,
    pub payload: RecordPayload,
    /// Source filename, for diagnostics only.
    pub source: String,
}

impl ExtractionRecord {
    /// Create a fee-style record.
    pub fn fee(
        case_id: impl Into<String>,
        category: impl Into<String>,
        amount: Decimal,
        source: impl Into<String>,
    ) -> Self {
        Self {
            case_id: case_id.into().trim().to_string(),
            payload: RecordPayload::Fee {
                category: category.into(),
                amount,
            },
            source: source.into(),
        }
    }

    /// Create a report-style record.
    pub fn report(
        case_id: impl Into<String>,
        fields: Vec<(String, Value)>,
        fee_fields: BTreeSet<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            case_id: case_id.into().trim().to_string(),
            payload: RecordPayload::Report { fields, fee_fields },
            source: source.into(),
        }
    }

    /// Category label for fee-style records.
    pub fn category(&self) -> Option<&str> {
        match &self.payload {
            RecordPayload::Fee { category, .. } => Some(category.as_str()),
            RecordPayload::Report { .. } => None,
        }
    }

    /// Amount for fee-style records.
    pub fn amount(&self) -> Option<Decimal> {
        match &self.payload {
            RecordPayload::Fee { amount, .. } => Some(*amount),
            RecordPayload::Report { .. } => None,
        }
    }
}

/// Trait for document-to-record extractors.
pub trait RecordExtractor {
    /// Decoded document type this extractor reads.
    type Input: ?Sized;

    /// Extract records from a decoded document, in document order.
    fn extract(&self, input: &Self::Input, source: &str) -> Result<Vec<ExtractionRecord>>;
}
