//! Row extraction from introducer reports.

use std::collections::BTreeSet;

use tracing::{debug, info};

use super::rules::{is_blank_identifier, normalize_header};
use super::{ExtractionRecord, RecordExtractor, Result};
use crate::error::ExtractionError;
use crate::models::ExtractionConfig;
use crate::report::Dataset;

/// Turns each report row into a full-row upsert record.
pub struct ReportReader {
    fee_keywords: Vec<String>,
}

impl ReportReader {
    pub fn new() -> Self {
        Self {
            fee_keywords: vec!["fee".to_string(), "proc".to_string()],
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new().with_fee_keywords(config.report_fee_keywords.clone())
    }

    /// Set the header substrings that mark fee columns.
    pub fn with_fee_keywords(mut self, keywords: Vec<String>) -> Self {
        self.fee_keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
        self
    }

    /// Index of the `CaseID` column (whitespace and case ignored).
    pub fn identifier_column(&self, headers: &[String]) -> Option<usize> {
        headers.iter().position(|h| normalize_header(h) == "caseid")
    }

    /// Headers that accumulate as fees.
    pub fn fee_columns(&self, headers: &[String]) -> BTreeSet<String> {
        headers
            .iter()
            .filter(|h| {
                let lower = h.to_lowercase();
                self.fee_keywords.iter().any(|k| lower.contains(k.as_str()))
            })
            .cloned()
            .collect()
    }
}

impl Default for ReportReader {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordExtractor for ReportReader {
    type Input = Dataset;

    /// Fails with [`ExtractionError::SchemaMismatch`] when the report has no
    /// identifier column, since no row could be matched to a case.
    fn extract(&self, dataset: &Dataset, source: &str) -> Result<Vec<ExtractionRecord>> {
        let id_index = self.identifier_column(&dataset.headers).ok_or_else(|| {
            ExtractionError::SchemaMismatch {
                role: "CaseID".to_string(),
                source_name: source.to_string(),
            }
        })?;

        let fee_fields = self.fee_columns(&dataset.headers);
        info!("Found {} cases in introducer report {}", dataset.len(), source);
        debug!("Fee columns in {}: {:?}", source, fee_fields);

        let mut records = Vec::with_capacity(dataset.len());

        for (row_index, row) in dataset.rows.iter().enumerate() {
            let case_id = dataset.cell(row_index, id_index).to_string();
            if is_blank_identifier(&case_id) {
                debug!("Skipping report row {} without case id", row_index + 1);
                continue;
            }

            let fields = dataset
                .headers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != id_index)
                .map(|(i, header)| (header.clone(), row.get(i).cloned().unwrap_or_default()))
                .collect();

            records.push(ExtractionRecord::report(case_id, fields, fee_fields.clone(), source));
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::RecordPayload;
    use crate::models::Value;
    use pretty_assertions::assert_eq;

    fn dataset(csv: &str) -> Dataset {
        Dataset::from_csv(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_extract_rows() {
        let data = dataset(
            "Priority,Case ID,Status,Admin Fee,Proc Amount\n\
             High,100234,Open,20.00,\n\
             ,nan,Open,1,\n\
             Low,100235,Complete,,5\n",
        );

        let records = ReportReader::new().extract(&data, "introducer.csv").unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.case_id, "100234");
        match &first.payload {
            RecordPayload::Report { fields, fee_fields } => {
                let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["Priority", "Status", "Admin Fee", "Proc Amount"]);
                assert_eq!(fields[1].1, Value::Text("Open".to_string()));
                assert_eq!(fields[3].1, Value::Empty);
                assert_eq!(
                    fee_fields.iter().map(String::as_str).collect::<Vec<_>>(),
                    vec!["Admin Fee", "Proc Amount"]
                );
            }
            other => panic!("unexpected payload {:?}", other),
        }

        assert_eq!(records[1].case_id, "100235");
    }

    #[test]
    fn test_missing_identifier_column() {
        let data = dataset("Name,Status\nJ Smith,Open\n");
        let err = ReportReader::new().extract(&data, "leads.csv").unwrap_err();
        assert!(matches!(err, ExtractionError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_identifier_column_matching() {
        let reader = ReportReader::new();
        let headers = |h: &[&str]| h.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(reader.identifier_column(&headers(&["Status", "CASEID"])), Some(1));
        assert_eq!(reader.identifier_column(&headers(&["case id"])), Some(0));
        assert_eq!(reader.identifier_column(&headers(&["Case ID Ref"])), None);
    }
}
