//! Spreadsheet decoding for introducer reports (CSV and Excel workbooks).

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use tracing::debug;

use crate::error::ReportError;
use crate::models::Value;

/// Result type for report decoding.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Spreadsheet container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Comma-separated text.
    Csv,
    /// Excel or OpenDocument workbook.
    Workbook,
}

impl ReportFormat {
    /// Determine the format from a filename extension.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(ReportFormat::Workbook),
            _ => Err(ReportError::UnsupportedFormat(filename.to_string())),
        }
    }
}

/// A decoded tabular dataset: ordered named columns and ordered rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    /// Decode bytes according to the filename's extension.
    pub fn decode(data: &[u8], filename: &str) -> Result<Self> {
        match ReportFormat::from_filename(filename)? {
            ReportFormat::Csv => Self::from_csv(data),
            ReportFormat::Workbook => Self::from_workbook(data),
        }
    }

    /// Decode CSV bytes. All cells are read as text.
    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(Value::from_cell).collect());
        }

        debug!("Decoded CSV report: {} columns, {} rows", headers.len(), rows.len());
        Ok(Self::new(headers, rows))
    }

    /// Decode the first worksheet of a workbook.
    pub fn from_workbook(data: &[u8]) -> Result<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))
            .map_err(|e| ReportError::Workbook(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or(ReportError::NoSheets)?
            .map_err(|e| ReportError::Workbook(e.to_string()))?;

        let mut rows_iter = range.rows();
        let headers: Vec<String> = match rows_iter.next() {
            Some(row) => row.iter().map(|c| cell_to_value(c).to_string()).collect(),
            None => return Ok(Self::default()),
        };

        let rows: Vec<Vec<Value>> = rows_iter
            .map(|row| row.iter().map(cell_to_value).collect())
            .collect();

        debug!("Decoded workbook report: {} columns, {} rows", headers.len(), rows.len());
        Ok(Self::new(headers, rows))
    }

    /// Cell at a row/column, treating short rows as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        const EMPTY: &Value = &Value::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(EMPTY)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Convert a workbook cell, keeping numbers numeric.
///
/// Whole floats (Excel stores `100234` as `100234.0`) lose their fraction so
/// identifiers stringify cleanly.
pub fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::from_cell(s),
        Data::Int(n) => Value::Number(Decimal::from(*n)),
        Data::Float(f) => match Decimal::from_f64(*f) {
            Some(n) => Value::Number(n.normalize()),
            None => Value::from_cell(&f.to_string()),
        },
        other => Value::from_cell(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(ReportFormat::from_filename("introducer_report.CSV").unwrap(), ReportFormat::Csv);
        assert_eq!(ReportFormat::from_filename("report.xlsx").unwrap(), ReportFormat::Workbook);
        assert!(matches!(
            ReportFormat::from_filename("report.txt"),
            Err(ReportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_from_csv() {
        let data = b" CaseID ,Status,Admin Fee\n100234,Open,20.00\n100235,,\n";
        let dataset = Dataset::from_csv(data).unwrap();

        assert_eq!(dataset.headers, vec!["CaseID", "Status", "Admin Fee"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.cell(0, 1), &Value::Text("Open".to_string()));
        assert_eq!(dataset.cell(1, 1), &Value::Empty);
        assert_eq!(dataset.cell(5, 0), &Value::Empty);
    }

    #[test]
    fn test_flexible_rows() {
        let data = b"CaseID,Status\n100234\n100235,Open,extra\n";
        let dataset = Dataset::from_csv(data).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.cell(0, 1), &Value::Empty);
    }

    #[test]
    fn test_cell_to_value() {
        assert_eq!(cell_to_value(&Data::Float(100234.0)).to_string(), "100234");
        assert_eq!(cell_to_value(&Data::Float(20.5)), Value::Number(Decimal::new(205, 1)));
        assert_eq!(cell_to_value(&Data::Int(7)), Value::Number(Decimal::from(7)));
        assert_eq!(cell_to_value(&Data::String(" Open ".to_string())), Value::Text("Open".to_string()));
        assert_eq!(cell_to_value(&Data::Empty), Value::Empty);
    }

    #[test]
    fn test_garbage_workbook_fails() {
        assert!(Dataset::from_workbook(b"definitely not a zip").is_err());
    }
}
