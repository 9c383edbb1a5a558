//! The case ledger: a rectangular table of case records with dynamic columns.

mod merge;
pub mod store;

pub use merge::{ChangeSet, MergeEngine, MergeOutcome};
pub use store::{load_ledger, save_ledger};

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::extract::rules::is_fee_like;
use crate::models::Value;

/// A ledger column and the value back-filled into rows that predate it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub default: Value,
}

impl Column {
    pub fn new(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            default,
        }
    }

    /// Column with the default implied by its name: zero for fee-like
    /// columns, empty otherwise.
    pub fn inferred(name: impl Into<String>) -> Self {
        let name = name.into();
        let default = if is_fee_like(&name) {
            Value::Number(Decimal::ZERO)
        } else {
            Value::Empty
        };
        Self { name, default }
    }
}

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    case_id: String,
    fields: HashMap<String, Value>,
}

impl CaseRecord {
    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// The authoritative table of case records.
///
/// Every row holds a value for every column, and no two rows share a case
/// identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ledger {
    id_column: String,
    columns: Vec<Column>,
    rows: Vec<CaseRecord>,
}

impl Ledger {
    /// Create an empty ledger keyed by `id_column`.
    pub fn new(id_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Name of the case identifier column.
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Data columns in order, identifier excluded.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Add a column, back-filling every existing row with `default`.
    ///
    /// Returns `false` when the column already exists or names the identifier.
    pub fn add_column(&mut self, name: &str, default: Value) -> bool {
        if name == self.id_column || self.has_column(name) {
            return false;
        }
        for row in &mut self.rows {
            row.fields.insert(name.to_string(), default.clone());
        }
        self.columns.push(Column::new(name, default));
        true
    }

    pub fn rows(&self) -> &[CaseRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row index of a case. Linear scan, identifiers compared after trimming.
    pub fn position(&self, case_id: &str) -> Option<usize> {
        let case_id = case_id.trim();
        self.rows.iter().position(|r| r.case_id == case_id)
    }

    pub fn get(&self, case_id: &str) -> Option<&CaseRecord> {
        self.position(case_id).map(|i| &self.rows[i])
    }

    /// Field value of a case, if both exist.
    pub fn value(&self, case_id: &str, field: &str) -> Option<&Value> {
        self.get(case_id).and_then(|r| r.get(field))
    }

    /// Append a new case. Unknown fields get a column with an empty default;
    /// columns missing from `fields` take their default.
    ///
    /// Returns the new row index, or `None` if the case already exists.
    pub fn insert<I>(&mut self, case_id: &str, fields: I) -> Option<usize>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let case_id = case_id.trim();
        if self.position(case_id).is_some() {
            return None;
        }

        let mut values: HashMap<String, Value> = HashMap::with_capacity(self.columns.len());
        for (name, value) in fields {
            if name == self.id_column {
                continue;
            }
            if !self.has_column(&name) {
                self.add_column(&name, Value::Empty);
            }
            values.insert(name, value);
        }
        for column in &self.columns {
            values
                .entry(column.name.clone())
                .or_insert_with(|| column.default.clone());
        }

        self.rows.push(CaseRecord {
            case_id: case_id.to_string(),
            fields: values,
        });
        Some(self.rows.len() - 1)
    }

    /// Overwrite a field on an existing row, adding an empty-default column
    /// first if needed.
    pub fn set(&mut self, row: usize, field: &str, value: Value) {
        if field == self.id_column || row >= self.rows.len() {
            return;
        }
        if !self.has_column(field) {
            self.add_column(field, Value::Empty);
        }
        self.rows[row].fields.insert(field.to_string(), value);
    }

    /// Value at a row index.
    pub fn value_at(&self, row: usize, field: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(field))
    }

    /// Sum of every numeric value in fee-like columns.
    pub fn total_fees(&self) -> Decimal {
        self.columns
            .iter()
            .filter(|c| is_fee_like(&c.name))
            .map(|c| {
                self.rows
                    .iter()
                    .filter_map(|r| match r.get(&c.name) {
                        Some(Value::Number(n)) => Some(*n),
                        _ => None,
                    })
                    .sum::<Decimal>()
            })
            .sum()
    }

    /// Header row including the identifier column.
    pub fn header(&self) -> Vec<&str> {
        std::iter::once(self.id_column.as_str())
            .chain(self.columns.iter().map(|c| c.name.as_str()))
            .collect()
    }

    /// Row rendered as strings in header order.
    pub fn row_strings(&self, row: &CaseRecord) -> Vec<String> {
        std::iter::once(row.case_id.clone())
            .chain(
                self.columns
                    .iter()
                    .map(|c| row.get(&c.name).map(Value::to_string).unwrap_or_default()),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: i64) -> Value {
        Value::Number(Decimal::from(n))
    }

    #[test]
    fn test_add_column_backfills() {
        let mut ledger = Ledger::new("CaseID");
        ledger.insert("100", vec![("Status".to_string(), Value::from("Open"))]);
        ledger.insert("200", Vec::new());

        assert!(ledger.add_column("Proc Fee", num(0)));
        assert!(!ledger.add_column("Proc Fee", num(5)));
        assert!(!ledger.add_column("CaseID", Value::Empty));

        for row in ledger.rows() {
            assert_eq!(row.get("Proc Fee"), Some(&num(0)));
            assert!(row.get("Status").is_some());
        }
        assert_eq!(ledger.value("200", "Status"), Some(&Value::Empty));
    }

    #[test]
    fn test_insert_rejects_duplicates_and_trims() {
        let mut ledger = Ledger::new("CaseID");
        assert_eq!(ledger.insert(" 100 ", Vec::new()), Some(0));
        assert_eq!(ledger.insert("100", Vec::new()), None);
        assert_eq!(ledger.position("100 "), Some(0));
        assert_eq!(ledger.get("100").map(CaseRecord::case_id), Some("100"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_insert_ignores_identifier_field() {
        let mut ledger = Ledger::new("CaseID");
        ledger.insert("100", vec![("CaseID".to_string(), Value::from("999"))]);
        assert!(ledger.columns().is_empty());
        assert_eq!(ledger.header(), vec!["CaseID"]);
    }

    #[test]
    fn test_total_fees_counts_fee_like_numbers() {
        let mut ledger = Ledger::new("CaseID");
        ledger.add_column("Proc Fee", num(0));
        ledger.add_column("Commission", num(0));
        ledger.add_column("Payment Type", Value::Empty);
        ledger.insert("100", vec![("Proc Fee".to_string(), num(50)), ("Commission".to_string(), num(900))]);
        ledger.insert(
            "200",
            vec![("Proc Fee".to_string(), num(25)), ("Payment Type".to_string(), Value::from("Proc"))],
        );

        assert_eq!(ledger.total_fees(), Decimal::from(75));
    }

    #[test]
    fn test_row_strings() {
        let mut ledger = Ledger::new("CaseID");
        ledger.insert("100", vec![("Status".to_string(), Value::from("Open")), ("Proc Fee".to_string(), num(50))]);

        assert_eq!(ledger.header(), vec!["CaseID", "Status", "Proc Fee"]);
        assert_eq!(ledger.row_strings(&ledger.rows()[0]), vec!["100", "Open", "50"]);
    }
}
