//! Ledger merge engine: applies extraction records to the ledger.
//!
//! Fee-style records always accumulate into their category column. Report
//! rows insert whole cases, or update existing ones field by field: fee
//! columns accumulate, ordinary columns are overwritten when the value
//! changed.
//!
//! The read-modify-write accumulation is not atomic; the engine assumes a
//! single owner for the length of a run.

use std::collections::{BTreeSet, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, trace};

use super::Ledger;
use crate::extract::rules::{format_amount, is_blank_identifier};
use crate::extract::{ExtractionRecord, RecordPayload};
use crate::models::{LedgerConfig, Value};

/// Case identifiers touched during a run, in touch order, duplicates kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    ids: Vec<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, case_id: impl Into<String>) {
        self.ids.push(case_id.into());
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// How many times a case was touched.
    pub fn count(&self, case_id: &str) -> usize {
        self.ids.iter().filter(|id| *id == case_id).count()
    }

    pub fn contains(&self, case_id: &str) -> bool {
        self.ids.iter().any(|id| id == case_id)
    }

    /// Distinct identifiers in order of first touch.
    pub fn unique(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }
}

/// What applying one record did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// A new case row was added.
    Inserted,
    /// An existing case had these fields written.
    Updated { fields: Vec<String> },
    /// The case exists and nothing differed.
    Unchanged,
    /// The record failed validation and was not applied.
    Rejected { reason: String },
}

impl MergeOutcome {
    /// Whether the ledger was modified.
    pub fn is_change(&self) -> bool {
        matches!(self, MergeOutcome::Inserted | MergeOutcome::Updated { .. })
    }

    fn rejected(reason: impl Into<String>) -> Self {
        MergeOutcome::Rejected { reason: reason.into() }
    }
}

/// Owns the ledger for one run and applies records to it.
pub struct MergeEngine {
    ledger: Ledger,
    changes: ChangeSet,
    notable_fields: Vec<String>,
    currency_symbol: String,
}

impl MergeEngine {
    /// Create an engine over an existing ledger.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            changes: ChangeSet::new(),
            notable_fields: LedgerConfig::default()
                .notable_fields
                .iter()
                .map(|f| notable_key(f))
                .collect(),
            currency_symbol: "£".to_string(),
        }
    }

    /// Create an engine configured from ledger settings.
    pub fn from_config(ledger: Ledger, config: &LedgerConfig) -> Self {
        Self::new(ledger)
            .with_notable_fields(&config.notable_fields)
            .with_currency_symbol(config.currency_symbol.clone())
    }

    /// Set the ordinary fields whose changes are logged at info level.
    pub fn with_notable_fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.notable_fields = fields.iter().map(|f| notable_key(f.as_ref())).collect();
        self
    }

    /// Set the currency symbol used in log messages.
    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Sum of all fee-like columns in the current ledger.
    pub fn total_fees(&self) -> Decimal {
        self.ledger.total_fees()
    }

    /// Release the ledger and change set at the end of a run.
    pub fn into_parts(self) -> (Ledger, ChangeSet) {
        (self.ledger, self.changes)
    }

    /// Apply a record of either kind.
    pub fn apply(&mut self, record: &ExtractionRecord) -> MergeOutcome {
        let outcome = match &record.payload {
            RecordPayload::Fee { category, amount } => {
                self.apply_fee(&record.case_id, category, *amount)
            }
            RecordPayload::Report { fields, fee_fields } => {
                self.apply_report(&record.case_id, fields, fee_fields)
            }
        };

        if let MergeOutcome::Rejected { reason } = &outcome {
            trace!("Record for {:?} from {} rejected: {}", record.case_id, record.source, reason);
        }
        outcome
    }

    /// Add `amount` to the case's `category` field, inserting the case if new.
    pub fn apply_fee(&mut self, case_id: &str, category: &str, amount: Decimal) -> MergeOutcome {
        let case_id = case_id.trim();
        let category = category.trim();

        if is_blank_identifier(case_id) {
            return MergeOutcome::rejected("missing case id");
        }
        if category.is_empty() || category == self.ledger.id_column() {
            return MergeOutcome::rejected("missing payment category");
        }
        if amount <= Decimal::ZERO {
            return MergeOutcome::rejected("no payment");
        }

        if self.ledger.add_column(category, Value::Number(Decimal::ZERO)) {
            info!("Creating new column: {}", category);
        }

        match self.ledger.position(case_id) {
            Some(row) => {
                let current = self
                    .ledger
                    .value_at(row, category)
                    .map(Value::amount)
                    .unwrap_or(Decimal::ZERO);
                let new_value = current + amount;
                self.ledger.set(row, category, Value::Number(new_value));

                info!(
                    "Updated Case {}: {} = {}",
                    case_id,
                    category,
                    format_amount(new_value, &self.currency_symbol)
                );
                self.changes.push(case_id);
                MergeOutcome::Updated {
                    fields: vec![category.to_string()],
                }
            }
            None => {
                info!("Creating new case entry: {}", case_id);
                self.ledger
                    .insert(case_id, [(category.to_string(), Value::Number(amount))]);
                self.changes.push(case_id);
                MergeOutcome::Inserted
            }
        }
    }

    /// Upsert a report row.
    ///
    /// Fields listed in `fee_fields` accumulate their normalized amount; all
    /// other fields are overwritten when their text differs. Empty incoming
    /// values are not observations and never overwrite.
    pub fn apply_report(
        &mut self,
        case_id: &str,
        fields: &[(String, Value)],
        fee_fields: &BTreeSet<String>,
    ) -> MergeOutcome {
        let case_id = case_id.trim();
        if is_blank_identifier(case_id) {
            return MergeOutcome::rejected("missing case id");
        }

        let id_column = self.ledger.id_column().to_string();
        let fields = fields.iter().filter(|(name, _)| *name != id_column);

        match self.ledger.position(case_id) {
            None => {
                let mut row = Vec::new();
                for (name, value) in fields {
                    if fee_fields.contains(name) {
                        if self.ledger.add_column(name, Value::Number(Decimal::ZERO)) {
                            info!("Creating new column: {}", name);
                        }
                        row.push((name.clone(), Value::Number(value.amount().max(Decimal::ZERO))));
                    } else {
                        if self.ledger.add_column(name, Value::Empty) {
                            info!("Creating new column: {}", name);
                        }
                        row.push((name.clone(), value.clone()));
                    }
                }

                info!("Adding new case: {}", case_id);
                self.ledger.insert(case_id, row);
                self.changes.push(case_id);
                MergeOutcome::Inserted
            }
            Some(index) => {
                let mut changed = Vec::new();

                for (name, value) in fields {
                    if fee_fields.contains(name) {
                        let amount = value.amount();
                        if amount <= Decimal::ZERO {
                            continue;
                        }
                        if self.ledger.add_column(name, Value::Number(Decimal::ZERO)) {
                            info!("Creating new column: {}", name);
                        }
                        let current = self
                            .ledger
                            .value_at(index, name)
                            .map(Value::amount)
                            .unwrap_or(Decimal::ZERO);
                        let new_value = current + amount;
                        self.ledger.set(index, name, Value::Number(new_value));

                        info!(
                            "Updated Case {}: {} = {}",
                            case_id,
                            name,
                            format_amount(new_value, &self.currency_symbol)
                        );
                        changed.push(name.clone());
                    } else {
                        if self.ledger.add_column(name, Value::Empty) {
                            info!("Creating new column: {}", name);
                        }
                        let current = self
                            .ledger
                            .value_at(index, name)
                            .map(Value::to_string)
                            .unwrap_or_default();
                        let incoming = value.to_string();
                        if current == incoming {
                            continue;
                        }

                        if self.is_notable(name) {
                            info!("Updated Case {}: {} {} → {}", case_id, name, current, incoming);
                        } else {
                            debug!("Updated Case {}: {} {:?} → {:?}", case_id, name, current, incoming);
                        }
                        self.ledger.set(index, name, value.clone());
                        changed.push(name.clone());
                    }
                }

                if changed.is_empty() {
                    MergeOutcome::Unchanged
                } else {
                    self.changes.push(case_id);
                    MergeOutcome::Updated { fields: changed }
                }
            }
        }
    }

    fn is_notable(&self, field: &str) -> bool {
        let key = notable_key(field);
        self.notable_fields.iter().any(|f| *f == key)
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        let config = LedgerConfig::default();
        Self::from_config(Ledger::new(config.id_column.clone()), &config)
    }
}

/// Comparison key for notable field names: lowercase alphanumerics only, so
/// `Last Action`, `last-action` and `LastAction` coincide.
fn notable_key(field: &str) -> String {
    field
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, Value)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    fn fee_set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_repeated_fee_accumulates() {
        let mut engine = MergeEngine::default();
        let record = ExtractionRecord::fee("100234", "Proc Fee", dec("50.00"), "a.pdf");

        assert_eq!(engine.apply(&record), MergeOutcome::Inserted);
        assert_eq!(
            engine.apply(&record),
            MergeOutcome::Updated { fields: vec!["Proc Fee".to_string()] }
        );

        let ledger = engine.ledger();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.value("100234", "Proc Fee"), Some(&Value::Number(dec("100.00"))));
        assert_eq!(engine.changes().as_slice(), ["100234", "100234"]);
    }

    #[test]
    fn test_new_case_leaves_others_untouched() {
        let mut engine = MergeEngine::default();
        engine.apply_fee("100", "Commission", dec("10"));
        engine.apply_fee("200", "Commission", dec("20"));
        let before = engine.ledger().get("100").cloned();

        let outcome = engine.apply_fee("300", "Broker Fee", dec("5"));
        assert_eq!(outcome, MergeOutcome::Inserted);

        let ledger = engine.ledger();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.value("100", "Commission"), before.as_ref().and_then(|r| r.get("Commission")));
        assert_eq!(ledger.value("100", "Broker Fee"), Some(&Value::Number(Decimal::ZERO)));
        assert_eq!(ledger.value("300", "Commission"), Some(&Value::Number(Decimal::ZERO)));
        assert_eq!(engine.changes().as_slice(), ["100", "200", "300"]);
    }

    #[test]
    fn test_fee_rejections() {
        let mut engine = MergeEngine::default();
        assert!(matches!(engine.apply_fee("nan", "Proc Fee", dec("5")), MergeOutcome::Rejected { .. }));
        assert!(matches!(engine.apply_fee("100", " ", dec("5")), MergeOutcome::Rejected { .. }));
        assert!(matches!(engine.apply_fee("100", "Proc Fee", dec("0")), MergeOutcome::Rejected { .. }));
        assert!(matches!(engine.apply_fee("100", "Proc Fee", dec("-3")), MergeOutcome::Rejected { .. }));
        assert!(engine.ledger().is_empty());
        assert!(engine.changes().is_empty());
    }

    #[test]
    fn test_fee_on_text_value_reads_amount() {
        let mut ledger = Ledger::new("CaseID");
        ledger.insert("100", fields(&[("Commission", "£40.00")]));
        let mut engine = MergeEngine::new(ledger);

        engine.apply_fee("100", "Commission", dec("10"));
        assert_eq!(engine.ledger().value("100", "Commission"), Some(&Value::Number(dec("50"))));
    }

    #[test]
    fn test_report_overwrite_vs_accumulate() {
        let mut ledger = Ledger::new("CaseID");
        ledger.add_column("AdminFee", Value::Number(Decimal::ZERO));
        ledger.insert(
            "100234",
            vec![
                ("AdminFee".to_string(), Value::Number(dec("20.00"))),
                ("Status".to_string(), Value::from("Open")),
            ],
        );
        let mut engine = MergeEngine::new(ledger);

        let outcome = engine.apply_report(
            "100234",
            &fields(&[("AdminFee", "5.00"), ("Status", "Complete")]),
            &fee_set(&["AdminFee"]),
        );

        assert_eq!(
            outcome,
            MergeOutcome::Updated { fields: vec!["AdminFee".to_string(), "Status".to_string()] }
        );
        let ledger = engine.ledger();
        assert_eq!(ledger.value("100234", "AdminFee"), Some(&Value::Number(dec("25.00"))));
        assert_eq!(ledger.value("100234", "Status"), Some(&Value::from("Complete")));
        assert_eq!(engine.changes().count("100234"), 1);
    }

    #[test]
    fn test_report_unchanged_row_not_recorded() {
        let mut engine = MergeEngine::default();
        let row = fields(&[("Status", "Open"), ("Admin Fee", "")]);
        let fees = fee_set(&["Admin Fee"]);

        assert_eq!(engine.apply_report("100", &row, &fees), MergeOutcome::Inserted);
        assert_eq!(engine.apply_report("100", &row, &fees), MergeOutcome::Unchanged);
        assert_eq!(engine.changes().as_slice(), ["100"]);
    }

    #[test]
    fn test_report_insert_creates_columns() {
        let mut engine = MergeEngine::default();
        engine.apply_fee("100", "Proc Fee", dec("50"));

        let outcome = engine.apply_report(
            "200",
            &fields(&[("Status", "Open"), ("Admin Fee", "£12.50"), ("CaseID", "999")]),
            &fee_set(&["Admin Fee"]),
        );
        assert_eq!(outcome, MergeOutcome::Inserted);

        let ledger = engine.ledger();
        assert_eq!(ledger.header(), vec!["CaseID", "Proc Fee", "Status", "Admin Fee"]);
        assert_eq!(ledger.value("200", "Admin Fee"), Some(&Value::Number(dec("12.50"))));
        assert_eq!(ledger.value("200", "Proc Fee"), Some(&Value::Number(Decimal::ZERO)));
        assert_eq!(ledger.value("100", "Status"), Some(&Value::Empty));
        assert_eq!(ledger.value("100", "Admin Fee"), Some(&Value::Number(Decimal::ZERO)));
        assert!(ledger.get("999").is_none());
    }

    #[test]
    fn test_report_cleared_value_overwrites() {
        let mut engine = MergeEngine::default();
        engine.apply_report("100", &fields(&[("Advisor", "Kim")]), &BTreeSet::new());
        let outcome = engine.apply_report("100", &fields(&[("Advisor", "")]), &BTreeSet::new());

        assert_eq!(outcome, MergeOutcome::Updated { fields: vec!["Advisor".to_string()] });
        assert_eq!(engine.ledger().value("100", "Advisor"), Some(&Value::Empty));
        assert_eq!(engine.changes().as_slice(), ["100", "100"]);

        let outcome = engine.apply_report("100", &fields(&[("Advisor", "")]), &BTreeSet::new());
        assert_eq!(outcome, MergeOutcome::Unchanged);
    }

    #[test]
    fn test_numeric_and_text_compare_by_string() {
        let mut engine = MergeEngine::default();
        engine.apply_report(
            "100",
            &[("Priority".to_string(), Value::Number(Decimal::from(2)))],
            &BTreeSet::new(),
        );
        let outcome = engine.apply_report("100", &fields(&[("Priority", "2")]), &BTreeSet::new());
        assert_eq!(outcome, MergeOutcome::Unchanged);
    }

    #[test]
    fn test_change_set_unique() {
        let mut changes = ChangeSet::new();
        for id in ["3", "1", "3", "2", "1"] {
            changes.push(id);
        }
        assert_eq!(changes.len(), 5);
        assert_eq!(changes.unique(), vec!["3", "1", "2"]);
        assert!(changes.contains("2"));
        assert!(!changes.contains("4"));
    }

    #[test]
    fn test_notable_key() {
        assert_eq!(notable_key("Last Action"), "lastaction");
        assert_eq!(notable_key("last-action"), "lastaction");
        let engine = MergeEngine::default();
        assert!(engine.is_notable("STATUS"));
        assert!(!engine.is_notable("Advisor"));
    }
}
