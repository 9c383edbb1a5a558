//! Typed cell values shared by the ledger and decoded reports.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::extract::rules::amounts::normalize_amount;

/// A single field value in a ledger row or report cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric value (fee accumulators, numeric report cells).
    Number(Decimal),
    /// Free text (status, names, dates as written).
    Text(String),
    /// No value.
    Empty,
}

impl Value {
    /// Build a value from raw cell text. Blank cells become [`Value::Empty`].
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Value::Empty
        } else {
            Value::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Numeric reading of the value for accumulation.
    ///
    /// Text goes through the amount normalizer, so `"£20.00"` reads as 20 and
    /// anything unparseable reads as zero.
    pub fn amount(&self) -> Decimal {
        match self {
            Value::Number(n) => *n,
            Value::Text(s) => normalize_amount(s),
            Value::Empty => Decimal::ZERO,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Empty
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n.normalize()),
            Value::Text(s) => f.write_str(s),
            Value::Empty => Ok(()),
        }
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::from_cell(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::from_cell(&s)
    }
}
