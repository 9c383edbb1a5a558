//! Rule-based building blocks for record extraction.

pub mod amounts;
pub mod category;
pub mod patterns;
pub mod schema;

pub use amounts::{format_amount, normalize_amount, parse_amount};
pub use category::{CategoryClassifier, CategoryRule};
pub use schema::{ColumnRole, DetectionPolicy, DetectionRule, HeaderPredicate, SchemaMatch, normalize_header};

/// Names containing any of these are fee-like ledger fields.
const FEE_LIKE_KEYWORDS: [&str; 4] = ["fee", "proc", "payment", "paid"];

/// Whether a ledger field name denotes a monetary accumulator.
pub fn is_fee_like(name: &str) -> bool {
    let lower = name.to_lowercase();
    FEE_LIKE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Whether an identifier cell is empty or a stringified missing value.
pub fn is_blank_identifier(id: &str) -> bool {
    let id = id.trim();
    id.is_empty() || id.eq_ignore_ascii_case("nan")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_fee_like() {
        assert!(is_fee_like("Proc Fee"));
        assert!(is_fee_like("AdminFee"));
        assert!(is_fee_like("Packaging Fee Payment"));
        assert!(is_fee_like("Amount Paid"));
        assert!(is_fee_like("PROCURATION"));
        assert!(!is_fee_like("Status"));
        assert!(!is_fee_like("Commission"));
    }

    #[test]
    fn test_is_blank_identifier() {
        assert!(is_blank_identifier(""));
        assert!(is_blank_identifier("  "));
        assert!(is_blank_identifier("nan"));
        assert!(is_blank_identifier("NaN"));
        assert!(!is_blank_identifier("100234"));
    }
}
