//! Monetary amount normalization.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::AMOUNT_NOISE;

/// Parse a free-form monetary token, returning `None` when nothing numeric is left.
///
/// Currency symbols, thousands separators and whitespace are stripped first,
/// so `" £ 1,234.56 "` parses as `1234.56`.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned = AMOUNT_NOISE.replace_all(s, "");
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Normalize a monetary token to a number. Malformed input yields zero.
///
/// Callers treat anything `<= 0` as "no payment".
pub fn normalize_amount(s: &str) -> Decimal {
    parse_amount(s).unwrap_or(Decimal::ZERO)
}

/// Format an amount with a currency symbol and thousands separators (£1,234.56).
pub fn format_amount(amount: Decimal, symbol: &str) -> String {
    let s = format!("{:.2}", amount.round_dp(2).abs());
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(*c);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{}{}{}.{}", sign, symbol, formatted, decimal_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_amount() {
        let expected = Decimal::from_str("1234.56").unwrap();
        assert_eq!(normalize_amount("£1,234.56"), expected);
        assert_eq!(normalize_amount("1234.56"), expected);
        assert_eq!(normalize_amount(" £ 1,234.56 "), expected);
        assert_eq!(normalize_amount("Â£1,234.56"), expected);
    }

    #[test]
    fn test_normalize_malformed_is_zero() {
        assert_eq!(normalize_amount(""), Decimal::ZERO);
        assert_eq!(normalize_amount("N/A"), Decimal::ZERO);
        assert_eq!(normalize_amount("£"), Decimal::ZERO);
        assert_eq!(normalize_amount("12.3.4"), Decimal::ZERO);
    }

    #[test]
    fn test_parse_amount_keeps_sign() {
        assert_eq!(parse_amount("-5.00"), Some(Decimal::new(-500, 2)));
        assert_eq!(parse_amount("  "), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::from_str("1234.56").unwrap(), "£"), "£1,234.56");
        assert_eq!(format_amount(Decimal::from_str("12345678.9").unwrap(), "£"), "£12,345,678.90");
        assert_eq!(format_amount(Decimal::ZERO, "£"), "£0.00");
        assert_eq!(format_amount(Decimal::new(-2050, 2), "$"), "-$20.50");
    }
}
