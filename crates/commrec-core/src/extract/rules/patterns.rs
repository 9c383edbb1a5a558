//! Common regex patterns for statement and report extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Characters stripped before parsing an amount. `Â` is what a UTF-8 `£`
    // turns into after a Latin-1 round trip.
    pub static ref AMOUNT_NOISE: Regex = Regex::new(
        r"[£Â$€,\s]"
    ).unwrap();

    // A run of exactly 6 or 7 digits, letters allowed on either side
    pub static ref CASE_ID_TOKEN: Regex = Regex::new(
        r"(?:^|\D)(\d{6,7})(?:\D|$)"
    ).unwrap();

    // Currency symbol followed by a comma-grouped or plain decimal
    pub static ref MONEY_TOKEN: Regex = Regex::new(
        r"[£$€]\s?(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)"
    ).unwrap();

    // Cell separator in text-rendered tables: a tab or two or more spaces
    pub static ref CELL_SEPARATOR: Regex = Regex::new(
        r"\t+|\s{2,}"
    ).unwrap();

    pub static ref DIGITS_ONLY: Regex = Regex::new(
        r"^\d+$"
    ).unwrap();
}
