//! Table detection in plain page text.
//!
//! Used for pages without positioned text. Column gaps survive in such text
//! only as runs of spaces or tabs. A table is a run of consecutive lines that
//! each split into two or more cells; the first line of the run is its header.

use super::RawTable;
use crate::extract::rules::patterns::CELL_SEPARATOR;

/// Split a text line into cells on tabs or runs of two or more spaces.
pub fn split_cells(line: &str) -> Vec<String> {
    CELL_SEPARATOR
        .split(line.trim())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Find all tables in a page of text.
pub fn detect_text_tables(text: &str) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        let cells = split_cells(line);
        if cells.len() >= 2 {
            current.push(cells);
        } else {
            flush(&mut current, &mut tables);
        }
    }
    flush(&mut current, &mut tables);

    tables
}

fn flush(current: &mut Vec<Vec<String>>, tables: &mut Vec<RawTable>) {
    // A header without data rows is not a table
    if current.len() >= 2 {
        tables.push(RawTable::new(std::mem::take(current)));
    } else {
        current.clear();
    }
}
