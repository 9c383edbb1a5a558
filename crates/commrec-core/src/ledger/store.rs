//! Ledger persistence as CSV or Excel workbook.

use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::Workbook;
use tracing::{debug, info, warn};

use super::Ledger;
use crate::error::{ReportError, StoreError};
use crate::extract::rules::{is_blank_identifier, is_fee_like, normalize_header, parse_amount};
use crate::models::Value;
use crate::report::Dataset;

/// Result type for ledger persistence.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LedgerFormat {
    Csv,
    Xlsx,
}

impl LedgerFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "csv" => Ok(LedgerFormat::Csv),
            "xlsx" => Ok(LedgerFormat::Xlsx),
            _ => Err(StoreError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

impl From<ReportError> for StoreError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Csv(e) => StoreError::Csv(e),
            other => StoreError::Workbook(other.to_string()),
        }
    }
}

/// Load a ledger, keyed by `id_column`.
///
/// A missing file yields an empty ledger. The identifier header is matched
/// ignoring case and whitespace and renamed to `id_column`. Fee-like columns
/// whose cells all read as amounts are loaded as numbers; everything else
/// stays text.
pub fn load_ledger(path: &Path, id_column: &str) -> Result<Ledger> {
    if !path.exists() {
        info!("No ledger at {}, starting empty", path.display());
        return Ok(Ledger::new(id_column));
    }

    let format = LedgerFormat::from_path(path)?;
    let data = std::fs::read(path)?;
    let dataset = match format {
        LedgerFormat::Csv => Dataset::from_csv(&data)?,
        LedgerFormat::Xlsx => Dataset::from_workbook(&data)?,
    };

    let ledger = ledger_from_dataset(dataset, id_column)?;
    info!(
        "Loaded ledger {} with {} cases and {} columns",
        path.display(),
        ledger.len(),
        ledger.columns().len()
    );
    Ok(ledger)
}

fn ledger_from_dataset(dataset: Dataset, id_column: &str) -> Result<Ledger> {
    let mut ledger = Ledger::new(id_column);
    let wanted = normalize_header(id_column);
    let id_index = dataset.headers.iter().position(|h| normalize_header(h) == wanted);

    if id_index.is_none() {
        warn!("Ledger has no {} column, creating it", id_column);
    }

    let numeric: Vec<bool> = dataset
        .headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            Some(col) != id_index
                && is_fee_like(header)
                && dataset.rows.iter().all(|row| match row.get(col) {
                    None | Some(Value::Empty) | Some(Value::Number(_)) => true,
                    Some(Value::Text(s)) => parse_amount(s).is_some(),
                })
        })
        .collect();

    for (col, header) in dataset.headers.iter().enumerate() {
        if Some(col) == id_index {
            continue;
        }
        let default = if numeric[col] {
            Value::Number(Decimal::ZERO)
        } else {
            Value::Empty
        };
        ledger.add_column(header, default);
    }

    for (row_index, row) in dataset.rows.iter().enumerate() {
        let case_id = id_index
            .map(|i| dataset.cell(row_index, i).to_string())
            .unwrap_or_default();

        if is_blank_identifier(&case_id) {
            warn!("Dropping ledger row {} without a case id", row_index + 1);
            continue;
        }

        let fields: Vec<(String, Value)> = dataset
            .headers
            .iter()
            .enumerate()
            .filter(|(col, _)| Some(*col) != id_index)
            .map(|(col, header)| {
                let cell = row.get(col).cloned().unwrap_or_default();
                let value = if numeric[col] {
                    Value::Number(cell.amount())
                } else {
                    cell
                };
                (header.clone(), value)
            })
            .collect();

        if ledger.insert(&case_id, fields).is_none() {
            return Err(StoreError::DuplicateCase(case_id));
        }
    }

    Ok(ledger)
}

/// Persist a ledger, choosing the format from the path's extension.
pub fn save_ledger(ledger: &Ledger, path: &Path) -> Result<()> {
    match LedgerFormat::from_path(path)? {
        LedgerFormat::Csv => save_csv(ledger, path)?,
        LedgerFormat::Xlsx => save_xlsx(ledger, path)?,
    }
    info!("Saved ledger with {} cases to {}", ledger.len(), path.display());
    Ok(())
}

fn save_csv(ledger: &Ledger, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(ledger.header())?;
    for row in ledger.rows() {
        writer.write_record(ledger.row_strings(row))?;
    }
    writer.flush()?;
    Ok(())
}

fn save_xlsx(ledger: &Ledger, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in ledger.header().into_iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }

    for (index, row) in ledger.rows().iter().enumerate() {
        let row_number = index as u32 + 1;
        worksheet.write_string(row_number, 0, row.case_id())?;

        for (offset, column) in ledger.columns().iter().enumerate() {
            let col = offset as u16 + 1;
            match row.get(&column.name) {
                Some(Value::Number(n)) => match n.to_f64() {
                    Some(f) => {
                        worksheet.write_number(row_number, col, f)?;
                    }
                    None => {
                        worksheet.write_string(row_number, col, n.to_string())?;
                    }
                },
                Some(Value::Text(s)) => {
                    worksheet.write_string(row_number, col, s)?;
                }
                Some(Value::Empty) | None => {}
            }
        }
    }

    debug!("Writing workbook {}", path.display());
    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use tempfile::tempdir;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let dir = tempdir().unwrap();
        let ledger = load_ledger(&dir.path().join("master_data.csv"), "CaseID").unwrap();
        assert!(ledger.is_empty());
        assert_eq!(ledger.header(), vec!["CaseID"]);
    }

    #[test]
    fn test_load_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master_data.csv");
        std::fs::write(
            &path,
            "Case ID,Status,Proc Fee,Payment Type,Ref\n\
             100234,Open,£50.00,Proc Fee,007\n\
             100235,,,Commission,\n",
        )
        .unwrap();

        let ledger = load_ledger(&path, "CaseID").unwrap();
        assert_eq!(ledger.header(), vec!["CaseID", "Status", "Proc Fee", "Payment Type", "Ref"]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.value("100234", "Proc Fee"), Some(&Value::Number(dec("50.00"))));
        assert_eq!(ledger.value("100235", "Proc Fee"), Some(&Value::Number(Decimal::ZERO)));
        assert_eq!(ledger.value("100234", "Payment Type"), Some(&Value::from("Proc Fee")));
        assert_eq!(ledger.value("100234", "Ref"), Some(&Value::from("007")));
        assert_eq!(ledger.value("100235", "Status"), Some(&Value::Empty));
    }

    #[test]
    fn test_load_without_identifier_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master_data.csv");
        std::fs::write(&path, "Status,Proc Fee\nOpen,5\n").unwrap();

        let ledger = load_ledger(&path, "CaseID").unwrap();
        assert!(ledger.is_empty());
        assert_eq!(ledger.header(), vec!["CaseID", "Status", "Proc Fee"]);
    }

    #[test]
    fn test_duplicate_case_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master_data.csv");
        std::fs::write(&path, "CaseID,Status\n100,Open\n100,Closed\n").unwrap();

        let err = load_ledger(&path, "CaseID").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCase(id) if id == "100"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{}").unwrap();

        assert!(matches!(load_ledger(&path, "CaseID"), Err(StoreError::UnsupportedFormat(_))));
        assert!(matches!(
            save_ledger(&Ledger::new("CaseID"), &path),
            Err(StoreError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_csv_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut ledger = Ledger::new("CaseID");
        ledger.add_column("Proc Fee", Value::Number(Decimal::ZERO));
        ledger.insert("100", vec![("Proc Fee".to_string(), Value::Number(dec("100.50")))]);
        ledger.insert("200", vec![("Status".to_string(), Value::from("Open"))]);

        save_ledger(&ledger, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "CaseID,Proc Fee,Status\n100,100.5,\n200,0,Open\n");

        let reloaded = load_ledger(&path, "CaseID").unwrap();
        assert_eq!(reloaded.value("100", "Proc Fee"), Some(&Value::Number(dec("100.50"))));
        assert_eq!(reloaded.value("200", "Status"), Some(&Value::from("Open")));
        assert_eq!(reloaded.total_fees(), dec("100.50"));
    }

    #[test]
    fn test_xlsx_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut ledger = Ledger::new("CaseID");
        ledger.insert(
            "100234",
            vec![
                ("Proc Fee".to_string(), Value::Number(dec("75.25"))),
                ("Status".to_string(), Value::from("Complete")),
            ],
        );
        save_ledger(&ledger, &path).unwrap();

        let reloaded = load_ledger(&path, "CaseID").unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.value("100234", "Proc Fee"), Some(&Value::Number(dec("75.25"))));
        assert_eq!(reloaded.value("100234", "Status"), Some(&Value::from("Complete")));
    }
}
