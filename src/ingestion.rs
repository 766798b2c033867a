use crate::config::{ColumnNames, ReportConfig};
use crate::error::{Result, SalesReportError, SchemaError};
use crate::schema::{SalesWorkbook, Target, TargetTable, Transaction, TransactionTable};
use crate::utils::{excel_serial_to_date, parse_date_str};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::Cursor;

/// Result of a load that never fails: on error the tables are empty.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub workbook: SalesWorkbook,
    pub error: Option<SalesReportError>,
}

impl LoadOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub fn load_workbook(bytes: &[u8], config: &ReportConfig) -> Result<SalesWorkbook> {
    info!("Loading sales workbook ({} bytes)", bytes.len());

    let mut sheets = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let sheet_names = sheets.sheet_names();

    let find_sheet = |wanted: &str| {
        sheet_names
            .iter()
            .find(|name| name.trim().eq_ignore_ascii_case(wanted.trim()))
            .cloned()
    };

    let transactions_sheet = find_sheet(&config.sheets.transactions);
    let targets_sheet = find_sheet(&config.sheets.targets);

    let mut missing = Vec::new();
    if transactions_sheet.is_none() {
        missing.push(config.sheets.transactions.clone());
    }
    if targets_sheet.is_none() {
        missing.push(config.sheets.targets.clone());
    }
    let (Some(transactions_sheet), Some(targets_sheet)) = (transactions_sheet, targets_sheet) else {
        return Err(SchemaError::MissingSheets(missing).into());
    };

    let mut invalid_dates = 0;

    let range = sheets.worksheet_range(&transactions_sheet)?;
    let (transactions, bad) = read_transactions(&range, &transactions_sheet, &config.columns)?;
    invalid_dates += bad;

    let range = sheets.worksheet_range(&targets_sheet)?;
    let targets = read_targets(&range, &targets_sheet, &config.columns)?;

    let ytd = match find_sheet(&config.sheets.ytd) {
        Some(ytd_sheet) => {
            let range = sheets.worksheet_range(&ytd_sheet)?;
            let (rows, bad) = read_transactions(&range, &ytd_sheet, &config.columns)?;
            invalid_dates += bad;
            rows
        }
        None => {
            debug!("No '{}' sheet present, YTD table left empty", config.sheets.ytd);
            Vec::new()
        }
    };

    if invalid_dates > 0 {
        warn!(
            "{} row(s) had an unreadable billing date and were kept with a null date",
            invalid_dates
        );
    }

    info!(
        "Loaded {} transactions, {} targets, {} YTD rows",
        transactions.len(),
        targets.len(),
        ytd.len()
    );

    Ok(SalesWorkbook {
        transactions,
        targets,
        ytd,
        invalid_dates,
    })
}

/// Like [`load_workbook`], but hands back empty tables alongside the error
/// so the caller can report it and keep running.
pub fn load_workbook_or_empty(bytes: &[u8], config: &ReportConfig) -> LoadOutcome {
    match load_workbook(bytes, config) {
        Ok(workbook) => LoadOutcome {
            workbook,
            error: None,
        },
        Err(e) => {
            warn!("Workbook load failed: {}", e);
            LoadOutcome {
                workbook: SalesWorkbook::default(),
                error: Some(e),
            }
        }
    }
}

/// Maps each wanted column name to its position in the header row.
fn locate_columns(
    range: &Range<Data>,
    sheet: &str,
    wanted: &[&str],
) -> Result<HashMap<String, usize>> {
    let header: Vec<String> = range
        .rows()
        .next()
        .map(|row| row.iter().map(cell_to_string).collect())
        .unwrap_or_default();

    let mut positions = HashMap::new();
    let mut missing = Vec::new();
    for column in wanted {
        match header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(column.trim()))
        {
            Some(idx) => {
                positions.insert(column.to_string(), idx);
            }
            None => missing.push(column.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns {
            sheet: sheet.to_string(),
            columns: missing,
        }
        .into());
    }

    Ok(positions)
}

fn read_transactions(
    range: &Range<Data>,
    sheet: &str,
    columns: &ColumnNames,
) -> Result<(TransactionTable, usize)> {
    let positions = locate_columns(range, sheet, &columns.transaction_columns())?;
    let col = |name: &str| positions[name];

    let date_idx = col(&columns.billing_date);
    let salesman_idx = col(&columns.salesman);
    let value_idx = col(&columns.net_value);
    let type_idx = col(&columns.billing_type);
    let customer_idx = col(&columns.customer);
    let branch_idx = col(&columns.branch);

    let mut rows = Vec::new();
    let mut invalid_dates = 0;

    for (row_idx, row) in range.rows().enumerate().skip(1) {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        let cell = |idx: usize| row.get(idx).unwrap_or(&Data::Empty);

        let billing_date = cell_to_date(cell(date_idx));
        if billing_date.is_none() {
            invalid_dates += 1;
            debug!("{}: row {} has an unreadable billing date", sheet, row_idx + 1);
        }

        rows.push(Transaction {
            billing_date,
            salesman: cell_to_string(cell(salesman_idx)).trim().to_string(),
            net_value: cell_to_number(cell(value_idx), sheet, row_idx),
            billing_type: cell_to_string(cell(type_idx)).trim().to_uppercase(),
            customer: cell_to_string(cell(customer_idx)).trim().to_string(),
            branch: cell_to_string(cell(branch_idx)).trim().to_string(),
        });
    }

    debug!("{}: read {} transaction rows", sheet, rows.len());
    Ok((rows, invalid_dates))
}

fn read_targets(range: &Range<Data>, sheet: &str, columns: &ColumnNames) -> Result<TargetTable> {
    let positions = locate_columns(range, sheet, &columns.target_columns())?;
    let key_idx = positions[columns.target_key.as_str()];
    let ka_idx = positions[columns.ka_target.as_str()];
    let talabat_idx = positions[columns.talabat_target.as_str()];

    let mut rows = Vec::new();
    for (row_idx, row) in range.rows().enumerate().skip(1) {
        let cell = |idx: usize| row.get(idx).unwrap_or(&Data::Empty);
        let key = cell_to_string(cell(key_idx)).trim().to_string();
        if key.is_empty() {
            continue;
        }
        rows.push(Target {
            key,
            ka_target: cell_to_number(cell(ka_idx), sheet, row_idx),
            talabat_target: cell_to_number(cell(talabat_idx), sheet, row_idx),
        });
    }

    debug!("{}: read {} target rows", sheet, rows.len());
    Ok(TargetTable::new(rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(v) => v.clone(),
        Data::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", *v as i64),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(v) => v.to_string(),
        Data::DateTimeIso(v) => v.clone(),
        Data::DurationIso(v) => v.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

fn cell_to_number(cell: &Data, sheet: &str, row_idx: usize) -> f64 {
    let parsed = match cell {
        Data::Float(v) => Some(*v),
        Data::Int(v) => Some(*v as f64),
        Data::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        Data::String(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
            if cleaned.is_empty() {
                Some(0.0)
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        Data::Empty => Some(0.0),
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        debug!("{}: row {} has a non-numeric value, using 0", sheet, row_idx + 1);
        0.0
    })
}

fn cell_to_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime().map(|d| d.date()),
        Data::Float(v) => excel_serial_to_date(*v),
        Data::Int(v) => excel_serial_to_date(*v as f64),
        Data::String(s) | Data::DateTimeIso(s) => parse_date_str(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn workbook_bytes(include_target: bool, drop_column: Option<&str>) -> Vec<u8> {
        let mut workbook = Workbook::new();

        let sales = workbook.add_worksheet();
        sales.set_name("sales data").unwrap();
        let headers = ["Billing Date", "Salesman", "Net Value", "Billing Type", "PY Name", "SP Name"];
        let mut col = 0u16;
        for header in headers {
            if Some(header) == drop_column {
                continue;
            }
            sales.write_string(0, col, header).unwrap();
            col += 1;
        }
        sales.write_string(1, 0, "2024-01-01").unwrap();
        sales.write_string(1, 1, "Alice").unwrap();
        sales.write_number(1, 2, 100.0).unwrap();
        sales.write_string(1, 3, "zfr").unwrap();
        sales.write_string(1, 4, "Talabat Foods").unwrap();
        sales.write_string(1, 5, "North").unwrap();
        sales.write_string(2, 0, "garbage").unwrap();
        sales.write_string(2, 1, "Bob").unwrap();
        sales.write_string(2, 2, "1,250.5").unwrap();
        sales.write_string(2, 3, "YKRE").unwrap();
        sales.write_string(2, 4, "Corner Shop").unwrap();
        sales.write_string(2, 5, "South").unwrap();

        if include_target {
            let target = workbook.add_worksheet();
            target.set_name("Target").unwrap();
            target.write_string(0, 0, "Salesman").unwrap();
            target.write_string(0, 1, "KA Target").unwrap();
            target.write_string(0, 2, "Talabat Target").unwrap();
            target.write_string(1, 0, "Alice").unwrap();
            target.write_number(1, 1, 200.0).unwrap();
            target.write_number(1, 2, 50.0).unwrap();
        }

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_load_valid_workbook() {
        let wb = load_workbook(&workbook_bytes(true, None), &ReportConfig::default()).unwrap();

        assert_eq!(wb.transactions.len(), 2);
        assert_eq!(wb.transactions[0].billing_type, "ZFR");
        assert_eq!(
            wb.transactions[0].billing_date,
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(wb.transactions[1].billing_date, None);
        assert!((wb.transactions[1].net_value - 1250.5).abs() < 1e-9);
        assert_eq!(wb.invalid_dates, 1);
        assert_eq!(wb.targets.get("Alice").unwrap().ka_target, 200.0);
        assert!(wb.ytd.is_empty());
    }

    #[test]
    fn test_missing_target_sheet_is_schema_error() {
        let result = load_workbook(&workbook_bytes(false, None), &ReportConfig::default());
        match result {
            Err(SalesReportError::Schema(SchemaError::MissingSheets(sheets))) => {
                assert_eq!(sheets, vec!["Target".to_string()]);
            }
            other => panic!("expected missing sheet error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_column_is_named() {
        let result = load_workbook(&workbook_bytes(true, Some("Net Value")), &ReportConfig::default());
        match result {
            Err(SalesReportError::Schema(SchemaError::MissingColumns { sheet, columns })) => {
                assert_eq!(sheet, "sales data");
                assert_eq!(columns, vec!["Net Value".to_string()]);
            }
            other => panic!("expected missing column error, got {:?}", other),
        }
    }

    #[test]
    fn test_or_empty_returns_empty_tables_on_error() {
        let outcome = load_workbook_or_empty(b"definitely not a spreadsheet", &ReportConfig::default());
        assert!(!outcome.is_ok());
        assert!(outcome.workbook.is_empty());

        let outcome = load_workbook_or_empty(&workbook_bytes(false, None), &ReportConfig::default());
        assert!(matches!(outcome.error, Some(SalesReportError::Schema(_))));
        assert!(outcome.workbook.is_empty());
    }
}
