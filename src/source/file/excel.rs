#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{AcquisitionError, AcquisitionResult, ParseFailure};
use crate::inference::{build_dataset, RawCell, RawTable};
use crate::types::{DataSet, Schema};

use super::SpreadsheetSheet;

/// Read one sheet of a workbook (`.xlsx`, `.xls`, `.ods`, etc.) into an in-memory `DataSet`.
///
/// Behavior:
/// - Picks the named sheet if provided; otherwise uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Reads remaining rows; empty cells are missing values
pub fn read_spreadsheet_from_path(
    path: impl AsRef<Path>,
    sheet: &SpreadsheetSheet,
    schema: Option<&Schema>,
) -> AcquisitionResult<DataSet> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AcquisitionError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }
    read_workbook(path, sheet, schema).map_err(|cause| AcquisitionError::parse(path, cause))
}

fn read_workbook(path: &Path, sheet: &SpreadsheetSheet, schema: Option<&Schema>) -> Result<DataSet, ParseFailure> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = match sheet {
        SpreadsheetSheet::First => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ParseFailure::schema("workbook has no sheets"))?,
        SpreadsheetSheet::Named(name) => name.clone(),
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    let table = range_to_table(&range).map_err(|e| wrap_schema_err_with_sheet(&sheet_name, e))?;
    build_dataset(table, schema).map_err(|e| wrap_schema_err_with_sheet(&sheet_name, e))
}

fn wrap_schema_err_with_sheet(sheet: &str, err: ParseFailure) -> ParseFailure {
    match err {
        ParseFailure::SchemaMismatch { message } => ParseFailure::SchemaMismatch {
            message: format!("sheet '{sheet}': {message}"),
        },
        other => other,
    }
}

fn range_to_table(range: &calamine::Range<Data>) -> Result<RawTable, ParseFailure> {
    let header_row_idx = range
        .rows()
        .position(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .ok_or_else(|| ParseFailure::schema("sheet has no non-empty rows (no header row found)"))?;

    let mut headers: Vec<String> = range
        .rows()
        .nth(header_row_idx)
        .map(|row| row.iter().map(cell_to_header_string).collect())
        .unwrap_or_default();
    // Trailing empty header cells are layout, not columns.
    while headers.last().is_some_and(|h| h.is_empty()) {
        headers.pop();
    }

    // Report 1-based row numbers (Excel-like).
    let first_row_number = header_row_idx + 2;
    let mut rows = Vec::new();
    for (offset, row) in range.rows().skip(header_row_idx + 1).enumerate() {
        let cells = headers
            .iter()
            .enumerate()
            .map(|(idx, column)| match row.get(idx) {
                Some(cell) => cell_to_raw(cell).map_err(|(raw, message)| ParseFailure::Value {
                    row: first_row_number + offset,
                    column: column.clone(),
                    raw,
                    message,
                }),
                None => Ok(RawCell::Missing),
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(cells);
    }

    Ok(RawTable {
        headers,
        rows,
        first_row_number,
    })
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => (*f as i64).to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Errors carry the raw cell text and a message.
fn cell_to_raw(c: &Data) -> Result<RawCell, (String, String)> {
    Ok(match c {
        Data::Empty => RawCell::Missing,
        Data::String(s) => RawCell::from_text(s),
        Data::Int(i) => RawCell::Int(*i),
        Data::Float(f) => RawCell::Float(*f),
        Data::Bool(b) => RawCell::Bool(*b),
        Data::DateTime(dt) => serial_cell(dt.as_f64())?,
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::from_text(s),
        Data::Error(_) => RawCell::Missing,
    })
}

fn serial_cell(serial: f64) -> Result<RawCell, (String, String)> {
    excel_serial_to_datetime(serial)
        .map(RawCell::DateTime)
        .ok_or_else(|| (serial.to_string(), "date serial out of range".to_string()))
}

/// Excel stores date-times as fractional days since 1899-12-30.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = serial * 86_400_000.0;
    if millis.abs() >= i64::MAX as f64 {
        return None;
    }
    epoch.checked_add_signed(Duration::try_milliseconds(millis.round() as i64)?)
}
