//! File source: extension-dispatched readers for CSV, JSON and spreadsheets.

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod json;

use std::path::Path;

use crate::error::{AcquisitionError, AcquisitionResult};
use crate::types::{DataSet, Schema};

/// Supported input file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values.
    Csv,
    /// JSON records, column-oriented JSON, or NDJSON.
    Json,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Spreadsheet,
}

impl FileFormat {
    /// Parse a file format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> AcquisitionResult<Self> {
        let ext = path.extension().and_then(|s| s.to_str());
        ext.and_then(Self::from_extension)
            .ok_or_else(|| AcquisitionError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: ext.map(str::to_owned),
            })
    }
}

/// Which sheet to read from a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SpreadsheetSheet {
    /// The first sheet in workbook order (default).
    #[default]
    First,
    /// A single named sheet.
    Named(String),
}

/// Read a file into a [`DataSet`], choosing the reader from the file extension.
///
/// Unsupported extensions fail before the file is touched. Parse failures never yield a partially
/// populated dataset.
pub fn read_file(path: &Path, sheet: &SpreadsheetSheet, schema: Option<&Schema>) -> AcquisitionResult<DataSet> {
    match FileFormat::from_path(path)? {
        FileFormat::Csv => self::csv::read_csv_from_path(path, schema),
        FileFormat::Json => json::read_json_from_path(path, schema),
        FileFormat::Spreadsheet => read_spreadsheet_dispatch(path, sheet, schema),
    }
}

fn read_spreadsheet_dispatch(
    path: &Path,
    sheet: &SpreadsheetSheet,
    schema: Option<&Schema>,
) -> AcquisitionResult<DataSet> {
    #[cfg(feature = "excel")]
    {
        excel::read_spreadsheet_from_path(path, sheet, schema)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (sheet, schema);
        Err(AcquisitionError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: Some("spreadsheet support not enabled (enable cargo feature 'excel')".to_string()),
        })
    }
}
