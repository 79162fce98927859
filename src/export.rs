//! Dataset export to CSV, NDJSON and spreadsheet files.
//!
//! Every export is written to a temporary file next to the destination and renamed into place only
//! after the whole payload has been written and flushed.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;
use tempfile::NamedTempFile;

use crate::error::{ExportError, ExportResult};
use crate::types::{DataSet, Value};

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Header row plus one line per row, no index column.
    Csv,
    /// Newline-delimited JSON objects, keys in schema order.
    Json,
    /// Single-sheet workbook (feature-gated behind `excel`).
    Xlsx,
}

impl ExportFormat {
    /// Infer the format from the destination's extension (case-insensitive).
    pub fn from_path(path: &Path) -> ExportResult<Self> {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(|ext| ext.parse().ok())
            .ok_or_else(|| ExportError::Unsupported {
                destination: path.to_path_buf(),
                message: "cannot infer export format from extension (expected csv, json or xlsx)".to_string(),
            })
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xlsx => "xlsx",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" | "ndjson" | "jsonl" => Ok(Self::Json),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// What [`write`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportStats {
    pub format: ExportFormat,
    pub destination: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

/// Write `dataset` to `destination` in `format`.
///
/// Missing values become empty cells (CSV/xlsx) or `null` (JSON). A zero-row dataset produces a
/// header-only CSV/xlsx and an empty JSON file.
pub fn write(dataset: &DataSet, format: ExportFormat, destination: impl AsRef<Path>) -> ExportResult<ExportStats> {
    let destination = destination.as_ref();
    match format {
        ExportFormat::Csv => atomic_write(destination, |file| write_csv(dataset, file, destination))?,
        ExportFormat::Json => atomic_write(destination, |file| write_ndjson(dataset, file, destination))?,
        ExportFormat::Xlsx => write_xlsx_dispatch(dataset, destination)?,
    }

    let stats = ExportStats {
        format,
        destination: destination.to_path_buf(),
        rows: dataset.row_count(),
        columns: dataset.column_count(),
    };
    info!(
        "exported {} rows x {} columns to {} ({format})",
        stats.rows,
        stats.columns,
        destination.display()
    );
    Ok(stats)
}

fn io_err(destination: &Path, source: io::Error) -> ExportError {
    ExportError::Io {
        destination: destination.to_path_buf(),
        source,
    }
}

/// Run `fill` against a temp file in the destination directory, then move it into place.
fn atomic_write<F>(destination: &Path, fill: F) -> ExportResult<()>
where
    F: FnOnce(&mut File) -> ExportResult<()>,
{
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_err(destination, e))?;
    fill(tmp.as_file_mut())?;
    tmp.as_file_mut().sync_all().map_err(|e| io_err(destination, e))?;
    tmp.persist(destination).map_err(|e| io_err(destination, e.error))?;
    Ok(())
}

fn write_csv(dataset: &DataSet, file: &mut File, destination: &Path) -> ExportResult<()> {
    let csv_err = |source| ExportError::Csv {
        destination: destination.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(dataset.column_names()).map_err(csv_err)?;
    for row in &dataset.rows {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|e| io_err(destination, e))
}

fn write_ndjson(dataset: &DataSet, file: &mut File, destination: &Path) -> ExportResult<()> {
    let mut out = BufWriter::new(file);
    for row in &dataset.rows {
        let record: serde_json::Map<String, serde_json::Value> = dataset
            .schema
            .fields
            .iter()
            .zip(row)
            .map(|(field, value)| (field.name.clone(), to_json(value)))
            .collect();
        serde_json::to_writer(&mut out, &record).map_err(|source| ExportError::Json {
            destination: destination.to_path_buf(),
            source,
        })?;
        out.write_all(b"\n").map_err(|e| io_err(destination, e))?;
    }
    out.flush().map_err(|e| io_err(destination, e))
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Int64(v) => serde_json::Value::from(*v),
        Value::Float64(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Bool(v) => serde_json::Value::Bool(*v),
        Value::Utf8(s) => serde_json::Value::String(s.clone()),
        Value::Date(_) | Value::DateTime(_) => serde_json::Value::String(value.to_string()),
    }
}

fn write_xlsx_dispatch(dataset: &DataSet, destination: &Path) -> ExportResult<()> {
    #[cfg(feature = "excel")]
    {
        let bytes = xlsx::render(dataset, destination)?;
        atomic_write(destination, |file| file.write_all(&bytes).map_err(|e| io_err(destination, e)))
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = dataset;
        Err(ExportError::Unsupported {
            destination: destination.to_path_buf(),
            message: "spreadsheet support not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

#[cfg(feature = "excel")]
mod xlsx {
    use std::path::Path;

    use rust_xlsxwriter::{Workbook, XlsxError};

    use crate::error::{ExportError, ExportResult};
    use crate::types::{DataSet, Value};

    /// Render a single-sheet workbook in memory.
    pub(super) fn render(dataset: &DataSet, destination: &Path) -> ExportResult<Vec<u8>> {
        let xlsx_err = |source: XlsxError| ExportError::Spreadsheet {
            destination: destination.to_path_buf(),
            source,
        };
        let too_large = || ExportError::Unsupported {
            destination: destination.to_path_buf(),
            message: "dataset exceeds spreadsheet row/column limits".to_string(),
        };

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in dataset.column_names().into_iter().enumerate() {
            let col = u16::try_from(col).map_err(|_| too_large())?;
            sheet.write_string(0, col, name).map_err(xlsx_err)?;
        }
        for (r, row) in dataset.rows.iter().enumerate() {
            let r = u32::try_from(r + 1).map_err(|_| too_large())?;
            for (c, value) in row.iter().enumerate() {
                let c = u16::try_from(c).map_err(|_| too_large())?;
                match value {
                    Value::Null => {}
                    Value::Float64(v) if v.is_nan() => {}
                    Value::Int64(v) => {
                        sheet.write_number(r, c, *v as f64).map_err(xlsx_err)?;
                    }
                    Value::Float64(v) => {
                        sheet.write_number(r, c, *v).map_err(xlsx_err)?;
                    }
                    Value::Bool(v) => {
                        sheet.write_boolean(r, c, *v).map_err(xlsx_err)?;
                    }
                    Value::Utf8(_) | Value::Date(_) | Value::DateTime(_) => {
                        sheet.write_string(r, c, value.to_string()).map_err(xlsx_err)?;
                    }
                }
            }
        }
        workbook.save_to_buffer().map_err(xlsx_err)
    }
}
