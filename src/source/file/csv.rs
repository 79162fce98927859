//! CSV reader.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{AcquisitionError, AcquisitionResult, ParseFailure};
use crate::inference::{build_dataset, RawCell, RawTable};
use crate::types::{DataSet, Schema};

/// Read a CSV file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - CSV must have headers.
/// - Every record must have as many fields as the header row.
/// - Cells are trimmed; NA tokens become missing values.
/// - With `schema = None`, column types are inferred; otherwise headers must contain all schema
///   fields (order can differ) and each value is parsed according to its field type.
pub fn read_csv_from_path(path: impl AsRef<Path>, schema: Option<&Schema>) -> AcquisitionResult<DataSet> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_csv_from_reader(file, schema).map_err(|cause| AcquisitionError::parse(path, cause))
}

/// Read CSV data from any reader.
pub fn read_csv_from_reader<R: Read>(input: R, schema: Option<&Schema>) -> Result<DataSet, ParseFailure> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(input);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_owned()).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(ParseFailure::schema("csv input has no header row"));
    }

    let mut rows: Vec<Vec<RawCell>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(RawCell::from_text).collect());
    }

    // Report 1-based row numbers; the header is row 1.
    let table = RawTable {
        headers,
        rows,
        first_row_number: 2,
    };
    build_dataset(table, schema)
}
