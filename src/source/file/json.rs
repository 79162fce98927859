//! JSON reader.
//!
//! Supported inputs:
//! - An array of record objects: `[{"a":1}, {"a":2}]`
//! - A column-oriented object: `{"a": {"0": 1, "1": 2}}` or `{"a": [1, 2]}`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//! - A single record object: `{"a": 1, "b": "x"}`
//!
//! Nested objects inside records are flattened to dot paths (`{"user":{"name":"Ada"}}` becomes
//! column `user.name`). Columns appear in first-seen key order; keys absent from a record are
//! missing values. Empty input (what a zero-row NDJSON export looks like) reads as a dataset with
//! no rows, shaped by the explicit schema when one is given.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use crate::error::{AcquisitionError, AcquisitionResult, ParseFailure};
use crate::inference::{build_dataset, RawCell, RawTable};
use crate::types::{DataSet, Schema};

/// Read a JSON file into an in-memory [`DataSet`].
pub fn read_json_from_path(path: impl AsRef<Path>, schema: Option<&Schema>) -> AcquisitionResult<DataSet> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    read_json_from_str(&text, schema).map_err(|cause| AcquisitionError::parse(path, cause))
}

/// Read JSON from an in-memory string into a [`DataSet`].
pub fn read_json_from_str(input: &str, schema: Option<&Schema>) -> Result<DataSet, ParseFailure> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        let schema = schema.cloned().unwrap_or_else(|| Schema::new(Vec::new()));
        return Ok(DataSet::empty(schema));
    }

    // First try parsing as a single JSON value (array or object).
    let table = match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(JsonValue::Array(items)) => records_to_table(&items)?,
        Ok(JsonValue::Object(obj)) if is_column_oriented(&obj) => columns_to_table(&obj),
        Ok(v @ JsonValue::Object(_)) => records_to_table(std::slice::from_ref(&v))?,
        Ok(_) => {
            return Err(ParseFailure::schema(
                "json must be an object, an array of objects, or NDJSON",
            ));
        }
        Err(first_err) => {
            // Fall back to NDJSON; if the first line is not JSON either, report the original error.
            let mut values = Vec::new();
            for (i, line) in trimmed.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<JsonValue>(line) {
                    Ok(v) => values.push(v),
                    Err(_) if values.is_empty() => return Err(first_err.into()),
                    Err(e) => {
                        return Err(ParseFailure::schema(format!(
                            "invalid ndjson at line {}: {e}",
                            i + 1
                        )));
                    }
                }
            }
            records_to_table(&values)?
        }
    };

    build_dataset(table, schema)
}

/// `{"col": {...}, "col2": [...]}` where every value is an object or array.
fn is_column_oriented(obj: &Map<String, JsonValue>) -> bool {
    !obj.is_empty()
        && obj
            .values()
            .all(|v| matches!(v, JsonValue::Object(_) | JsonValue::Array(_)))
}

fn records_to_table(values: &[JsonValue]) -> Result<RawTable, ParseFailure> {
    let mut headers: Vec<String> = Vec::new();
    let mut records: Vec<Vec<(String, RawCell)>> = Vec::with_capacity(values.len());

    for (idx0, v) in values.iter().enumerate() {
        let obj = v.as_object().ok_or_else(|| {
            ParseFailure::schema(format!("row {} is not a json object", idx0 + 1))
        })?;
        let mut flat = Vec::new();
        flatten_object(obj, "", &mut flat);
        for (key, _) in &flat {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        records.push(flat);
    }

    let rows = records
        .into_iter()
        .map(|flat| {
            let mut row = vec![RawCell::Missing; headers.len()];
            for (key, cell) in flat {
                if let Some(idx) = headers.iter().position(|h| *h == key) {
                    row[idx] = cell;
                }
            }
            row
        })
        .collect();

    Ok(RawTable {
        headers,
        rows,
        first_row_number: 1,
    })
}

fn flatten_object(obj: &Map<String, JsonValue>, prefix: &str, out: &mut Vec<(String, RawCell)>) {
    for (key, value) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            JsonValue::Object(inner) => flatten_object(inner, &path, out),
            other => out.push((path, json_to_cell(other))),
        }
    }
}

/// Column-oriented layout: the row position comes from the inner object's key order (pandas
/// writes `"0"`, `"1"`, ...) or the array index.
fn columns_to_table(obj: &Map<String, JsonValue>) -> RawTable {
    let headers: Vec<String> = obj.keys().cloned().collect();
    let columns: Vec<Vec<RawCell>> = obj
        .values()
        .map(|col| match col {
            JsonValue::Array(items) => items.iter().map(json_to_cell).collect(),
            JsonValue::Object(cells) => cells.values().map(json_to_cell).collect(),
            _ => Vec::new(),
        })
        .collect();

    let row_count = columns.iter().map(Vec::len).max().unwrap_or(0);
    let rows = (0..row_count)
        .map(|r| {
            columns
                .iter()
                .map(|col| col.get(r).cloned().unwrap_or(RawCell::Missing))
                .collect()
        })
        .collect();

    RawTable {
        headers,
        rows,
        first_row_number: 1,
    }
}

fn json_to_cell(v: &JsonValue) -> RawCell {
    match v {
        JsonValue::Null => RawCell::Missing,
        JsonValue::Bool(b) => RawCell::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                RawCell::Int(i)
            } else {
                n.as_f64().map(RawCell::Float).unwrap_or(RawCell::Missing)
            }
        }
        // Dates stay text until the whole column is known to be temporal.
        JsonValue::String(s) => RawCell::Text(s.clone()),
        // Arrays inside records are kept as their JSON text.
        other => RawCell::Text(other.to_string()),
    }
}
