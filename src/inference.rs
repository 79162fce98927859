//! Column type inference and typed-cell conversion shared by every file reader.
//!
//! Readers first produce a [`RawTable`] of loosely typed [`RawCell`]s (CSV yields text, JSON and
//! spreadsheets yield native numbers/booleans). [`build_dataset`] then either infers a
//! [`DataType`] per column or projects the table onto a caller-supplied [`Schema`], and converts
//! every cell into a typed [`Value`].

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ParseFailure;
use crate::types::{ColumnKind, DataSet, DataType, Field, Schema, Value};

/// Text tokens read as missing values.
pub const NA_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "#N/A",
];

/// Utf8 columns with at most this many distinct values may be categorical.
const CATEGORICAL_MAX_DISTINCT: usize = 20;

static MISSING: RawCell = RawCell::Missing;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A loosely typed cell as produced by a file reader.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawCell {
    Missing,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl RawCell {
    /// Classify a text cell, mapping NA tokens to [`RawCell::Missing`].
    pub(crate) fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_na_token(trimmed) {
            RawCell::Missing
        } else {
            RawCell::Text(trimmed.to_owned())
        }
    }

    fn raw_string(&self) -> String {
        match self {
            RawCell::Missing => String::new(),
            RawCell::Text(s) => s.clone(),
            RawCell::Int(i) => i.to_string(),
            RawCell::Float(f) => f.to_string(),
            RawCell::Bool(b) => b.to_string(),
            RawCell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Header names plus loosely typed rows.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
    /// 1-based user-facing row number of `rows[0]` (used in error messages).
    pub first_row_number: usize,
}

pub fn is_na_token(s: &str) -> bool {
    NA_TOKENS.contains(&s)
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

#[derive(Debug, Clone)]
struct TypeCandidate {
    seen_value: bool,
    possible_integer: bool,
    possible_float: bool,
    possible_boolean: bool,
    possible_date: bool,
    possible_datetime: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            seen_value: false,
            possible_integer: true,
            possible_float: true,
            possible_boolean: true,
            possible_date: true,
            possible_datetime: true,
        }
    }

    fn observe(&mut self, cell: &RawCell) {
        match cell {
            RawCell::Missing => return,
            RawCell::Text(s) => {
                if self.possible_integer && s.parse::<i64>().is_err() {
                    self.possible_integer = false;
                }
                if self.possible_float && s.parse::<f64>().is_err() {
                    self.possible_float = false;
                }
                // Only literal true/false: a 0/1 column stays numeric.
                if self.possible_boolean && !matches!(s.to_ascii_lowercase().as_str(), "true" | "false") {
                    self.possible_boolean = false;
                }
                if self.possible_date && parse_date(s).is_none() {
                    self.possible_date = false;
                }
                if self.possible_datetime && parse_datetime(s).is_none() && parse_date(s).is_none() {
                    self.possible_datetime = false;
                }
            }
            RawCell::Int(_) => {
                self.possible_boolean = false;
                self.possible_date = false;
                self.possible_datetime = false;
            }
            RawCell::Float(_) => {
                self.possible_integer = false;
                self.possible_boolean = false;
                self.possible_date = false;
                self.possible_datetime = false;
            }
            RawCell::Bool(_) => {
                self.possible_integer = false;
                self.possible_float = false;
                self.possible_date = false;
                self.possible_datetime = false;
            }
            RawCell::DateTime(_) => {
                self.possible_integer = false;
                self.possible_float = false;
                self.possible_boolean = false;
                self.possible_date = false;
            }
        }
        self.seen_value = true;
    }

    fn decide(&self) -> DataType {
        if !self.seen_value {
            // An all-missing column reads as floating point, like a column of NaNs.
            DataType::Float64
        } else if self.possible_integer {
            DataType::Int64
        } else if self.possible_float {
            DataType::Float64
        } else if self.possible_boolean {
            DataType::Bool
        } else if self.possible_date {
            DataType::Date
        } else if self.possible_datetime {
            DataType::DateTime
        } else {
            DataType::Utf8
        }
    }
}

/// Infer the physical type of a column from its raw cells.
pub(crate) fn infer_data_type<'a>(cells: impl IntoIterator<Item = &'a RawCell>) -> DataType {
    let mut candidate = TypeCandidate::new();
    for cell in cells {
        candidate.observe(cell);
    }
    candidate.decide()
}

/// Infer the semantic kind of a typed column.
///
/// Utf8 columns are categorical when they repeat a small set of values: at most
/// [`CATEGORICAL_MAX_DISTINCT`] distinct values and no more than half of the non-missing count.
pub fn infer_kind<'a>(data_type: DataType, values: impl IntoIterator<Item = &'a Value>) -> ColumnKind {
    if data_type != DataType::Utf8 {
        return data_type.default_kind();
    }
    let mut distinct: HashSet<&str> = HashSet::new();
    let mut non_missing = 0usize;
    for v in values {
        if let Value::Utf8(s) = v {
            non_missing += 1;
            distinct.insert(s.as_str());
        }
    }
    if non_missing > 0 && distinct.len() <= CATEGORICAL_MAX_DISTINCT && distinct.len() * 2 <= non_missing {
        ColumnKind::Categorical
    } else {
        ColumnKind::Text
    }
}

/// Convert one raw cell into a typed [`Value`].
pub(crate) fn convert_cell(
    row: usize,
    column: &str,
    data_type: DataType,
    cell: &RawCell,
) -> Result<Value, ParseFailure> {
    let fail = |message: &str| ParseFailure::Value {
        row,
        column: column.to_owned(),
        raw: cell.raw_string(),
        message: message.to_owned(),
    };

    let value = match (data_type, cell) {
        (_, RawCell::Missing) => Value::Null,

        (DataType::Utf8, RawCell::Text(s)) => Value::Utf8(s.clone()),
        (DataType::Utf8, other) => Value::Utf8(other.raw_string()),

        (DataType::Int64, RawCell::Text(s)) => {
            Value::Int64(s.parse::<i64>().map_err(|e| fail(&e.to_string()))?)
        }
        (DataType::Int64, RawCell::Int(i)) => Value::Int64(*i),
        (DataType::Int64, RawCell::Float(f)) if f.fract() == 0.0 => Value::Int64(*f as i64),
        (DataType::Int64, RawCell::Float(_)) => {
            return Err(fail("expected integer (got non-integer float)"));
        }
        (DataType::Int64, _) => return Err(fail("expected integer")),

        (DataType::Float64, RawCell::Text(s)) => {
            Value::Float64(s.parse::<f64>().map_err(|e| fail(&e.to_string()))?)
        }
        (DataType::Float64, RawCell::Int(i)) => Value::Float64(*i as f64),
        (DataType::Float64, RawCell::Float(f)) => Value::Float64(*f),
        (DataType::Float64, _) => return Err(fail("expected number")),

        (DataType::Bool, RawCell::Text(s)) => Value::Bool(parse_bool(s).map_err(|m| fail(&m))?),
        (DataType::Bool, RawCell::Bool(b)) => Value::Bool(*b),
        (DataType::Bool, RawCell::Int(i)) => Value::Bool(*i != 0),
        (DataType::Bool, _) => return Err(fail("expected bool")),

        (DataType::Date, RawCell::Text(s)) => {
            Value::Date(parse_date(s).ok_or_else(|| fail("expected date"))?)
        }
        (DataType::Date, RawCell::DateTime(dt)) => Value::Date(dt.date()),
        (DataType::Date, _) => return Err(fail("expected date")),

        (DataType::DateTime, RawCell::Text(s)) => {
            let parsed = parse_datetime(s)
                .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
                .ok_or_else(|| fail("expected datetime"))?;
            Value::DateTime(parsed)
        }
        (DataType::DateTime, RawCell::DateTime(dt)) => Value::DateTime(*dt),
        (DataType::DateTime, _) => return Err(fail("expected datetime")),
    };
    Ok(value)
}

/// Turn a raw table into a typed [`DataSet`].
///
/// - With `schema = None`, each column's type and kind are inferred.
/// - With an explicit schema, columns are projected by name (order may differ) and every cell is
///   parsed as the declared type. Missing columns are a schema mismatch.
pub(crate) fn build_dataset(table: RawTable, schema: Option<&Schema>) -> Result<DataSet, ParseFailure> {
    let mut seen = HashSet::new();
    if let Some(dup) = table.headers.iter().find(|h| !seen.insert(h.as_str())) {
        return Err(ParseFailure::schema(format!("duplicate column name '{dup}'")));
    }

    let (fields, projection) = match schema {
        Some(schema) => project_schema(&table.headers, schema)?,
        None => {
            let fields: Vec<Field> = table
                .headers
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    let cells = table.rows.iter().map(|row| row.get(idx).unwrap_or(&MISSING));
                    Field::new(name.clone(), infer_data_type(cells))
                })
                .collect();
            (fields, (0..table.headers.len()).collect())
        }
    };

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(table.rows.len());
    for (idx0, raw_row) in table.rows.iter().enumerate() {
        let user_row = table.first_row_number + idx0;
        let mut row = Vec::with_capacity(fields.len());
        for (field, &src_idx) in fields.iter().zip(projection.iter()) {
            let cell = raw_row.get(src_idx).unwrap_or(&MISSING);
            row.push(convert_cell(user_row, &field.name, field.data_type, cell)?);
        }
        rows.push(row);
    }

    let fields = if schema.is_some() {
        fields
    } else {
        fields
            .into_iter()
            .enumerate()
            .map(|(idx, field)| {
                let kind = infer_kind(field.data_type, rows.iter().filter_map(|r| r.get(idx)));
                field.with_kind(kind)
            })
            .collect()
    };

    Ok(DataSet::new(Schema::new(fields), rows))
}

fn project_schema(headers: &[String], schema: &Schema) -> Result<(Vec<Field>, Vec<usize>), ParseFailure> {
    let mut idxs = Vec::with_capacity(schema.len());
    for field in &schema.fields {
        match headers.iter().position(|h| h.trim() == field.name) {
            Some(idx) => idxs.push(idx),
            None => {
                return Err(ParseFailure::schema(format!(
                    "missing required column '{}'. headers={headers:?}",
                    field.name
                )));
            }
        }
    }
    Ok((schema.fields.clone(), idxs))
}
