//! Core data model: the in-memory tabular dataset.
//!
//! A [`DataSet`] is a [`Schema`] (an ordered list of uniquely named, typed [`Field`]s) plus
//! row-major storage of typed [`Value`]s aligned with it. Every row has exactly one cell per field.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Physical data type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
    /// Calendar date.
    Date,
    /// Date and time of day, without a timezone.
    DateTime,
}

impl DataType {
    /// Kind implied by the physical type alone (no cardinality information).
    pub fn default_kind(self) -> ColumnKind {
        match self {
            DataType::Int64 | DataType::Float64 => ColumnKind::Numeric,
            DataType::Date | DataType::DateTime => ColumnKind::Temporal,
            DataType::Bool => ColumnKind::Categorical,
            DataType::Utf8 => ColumnKind::Text,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::Bool => "bool",
            DataType::Utf8 => "utf8",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
        };
        f.write_str(s)
    }
}

/// Inferred semantic kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Text,
    Temporal,
    Categorical,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
    /// Semantic kind; defaults to [`DataType::default_kind`].
    pub kind: ColumnKind,
}

impl Field {
    /// Create a new field whose kind follows from its data type.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            kind: data_type.default_kind(),
        }
    }

    /// Override the semantic kind.
    pub fn with_kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }
}

/// An ordered list of fields describing the shape of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns the first duplicated field name, if any.
    pub fn duplicate_name(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.fields
            .iter()
            .map(|f| f.name.as_str())
            .find(|name| !seen.insert(*name))
    }
}

/// A single typed cell in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time of day.
    DateTime(NaiveDateTime),
}

impl Value {
    /// `Null` and `NaN` both count as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// Natural ordering between two values.
    ///
    /// Numbers compare numerically across `Int64`/`Float64`; text lexicographically; booleans
    /// `false < true`; dates and datetimes chronologically (a date is its midnight). Missing values
    /// sort last. Values of different kinds order by kind: numbers, booleans, temporal, text.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (a, b) if a.is_missing() && b.is_missing() => Ordering::Equal,
            (a, _) if a.is_missing() => Ordering::Greater,
            (_, b) if b.is_missing() => Ordering::Less,
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Utf8(a), Value::Utf8(b)) => a.cmp(b),
            (a, b) if a.kind_rank() != b.kind_rank() => a.kind_rank().cmp(&b.kind_rank()),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.as_datetime().cmp(&b.as_datetime()),
            },
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Int64(_) | Value::Float64(_) => 0,
            Value::Bool(_) => 1,
            Value::Date(_) | Value::DateTime(_) => 2,
            Value::Utf8(_) => 3,
            Value::Null => 4,
        }
    }

    fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(d.and_time(NaiveTime::MIN)),
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => f.write_str(&format_float(*v)),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Format a float so that integral values keep a decimal point (`1.0`, not `1`).
///
/// Exports rely on this so re-reading a file infers the same column type.
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields. The row index
/// is the position in `rows`, so it is dense and re-numbered whenever rows are removed.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows without validation.
    ///
    /// Prefer [`DataSet::try_new`] for rows that did not come from this crate.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Create a dataset, checking unique column names and row arity.
    pub fn try_new(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self, String> {
        if let Some(dup) = schema.duplicate_name() {
            return Err(format!("duplicate column name '{dup}'"));
        }
        let ds = Self { schema, rows };
        ds.check_shape()?;
        Ok(ds)
    }

    /// An empty dataset with the given schema.
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.field_names().collect()
    }

    /// Verify every row has one cell per schema field.
    pub fn check_shape(&self) -> Result<(), String> {
        let expected = self.schema.len();
        match self.rows.iter().position(|row| row.len() != expected) {
            Some(idx) => Err(format!(
                "row {idx} has {} cells but the schema has {expected} fields",
                self.rows[idx].len()
            )),
            None => Ok(()),
        }
    }

    /// Iterate the cells of column `idx` in row order.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(idx))
    }

    /// Iterate the cells of the named column in row order, if it exists.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
        let idx = self.schema.index_of(name)?;
        Some(self.column_values(idx))
    }

    /// Create a new dataset containing only rows that match `predicate`.
    ///
    /// The returned dataset preserves the original schema.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row.as_slice()))
            .cloned()
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("name", DataType::Utf8),
        ]);
        DataSet::new(
            schema,
            vec![
                vec![Value::Int64(1), Value::Utf8("a".to_string())],
                vec![Value::Int64(2), Value::Null],
                vec![Value::Int64(3), Value::Utf8("c".to_string())],
            ],
        )
    }

    #[test]
    fn schema_index_of_works() {
        let ds = sample();
        assert_eq!(ds.schema.index_of("id"), Some(0));
        assert_eq!(ds.schema.index_of("name"), Some(1));
        assert_eq!(ds.schema.index_of("missing"), None);
    }

    #[test]
    fn try_new_rejects_ragged_rows_and_duplicate_names() {
        let schema = Schema::new(vec![Field::new("a", DataType::Int64)]);
        let err = DataSet::try_new(schema, vec![vec![Value::Int64(1), Value::Int64(2)]]).unwrap_err();
        assert!(err.contains("row 0 has 2 cells"));

        let dup = Schema::new(vec![
            Field::new("a", DataType::Int64),
            Field::new("a", DataType::Utf8),
        ]);
        let err = DataSet::try_new(dup, vec![]).unwrap_err();
        assert!(err.contains("duplicate column name 'a'"));
    }

    #[test]
    fn filter_rows_renumbers_and_keeps_schema() {
        let ds = sample();
        let out = ds.filter_rows(|row| !row.iter().any(Value::is_missing));
        assert_eq!(out.schema, ds.schema);
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.rows[1][0], Value::Int64(3));
        assert_eq!(ds.row_count(), 3);
    }

    #[test]
    fn column_accessor_yields_row_order() {
        let ds = sample();
        let ids: Vec<_> = ds.column("id").unwrap().cloned().collect();
        assert_eq!(ids, vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]);
        assert!(ds.column("nope").is_none());
    }

    #[test]
    fn nan_counts_as_missing() {
        assert!(Value::Float64(f64::NAN).is_missing());
        assert!(Value::Null.is_missing());
        assert!(!Value::Float64(0.0).is_missing());
    }

    #[test]
    fn natural_cmp_orders_within_kind_and_puts_missing_last() {
        assert_eq!(Value::Int64(2).natural_cmp(&Value::Float64(2.5)), Ordering::Less);
        assert_eq!(
            Value::Utf8("b".into()).natural_cmp(&Value::Utf8("a".into())),
            Ordering::Greater
        );
        assert_eq!(Value::Bool(false).natural_cmp(&Value::Bool(true)), Ordering::Less);
        assert_eq!(Value::Null.natural_cmp(&Value::Int64(0)), Ordering::Greater);
    }

    #[test]
    fn natural_cmp_orders_mixed_kinds_by_kind_first() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut values = vec![
            Value::Utf8("10".into()),
            Value::Date(day),
            Value::Bool(true),
            Value::Null,
            Value::Float64(1.5),
            Value::DateTime(day.and_hms_opt(6, 0, 0).unwrap()),
            Value::Int64(-3),
            Value::Utf8("2".into()),
        ];
        values.sort_by(|a, b| a.natural_cmp(b));
        assert_eq!(
            values,
            vec![
                Value::Int64(-3),
                Value::Float64(1.5),
                Value::Bool(true),
                Value::Date(day),
                Value::DateTime(day.and_hms_opt(6, 0, 0).unwrap()),
                Value::Utf8("10".into()),
                Value::Utf8("2".into()),
                Value::Null,
            ]
        );
        assert_eq!(
            Value::Date(day).natural_cmp(&Value::DateTime(day.and_hms_opt(0, 0, 0).unwrap())),
            Ordering::Equal
        );
    }

    #[test]
    fn floats_display_with_decimal_point() {
        assert_eq!(Value::Float64(1.0).to_string(), "1.0");
        assert_eq!(Value::Float64(98.5).to_string(), "98.5");
        assert_eq!(Value::Null.to_string(), "");
    }
}
