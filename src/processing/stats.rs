//! Descriptive statistics for [`crate::types::DataSet`].

use std::cmp::Ordering;
use std::fmt;

use crate::types::{ColumnKind, DataSet, DataType, Value};

/// Per-column statistics. Every entry is `None` when it is undefined for the column (wrong kind,
/// no non-missing values, or too few values).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSummary {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Most frequent value; ties resolve to the smallest value.
    pub mode: Option<Value>,
    /// Sample (N−1) standard deviation.
    pub std_dev: Option<f64>,
    /// Sample (N−1) variance.
    pub variance: Option<f64>,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub p25: Option<f64>,
    pub p75: Option<f64>,
}

/// One column of a [`DatasetSummary`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub name: String,
    pub data_type: DataType,
    pub kind: ColumnKind,
    pub non_null_count: usize,
    pub summary: ColumnSummary,
}

/// Shape of a dataset plus statistics for every column, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnStats>,
}

impl DatasetSummary {
    /// Statistics for the named column.
    pub fn get(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.summary)
    }
}

/// Summarize every column of `dataset`.
///
/// Missing values are skipped. Zero rows or an all-missing column yields all-`None` statistics.
pub fn summarize(dataset: &DataSet) -> DatasetSummary {
    let columns = dataset
        .schema
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let present: Vec<&Value> = dataset.column_values(idx).filter(|v| !v.is_missing()).collect();
            let summary = if field.data_type.is_numeric() {
                numeric_summary(&present)
            } else {
                categorical_summary(&present)
            };
            ColumnStats {
                name: field.name.clone(),
                data_type: field.data_type,
                kind: field.kind,
                non_null_count: present.len(),
                summary,
            }
        })
        .collect();

    DatasetSummary {
        row_count: dataset.row_count(),
        column_count: dataset.column_count(),
        columns,
    }
}

fn numeric_summary(present: &[&Value]) -> ColumnSummary {
    let mut values: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();
    values.sort_by(f64::total_cmp);
    let variance = sample_variance(&values);
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();

    ColumnSummary {
        mean: mean(&values),
        median: percentile(&finite, 0.5),
        mode: mode(present),
        std_dev: variance.map(f64::sqrt),
        variance,
        min: extreme(present, Ordering::Less),
        max: extreme(present, Ordering::Greater),
        p25: percentile(&finite, 0.25),
        p75: percentile(&finite, 0.75),
    }
}

fn categorical_summary(present: &[&Value]) -> ColumnSummary {
    ColumnSummary {
        mode: mode(present),
        min: extreme(present, Ordering::Less),
        max: extreme(present, Ordering::Greater),
        ..Default::default()
    }
}

fn extreme(present: &[&Value], wanted: Ordering) -> Option<Value> {
    present
        .iter()
        .copied()
        .reduce(|best, v| if v.natural_cmp(best) == wanted { v } else { best })
        .cloned()
}

/// Most frequent value, smallest on ties.
fn mode(present: &[&Value]) -> Option<Value> {
    let mut sorted: Vec<&Value> = present.to_vec();
    sorted.sort_by(|a, b| a.natural_cmp(b));

    let mut best: Option<(&Value, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let run_start = sorted[i];
        let mut j = i + 1;
        while j < sorted.len() && sorted[j].natural_cmp(run_start) == Ordering::Equal {
            j += 1;
        }
        let count = j - i;
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((run_start, count));
        }
        i = j;
    }
    best.map(|(v, _)| v.clone())
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance; `None` with fewer than two values.
pub(crate) fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mu = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Linear interpolation between order statistics (`h = p·(n−1)`). `sorted` must be ascending
/// and finite.
pub(crate) fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let h = p * (sorted.len() - 1) as f64;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows: {}", self.row_count)?;
        writeln!(f, "Columns: {}", self.column_count)?;
        for col in &self.columns {
            writeln!(f)?;
            writeln!(
                f,
                "{} ({}, {:?}) non-null: {}",
                col.name, col.data_type, col.kind, col.non_null_count
            )?;
            let s = &col.summary;
            let numbers = [
                ("mean", s.mean),
                ("median", s.median),
                ("std", s.std_dev),
                ("var", s.variance),
                ("25%", s.p25),
                ("75%", s.p75),
            ];
            for (label, value) in numbers {
                if let Some(v) = value {
                    writeln!(f, "  {label:<7}{}", format_stat(v))?;
                }
            }
            let values = [("mode", &s.mode), ("min", &s.min), ("max", &s.max)];
            for (label, value) in values {
                if let Some(v) = value {
                    writeln!(f, "  {label:<7}{v}")?;
                }
            }
        }
        Ok(())
    }
}

fn format_stat(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Schema};

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(percentile(&sorted, 0.25), 1.75));
        assert!(approx(percentile(&sorted, 0.5), 2.5));
        assert!(approx(percentile(&sorted, 0.75), 3.25));
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn numeric_column_statistics() {
        let schema = Schema::new(vec![Field::new("x", DataType::Int64)]);
        let mut rows: Vec<Vec<Value>> = [4, 1, 2, 2, 3].iter().map(|v| vec![Value::Int64(*v)]).collect();
        rows.push(vec![Value::Null]);
        let summary = summarize(&DataSet::new(schema, rows));
        let x = summary.get("x").unwrap();

        assert_eq!(summary.columns[0].non_null_count, 5);
        assert!(approx(x.mean, 2.4));
        assert!(approx(x.median, 2.0));
        assert_eq!(x.mode, Some(Value::Int64(2)));
        assert!(approx(x.variance, 1.3));
        assert!(approx(x.std_dev, 1.3_f64.sqrt()));
        assert_eq!(x.min, Some(Value::Int64(1)));
        assert_eq!(x.max, Some(Value::Int64(4)));
        assert!(approx(x.p25, 2.0));
        assert!(approx(x.p75, 3.0));
    }

    #[test]
    fn mode_ties_resolve_to_smallest_value() {
        let schema = Schema::new(vec![Field::new("c", DataType::Utf8)]);
        let rows = ["b", "a", "b", "a", "c"]
            .iter()
            .map(|s| vec![Value::Utf8(s.to_string())])
            .collect();
        let summary = summarize(&DataSet::new(schema, rows));
        let c = summary.get("c").unwrap();
        assert_eq!(c.mode, Some(Value::Utf8("a".to_string())));
        assert_eq!(c.min, Some(Value::Utf8("a".to_string())));
        assert_eq!(c.max, Some(Value::Utf8("c".to_string())));
        assert_eq!(c.mean, None);
        assert_eq!(c.std_dev, None);
    }

    #[test]
    fn single_value_has_no_spread() {
        let schema = Schema::new(vec![Field::new("x", DataType::Float64)]);
        let summary = summarize(&DataSet::new(schema, vec![vec![Value::Float64(7.5)]]));
        let x = summary.get("x").unwrap();
        assert!(approx(x.mean, 7.5));
        assert_eq!(x.std_dev, None);
        assert_eq!(x.variance, None);
    }

    #[test]
    fn quartiles_skip_infinities() {
        let schema = Schema::new(vec![Field::new("x", DataType::Float64)]);
        let rows = [f64::NEG_INFINITY, 1.0, 2.0, 3.0, f64::INFINITY]
            .iter()
            .map(|v| vec![Value::Float64(*v)])
            .collect();
        let summary = summarize(&DataSet::new(schema, rows));
        let x = summary.get("x").unwrap();
        assert!(approx(x.median, 2.0));
        assert!(approx(x.p25, 1.5));
        assert!(approx(x.p75, 2.5));
        assert_eq!(x.max, Some(Value::Float64(f64::INFINITY)));
    }

    #[test]
    fn mixed_kind_column_summarizes_without_panicking() {
        let schema = Schema::new(vec![Field::new("c", DataType::Utf8)]);
        let rows = vec![
            vec![Value::Utf8("b".into())],
            vec![Value::Int64(7)],
            vec![Value::Bool(false)],
            vec![Value::Utf8("b".into())],
        ];
        let summary = summarize(&DataSet::new(schema, rows));
        let c = summary.get("c").unwrap();
        assert_eq!(c.mode, Some(Value::Utf8("b".into())));
        assert_eq!(c.min, Some(Value::Int64(7)));
        assert_eq!(c.max, Some(Value::Utf8("b".into())));
    }

    #[test]
    fn info_panel_lists_every_column() {
        let schema = Schema::new(vec![
            Field::new("x", DataType::Float64),
            Field::new("name", DataType::Utf8),
        ]);
        let ds = DataSet::new(
            schema,
            vec![
                vec![Value::Float64(1.0), Value::Utf8("a".into())],
                vec![Value::Float64(2.0), Value::Utf8("b".into())],
            ],
        );
        let text = summarize(&ds).to_string();
        assert!(text.starts_with("Rows: 2\nColumns: 2\n"));
        assert!(text.contains("x (float64, Numeric) non-null: 2"));
        assert!(text.contains("  mean   1.5000"));
        assert!(text.contains("name (utf8, Text) non-null: 2"));
    }
}
