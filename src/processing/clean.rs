//! Missing-value removal and outlier replacement.

use log::{debug, info};

use crate::error::{CleaningError, CleaningResult};
use crate::types::{DataSet, DataType, Value};

use super::stats::{mean, sample_variance};

/// Options controlling [`clean`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanOptions {
    /// A numeric value is an outlier when it lies more than `outlier_threshold` sample standard
    /// deviations from its column mean.
    pub outlier_threshold: f64,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self { outlier_threshold: 2.5 }
    }
}

/// What [`clean`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub rows_before: usize,
    pub rows_dropped: usize,
    /// `(column, replaced values)` for every numeric column, in schema order.
    pub replacements: Vec<(String, usize)>,
}

impl CleanReport {
    pub fn total_replacements(&self) -> usize {
        self.replacements.iter().map(|(_, n)| n).sum()
    }
}

/// Output of [`clean`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cleaned {
    pub dataset: DataSet,
    pub report: CleanReport,
}

/// Clean a dataset, returning a new one. The input is never modified.
///
/// 1. Every row with a missing value (`Null` or `NaN`) in any column is dropped.
/// 2. In every numeric column, each value farther than `threshold·σ` from the column mean `μ` is
///    replaced by `μ` (σ is the sample standard deviation of the remaining rows). An `Int64`
///    column that receives a replacement becomes `Float64`.
///
/// Columns with fewer than two values or zero variance have no outliers.
///
/// ```rust
/// use tabular_pipeline::processing::{clean, CleanOptions};
/// use tabular_pipeline::types::{DataSet, DataType, Field, Schema, Value};
///
/// let schema = Schema::new(vec![Field::new("x", DataType::Int64)]);
/// let ds = DataSet::new(
///     schema,
///     vec![vec![Value::Int64(1)], vec![Value::Null], vec![Value::Int64(2)], vec![Value::Int64(100)]],
/// );
///
/// let cleaned = clean(&ds, &CleanOptions::default()).unwrap();
/// assert_eq!(cleaned.dataset.row_count(), 3);
/// assert_eq!(cleaned.report.total_replacements(), 0);
/// ```
pub fn clean(dataset: &DataSet, options: &CleanOptions) -> CleaningResult<Cleaned> {
    let threshold = options.outlier_threshold;
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(CleaningError {
            cause: format!("outlier threshold must be a finite non-negative number, got {threshold}"),
        });
    }
    dataset.check_shape().map_err(|cause| CleaningError { cause })?;

    let mut out = dataset.filter_rows(|row| !row.iter().any(Value::is_missing));
    let rows_dropped = dataset.row_count() - out.row_count();
    debug!("dropped {rows_dropped} row(s) with missing values");

    let mut replacements = Vec::new();
    for idx in 0..out.column_count() {
        let (name, data_type) = match out.schema.fields.get(idx) {
            Some(field) if field.data_type.is_numeric() => (field.name.clone(), field.data_type),
            _ => continue,
        };
        let replaced = replace_outliers(&mut out, idx, threshold);
        if replaced > 0 && data_type == DataType::Int64 {
            promote_to_float(&mut out, idx);
        }
        debug!("column '{name}': replaced {replaced} outlier(s)");
        replacements.push((name, replaced));
    }

    let report = CleanReport {
        rows_before: dataset.row_count(),
        rows_dropped,
        replacements,
    };
    info!(
        "cleaned dataset: {} -> {} rows, {} outlier(s) replaced",
        report.rows_before,
        out.row_count(),
        report.total_replacements()
    );
    Ok(Cleaned { dataset: out, report })
}

fn replace_outliers(ds: &mut DataSet, idx: usize, threshold: f64) -> usize {
    let values: Vec<f64> = ds.column_values(idx).filter_map(Value::as_f64).collect();
    let (Some(mu), Some(variance)) = (mean(&values), sample_variance(&values)) else {
        return 0;
    };
    let sigma = variance.sqrt();
    if sigma == 0.0 {
        return 0;
    }

    let bound = threshold * sigma;
    let mut replaced = 0;
    for cell in ds.rows.iter_mut().filter_map(|row| row.get_mut(idx)) {
        if cell.as_f64().is_some_and(|v| (v - mu).abs() > bound) {
            *cell = Value::Float64(mu);
            replaced += 1;
        }
    }
    replaced
}

fn promote_to_float(ds: &mut DataSet, idx: usize) {
    for cell in ds.rows.iter_mut().filter_map(|row| row.get_mut(idx)) {
        if let Value::Int64(v) = *cell {
            *cell = Value::Float64(v as f64);
        }
    }
    if let Some(field) = ds.schema.fields.get_mut(idx) {
        field.data_type = DataType::Float64;
    }
}
