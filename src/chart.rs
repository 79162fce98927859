//! Chart planning: turn one column into a declarative render instruction.
//!
//! The planner does not draw anything. A [`RenderInstruction`] carries everything a rendering
//! engine needs (title, axis labels, the prepared data) and serializes to JSON.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{PlotError, PlotResult};
use crate::processing::stats::percentile;
use crate::types::{DataSet, Field, Value};

const HISTOGRAM_BINS: usize = 10;

/// Supported chart kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Pie,
    Histogram,
    Box,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Scatter,
        ChartKind::Pie,
        ChartKind::Histogram,
        ChartKind::Box,
    ];

}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for ChartKind {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PlotError::new(format!("unknown chart kind '{s}'")))
    }
}

/// Engine-independent description of one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderInstruction {
    pub kind: ChartKind,
    pub column: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

/// Prepared data, shaped per chart kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    /// Bar, line and scatter charts: x is the row index, missing y values are gaps.
    Series { x: Vec<usize>, y: Vec<Option<f64>> },
    /// Pie chart slices.
    Slices { slices: Vec<PieSlice> },
    /// Histogram bins, ascending.
    Bins { bins: Vec<HistogramBin> },
    /// Box plot five-number summary.
    Box(BoxPlotStats),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub weight: f64,
}

/// `[lower, upper)`; the last bin is closed on the right.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlotStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Plan a chart of `column`.
///
/// Every kind needs a numeric column. Unknown columns, text/boolean/temporal columns, and columns
/// without finite values are errors.
///
/// ```rust
/// use tabular_pipeline::chart::{plan, ChartData, ChartKind};
/// use tabular_pipeline::types::{DataSet, DataType, Field, Schema, Value};
///
/// let schema = Schema::new(vec![Field::new("x", DataType::Int64)]);
/// let ds = DataSet::new(schema, vec![vec![Value::Int64(3)], vec![Value::Null]]);
///
/// let instruction = plan(&ds, "x", ChartKind::Line).unwrap();
/// assert_eq!(instruction.title, "Line Plot of x");
/// assert_eq!(instruction.data, ChartData::Series { x: vec![0, 1], y: vec![Some(3.0), None] });
/// ```
pub fn plan(dataset: &DataSet, column: &str, kind: ChartKind) -> PlotResult<RenderInstruction> {
    let idx = dataset
        .schema
        .index_of(column)
        .ok_or_else(|| PlotError::new(format!("unknown column '{column}'")))?;
    let field = &dataset.schema.fields[idx];
    if !field.data_type.is_numeric() {
        return Err(PlotError::new(format!(
            "{kind} plots need a numeric column, but '{column}' is {}",
            field.data_type
        )));
    }
    if !dataset.column_values(idx).filter_map(Value::as_f64).any(f64::is_finite) {
        return Err(PlotError::new(format!("column '{column}' has no values to plot")));
    }

    let (x_label, y_label, data) = match kind {
        ChartKind::Bar | ChartKind::Line | ChartKind::Scatter => {
            let y: Vec<Option<f64>> = dataset.column_values(idx).map(Value::as_f64).collect();
            ("Row".to_string(), column.to_string(), ChartData::Series { x: (0..y.len()).collect(), y })
        }
        ChartKind::Pie => (
            column.to_string(),
            "Share".to_string(),
            ChartData::Slices {
                slices: pie_slices(dataset, idx),
            },
        ),
        ChartKind::Histogram => (
            column.to_string(),
            "Count".to_string(),
            ChartData::Bins {
                bins: histogram(&sorted_numbers(dataset, idx)),
            },
        ),
        ChartKind::Box => (
            String::new(),
            column.to_string(),
            ChartData::Box(box_stats(&sorted_numbers(dataset, idx), field)?),
        ),
    };

    Ok(RenderInstruction {
        kind,
        column: column.to_string(),
        title: format!("{kind} Plot of {column}"),
        x_label,
        y_label,
        data,
    })
}

/// One equal-weight slice per distinct finite value, in first-seen order.
fn pie_slices(dataset: &DataSet, idx: usize) -> Vec<PieSlice> {
    let mut distinct: Vec<&Value> = Vec::new();
    for v in dataset
        .column_values(idx)
        .filter(|v| v.as_f64().is_some_and(f64::is_finite))
    {
        if !distinct.iter().any(|d| d.natural_cmp(v) == Ordering::Equal) {
            distinct.push(v);
        }
    }
    distinct
        .into_iter()
        .map(|v| PieSlice {
            label: v.to_string(),
            weight: 1.0,
        })
        .collect()
}

/// Finite values only; infinities would stretch the bins and break quartile interpolation.
fn sorted_numbers(dataset: &DataSet, idx: usize) -> Vec<f64> {
    let mut values: Vec<f64> = dataset
        .column_values(idx)
        .filter_map(Value::as_f64)
        .filter(|v| v.is_finite())
        .collect();
    values.sort_by(f64::total_cmp);
    values
}

fn histogram(sorted: &[f64]) -> Vec<HistogramBin> {
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    let (lower, upper) = if min == max { (min - 0.5, max + 0.5) } else { (min, max) };
    let width = (upper - lower) / HISTOGRAM_BINS as f64;

    let mut bins: Vec<HistogramBin> = (0..HISTOGRAM_BINS)
        .map(|i| HistogramBin {
            lower: lower + width * i as f64,
            upper: if i + 1 == HISTOGRAM_BINS { upper } else { lower + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();
    for &v in sorted {
        let slot = (((v - lower) / width).floor() as usize).min(HISTOGRAM_BINS - 1);
        bins[slot].count += 1;
    }
    bins
}

fn box_stats(sorted: &[f64], field: &Field) -> PlotResult<BoxPlotStats> {
    let no_values = || PlotError::new(format!("column '{}' has no values to plot", field.name));
    let (min, max) = match (sorted.first(), sorted.last()) {
        (Some(&min), Some(&max)) => (min, max),
        _ => return Err(no_values()),
    };
    let q1 = percentile(sorted, 0.25).ok_or_else(no_values)?;
    let median = percentile(sorted, 0.5).ok_or_else(no_values)?;
    let q3 = percentile(sorted, 0.75).ok_or_else(no_values)?;
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let inside = |v: &&f64| **v >= lower_fence && **v <= upper_fence;
    let lower_whisker = sorted.iter().find(inside).copied().unwrap_or(q1);
    let upper_whisker = sorted.iter().rev().find(inside).copied().unwrap_or(q3);
    let outliers = sorted.iter().filter(|v| !inside(v)).copied().collect();

    Ok(BoxPlotStats {
        min,
        q1,
        median,
        q3,
        max,
        lower_fence,
        upper_fence,
        lower_whisker,
        upper_whisker,
        outliers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Schema};

    fn numbers(values: &[f64]) -> DataSet {
        let schema = Schema::new(vec![Field::new("v", DataType::Float64)]);
        DataSet::new(schema, values.iter().map(|v| vec![Value::Float64(*v)]).collect())
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("histogram".parse::<ChartKind>().unwrap(), ChartKind::Histogram);
        assert_eq!("BOX".parse::<ChartKind>().unwrap(), ChartKind::Box);
        assert!("donut".parse::<ChartKind>().is_err());
    }

    #[test]
    fn text_and_boolean_columns_support_no_kind() {
        let schema = Schema::new(vec![Field::new("name", DataType::Utf8), Field::new("ok", DataType::Bool)]);
        let ds = DataSet::new(
            schema,
            vec![
                vec![Value::Utf8("a".into()), Value::Bool(true)],
                vec![Value::Utf8("b".into()), Value::Bool(false)],
            ],
        );
        for kind in ChartKind::ALL {
            let err = plan(&ds, "name", kind).unwrap_err();
            assert!(err.reason.contains("numeric"), "{kind}: {}", err.reason);
            assert!(plan(&ds, "ok", kind).is_err());
        }
    }

    #[test]
    fn pie_labels_distinct_numbers() {
        let ds = numbers(&[2.5, 1.0, 2.5]);
        let ChartData::Slices { slices } = plan(&ds, "v", ChartKind::Pie).unwrap().data else {
            panic!("expected slices")
        };
        let labels: Vec<&str> = slices.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["2.5", "1.0"]);
    }

    #[test]
    fn infinities_are_left_out_of_bins_and_quartiles() {
        let ds = numbers(&[f64::NEG_INFINITY, 0.0, 10.0, f64::INFINITY]);
        let ChartData::Bins { bins } = plan(&ds, "v", ChartKind::Histogram).unwrap().data else {
            panic!("expected bins")
        };
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[9].upper, 10.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);

        let ChartData::Box(stats) = plan(&ds, "v", ChartKind::Box).unwrap().data else {
            panic!("expected box stats")
        };
        assert_eq!(stats.median, 5.0);
        assert!(stats.q1.is_finite() && stats.q3.is_finite());

        let only_inf = numbers(&[f64::INFINITY]);
        assert!(plan(&only_inf, "v", ChartKind::Line).is_err());
    }

    #[test]
    fn unknown_and_empty_columns_are_errors() {
        let ds = numbers(&[1.0]);
        assert_eq!(plan(&ds, "nope", ChartKind::Line).unwrap_err().reason, "unknown column 'nope'");

        let schema = Schema::new(vec![Field::new("v", DataType::Float64)]);
        let all_null = DataSet::new(schema, vec![vec![Value::Null], vec![Value::Float64(f64::NAN)]]);
        assert!(plan(&all_null, "v", ChartKind::Histogram).is_err());
    }

    #[test]
    fn histogram_has_ten_bins_and_counts_every_value() {
        let ds = numbers(&[0.0, 1.0, 2.5, 9.99, 10.0]);
        let ChartData::Bins { bins } = plan(&ds, "v", ChartKind::Histogram).unwrap().data else {
            panic!("expected bins")
        };
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[1].count, 1);
        assert_eq!(bins[2].count, 1);
        // Max lands in the closed last bin.
        assert_eq!(bins[9].count, 2);
        assert_eq!(bins[9].upper, 10.0);
    }

    #[test]
    fn constant_column_histogram_spans_one_unit() {
        let ds = numbers(&[4.0, 4.0]);
        let ChartData::Bins { bins } = plan(&ds, "v", ChartKind::Histogram).unwrap().data else {
            panic!("expected bins")
        };
        assert_eq!(bins[0].lower, 3.5);
        assert_eq!(bins[9].upper, 4.5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn box_plot_flags_values_beyond_fences() {
        let ds = numbers(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]);
        let ChartData::Box(stats) = plan(&ds, "v", ChartKind::Box).unwrap().data else {
            panic!("expected box stats")
        };
        assert_eq!(stats.q1, 2.25);
        assert_eq!(stats.median, 3.5);
        assert_eq!(stats.q3, 4.75);
        assert_eq!(stats.upper_fence, 8.5);
        assert_eq!(stats.upper_whisker, 5.0);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.max, 100.0);
    }

    #[test]
    fn instruction_serializes_with_tagged_data() {
        let ds = numbers(&[1.0]);
        let json = serde_json::to_value(plan(&ds, "v", ChartKind::Scatter).unwrap()).unwrap();
        assert_eq!(json["kind"], "Scatter");
        assert_eq!(json["title"], "Scatter Plot of v");
        assert_eq!(json["data"]["type"], "series");
        assert_eq!(json["data"]["y"][0], 1.0);
    }
}
