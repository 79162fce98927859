//! In-memory data processing.
//!
//! The processing layer operates on [`crate::types::DataSet`] values produced by acquisition:
//!
//! - [`clean()`]: drop rows with missing values, then replace numeric outliers with the column mean
//! - [`summarize()`]: per-column descriptive statistics
//!
//! ## Example: clean → summarize
//!
//! ```rust
//! use tabular_pipeline::processing::{clean, summarize, CleanOptions};
//! use tabular_pipeline::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("id", DataType::Int64),
//!     Field::new("score", DataType::Float64),
//! ]);
//! let ds = DataSet::new(
//!     schema,
//!     vec![
//!         vec![Value::Int64(1), Value::Float64(10.0)],
//!         vec![Value::Int64(2), Value::Float64(20.0)],
//!         vec![Value::Int64(3), Value::Null],
//!     ],
//! );
//!
//! let cleaned = clean(&ds, &CleanOptions::default()).unwrap();
//! let summary = summarize(&cleaned.dataset);
//! assert_eq!(summary.row_count, 2);
//! assert_eq!(summary.get("score").unwrap().mean, Some(15.0));
//! ```

pub mod clean;
pub mod stats;

pub use clean::{clean, CleanOptions, CleanReport, Cleaned};
pub use stats::{summarize, ColumnStats, ColumnSummary, DatasetSummary};
