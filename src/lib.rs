//! `tabular-pipeline` pulls tabular data from heterogeneous sources into an in-memory
//! [`types::DataSet`], cleans it, summarizes it, exports it, and plans charts of its columns.
//!
//! The primary entrypoint is [`source::acquire`], which takes a [`source::SourceDescriptor`] and
//! returns either a dataset (file sources) or a reachability report (database, cloud storage and
//! web sources, which are verified but not fetched).
//!
//! ## What you can acquire
//!
//! - **CSV**: `.csv`
//! - **JSON**: `.json`, `.ndjson`, `.jsonl` (records, column-oriented objects, or one record per line)
//! - **Spreadsheets** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//! - **Databases**: MySQL and PostgreSQL reachability (built-in driver behind `db_connectorx`)
//! - **Cloud storage**: AWS S3, Azure Blob Storage, Google Cloud Storage (container listing)
//! - **Web**: any URL that answers HTTP 200
//!
//! Column types are inferred unless an explicit [`types::Schema`] is supplied through
//! [`source::AcquireOptions::schema`]. Empty cells, NA tokens, and JSON `null` map to
//! [`types::Value::Null`].
//!
//! ## Quick example
//!
//! ```no_run
//! use tabular_pipeline::chart::ChartKind;
//! use tabular_pipeline::export::ExportFormat;
//! use tabular_pipeline::session::Session;
//! use tabular_pipeline::source::SourceDescriptor;
//!
//! # fn main() -> Result<(), tabular_pipeline::PipelineError> {
//! let mut session = Session::default();
//! session.load(&SourceDescriptor::file("people.csv"))?;
//! session.clean()?;
//! println!("{}", session.summary()?);
//! session.export(ExportFormat::Json, "people.ndjson")?;
//! let chart = session.plan("age", ChartKind::Histogram)?;
//! println!("{}", chart.title);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`source`]: acquisition entrypoint, per-source connectors, observability hooks
//! - [`types`]: schema + in-memory dataset types
//! - [`inference`]: NA handling and column type inference
//! - [`processing`]: cleaning and descriptive statistics
//! - [`export`]: CSV / NDJSON / xlsx writers
//! - [`chart`]: render instructions for bar, line, scatter, pie, histogram and box charts
//! - [`session`]: the active dataset and the operations on it
//! - [`error`]: error types used across the crate

pub mod chart;
pub mod cli;
pub mod error;
pub mod export;
pub mod inference;
pub mod processing;
pub mod session;
pub mod source;
pub mod types;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

pub use error::{
    AcquisitionError, AcquisitionResult, CleaningError, ExportError, ParseFailure, PipelineError, PlotError,
};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("tabular_pipeline", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

/// Entry point of the `tabular` binary.
pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect(args) => cli::handle_inspect(&args),
        Commands::Export(args) => cli::handle_export(&args),
        Commands::Plot(args) => cli::handle_plot(&args),
        Commands::ProbeDb(args) => cli::handle_probe_db(&args),
        Commands::ProbeCloud(args) => cli::handle_probe_cloud(&args),
        Commands::ProbeWeb(args) => cli::handle_probe_web(&args),
    }
}
