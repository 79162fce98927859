use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};

use crate::chart::ChartKind;
use crate::export::ExportFormat;
use crate::processing::CleanOptions;
use crate::session::{Session, SessionConfig};
use crate::source::cloud::CloudCredentials;
use crate::source::database::{DatabaseCredentials, DatabaseEngine};
use crate::source::file::SpreadsheetSheet;
use crate::source::observability::LogObserver;
use crate::source::{AcquireOptions, Acquisition, SourceDescriptor};

#[derive(Debug, Parser)]
#[command(author, version, about = "Load, clean, summarize, export and chart tabular data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a file and print its summary statistics
    Inspect(InspectArgs),
    /// Load a file and write it as CSV, NDJSON or xlsx
    Export(ExportArgs),
    /// Load a file and print a chart render instruction as JSON
    Plot(PlotArgs),
    /// Verify that a MySQL or PostgreSQL database accepts a connection
    ProbeDb(ProbeDbArgs),
    /// Verify cloud storage credentials by listing containers
    ProbeCloud(ProbeCloudArgs),
    /// Verify that a URL answers HTTP 200
    ProbeWeb(ProbeWebArgs),
}

#[derive(Debug, Args)]
pub struct FileArgs {
    /// Input file (.csv, .json, .ndjson, .xlsx, ...)
    pub input: PathBuf,
    /// Worksheet to read from spreadsheet inputs (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Drop rows with missing values and replace numeric outliers before continuing
    #[arg(long)]
    pub clean: bool,
    /// Outlier threshold in standard deviations
    #[arg(long, default_value_t = 2.5)]
    pub threshold: f64,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub file: FileArgs,
    #[command(flatten)]
    pub cleaning: CleanArgs,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub file: FileArgs,
    /// Destination file
    pub output: PathBuf,
    /// Output format (csv, json, xlsx); inferred from the destination extension when omitted
    #[arg(short, long, value_parser = parse_export_format)]
    pub format: Option<ExportFormat>,
    #[command(flatten)]
    pub cleaning: CleanArgs,
}

#[derive(Debug, Args)]
pub struct PlotArgs {
    #[command(flatten)]
    pub file: FileArgs,
    /// Column to plot
    #[arg(short, long)]
    pub column: String,
    /// Chart kind (bar, line, scatter, pie, histogram, box)
    #[arg(short, long, value_parser = parse_chart_kind)]
    pub kind: ChartKind,
    #[command(flatten)]
    pub cleaning: CleanArgs,
}

#[derive(Debug, Args)]
pub struct ProbeDbArgs {
    /// Database engine (MySQL or PostgreSQL)
    #[arg(long)]
    pub engine: String,
    #[arg(long, default_value = "localhost")]
    pub host: String,
    /// Port (defaults to the engine's standard port)
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(short, long)]
    pub user: String,
    #[arg(long, env = "TABULAR_DB_PASSWORD", hide_env_values = true)]
    pub password: String,
    #[arg(short, long)]
    pub database: String,
}

#[derive(Debug, Args)]
pub struct ProbeCloudArgs {
    /// Provider (AWS, Azure or GCP)
    #[arg(long)]
    pub provider: String,
    /// AWS access key id, Azure account name, GCP service-account key file, or GCP project id
    #[arg(long)]
    pub access_key: String,
    /// AWS secret key, Azure account key, or GCP access token (not needed with a key file)
    #[arg(long, env = "TABULAR_CLOUD_SECRET", hide_env_values = true)]
    pub secret_key: Option<String>,
    /// AWS signing region
    #[arg(long)]
    pub region: Option<String>,
    /// Override the provider's service endpoint
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProbeWebArgs {
    pub url: String,
}

fn parse_export_format(value: &str) -> Result<ExportFormat, String> {
    value.parse()
}

fn parse_chart_kind(value: &str) -> Result<ChartKind, String> {
    value.parse::<ChartKind>().map_err(|e| e.reason)
}

fn session_for(file: &FileArgs, cleaning: &CleanArgs) -> Session {
    Session::new(SessionConfig {
        acquire: AcquireOptions {
            sheet: file
                .sheet
                .clone()
                .map(SpreadsheetSheet::Named)
                .unwrap_or_default(),
            observer: Some(Arc::new(LogObserver)),
            ..Default::default()
        },
        clean: CleanOptions {
            outlier_threshold: cleaning.threshold,
        },
    })
}

/// Load the input file into a fresh session, cleaning it when requested.
fn load_file(file: &FileArgs, cleaning: &CleanArgs) -> Result<Session> {
    let mut session = session_for(file, cleaning);
    session
        .load(&SourceDescriptor::file(&file.input))
        .with_context(|| format!("Loading {:?}", file.input))?;
    if cleaning.clean {
        let report = session.clean().context("Cleaning dataset")?;
        info!(
            "Dropped {} row(s), replaced {} outlier(s)",
            report.rows_dropped,
            report.total_replacements()
        );
    }
    Ok(session)
}

pub fn handle_inspect(args: &InspectArgs) -> Result<()> {
    let session = load_file(&args.file, &args.cleaning)?;
    let summary = session.summary()?;
    print!("{summary}");
    Ok(())
}

pub fn handle_export(args: &ExportArgs) -> Result<()> {
    let format = match args.format {
        Some(format) => format,
        None => ExportFormat::from_path(&args.output)?,
    };
    let session = load_file(&args.file, &args.cleaning)?;
    let stats = session
        .export(format, &args.output)
        .with_context(|| format!("Exporting to {:?}", args.output))?;
    println!(
        "Wrote {} row(s) x {} column(s) to {} ({})",
        stats.rows,
        stats.columns,
        stats.destination.display(),
        stats.format
    );
    Ok(())
}

pub fn handle_plot(args: &PlotArgs) -> Result<()> {
    let session = load_file(&args.file, &args.cleaning)?;
    let instruction = session
        .plan(&args.column, args.kind)
        .with_context(|| format!("Planning {} chart of '{}'", args.kind, args.column))?;
    println!("{}", serde_json::to_string_pretty(&instruction)?);
    Ok(())
}

pub fn handle_probe_db(args: &ProbeDbArgs) -> Result<()> {
    let port = match args.port {
        Some(port) => port,
        None => DatabaseEngine::parse(&args.engine)?.default_port(),
    };
    debug!("Probing {} database on {}:{}", args.engine, args.host, port);
    probe(SourceDescriptor::Database {
        engine: args.engine.clone(),
        host: args.host.clone(),
        port,
        credentials: DatabaseCredentials::new(&args.user, &args.password),
        database_name: args.database.clone(),
    })
}

pub fn handle_probe_cloud(args: &ProbeCloudArgs) -> Result<()> {
    let secret = args.secret_key.clone().unwrap_or_default();
    let mut credentials = CloudCredentials::new(&args.access_key, secret);
    credentials.region = args.region.clone();
    credentials.endpoint = args.endpoint.clone();
    probe(SourceDescriptor::CloudStorage {
        provider: args.provider.clone(),
        credentials,
    })
}

pub fn handle_probe_web(args: &ProbeWebArgs) -> Result<()> {
    probe(SourceDescriptor::web(&args.url))
}

fn probe(descriptor: SourceDescriptor) -> Result<()> {
    let mut session = Session::new(SessionConfig {
        acquire: AcquireOptions {
            observer: Some(Arc::new(LogObserver)),
            ..Default::default()
        },
        ..Default::default()
    });
    let acquisition = session
        .load(&descriptor)
        .with_context(|| format!("Probing {}", descriptor.target()))?;
    match acquisition {
        Acquisition::Reachable(report) => println!("{report}"),
        Acquisition::Dataset(_) => return Err(anyhow!("expected a probe, got a dataset")),
    }
    Ok(())
}
