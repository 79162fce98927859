use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for acquisition operations.
pub type AcquisitionResult<T> = Result<T, AcquisitionError>;

/// Convenience result type for cleaning.
pub type CleaningResult<T> = Result<T, CleaningError>;

/// Convenience result type for export.
pub type ExportResult<T> = Result<T, ExportError>;

/// Convenience result type for chart planning.
pub type PlotResult<T> = Result<T, PlotError>;

/// Error type returned by [`crate::source::acquire`].
///
/// User-correctable conditions (unsupported format/engine/provider, unparsable input) are kept
/// apart from transport failures ([`AcquisitionError::ConnectionError`], [`AcquisitionError::Io`]).
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// The file extension does not map to a supported reader.
    #[error("unsupported file format for {}: {}", path.display(), extension.as_deref().unwrap_or("<no extension>"))]
    UnsupportedFormat {
        path: PathBuf,
        extension: Option<String>,
    },

    /// The file was read but its contents could not be turned into a dataset.
    #[error("failed to parse {}: {cause}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        cause: ParseFailure,
    },

    /// The declared database engine is not one we can speak to.
    #[error("unsupported database engine '{engine}' (expected MySQL or PostgreSQL)")]
    UnsupportedEngine { engine: String },

    /// The declared cloud provider is not one we can speak to.
    #[error("unsupported cloud provider '{provider}' (expected AWS, Azure or GCP)")]
    UnsupportedProvider { provider: String },

    /// Network, handshake or authentication failure. `target` never contains credentials.
    #[error("connection to {target} failed: {message}")]
    ConnectionError { target: String, message: String },

    /// The web endpoint answered with something other than HTTP 200.
    #[error("unexpected HTTP status {code} from {url}")]
    UnexpectedStatus { url: String, code: u16 },

    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquisitionError {
    pub(crate) fn parse(path: impl Into<PathBuf>, cause: impl Into<ParseFailure>) -> Self {
        Self::ParseError {
            path: path.into(),
            cause: cause.into(),
        }
    }

    pub(crate) fn connection(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionError {
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Underlying cause of an [`AcquisitionError::ParseError`].
#[derive(Debug, Error)]
pub enum ParseFailure {
    /// CSV reader error (ragged rows, invalid UTF-8, ...).
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON syntax error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "excel")]
    /// Workbook error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// The input does not have the expected shape (missing columns, non-object rows, ...).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    Value {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },
}

impl ParseFailure {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }
}

/// Cleaning failed part-way. The input dataset is left untouched.
#[derive(Debug, Error)]
#[error("cleaning failed: {cause}")]
pub struct CleaningError {
    pub cause: String,
}

/// Writing an export failed. No file is left at `destination` by the failed attempt.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", destination.display())]
    Io {
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode csv for {}: {source}", destination.display())]
    Csv {
        destination: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to encode json for {}: {source}", destination.display())]
    Json {
        destination: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[cfg(feature = "excel")]
    #[error("failed to encode spreadsheet for {}: {source}", destination.display())]
    Spreadsheet {
        destination: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    /// The dataset cannot be represented in the requested format.
    #[error("cannot export to {}: {message}", destination.display())]
    Unsupported {
        destination: PathBuf,
        message: String,
    },
}

/// A chart could not be planned for the requested column.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot plot: {reason}")]
pub struct PlotError {
    pub reason: String,
}

impl PlotError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Error type for [`crate::session::Session`] operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no data loaded")]
    NoDataset,

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Cleaning(#[from] CleaningError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Plot(#[from] PlotError),
}
