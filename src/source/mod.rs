//! Source acquisition.
//!
//! Most callers should use [`acquire`], which turns a [`SourceDescriptor`] into an [`Acquisition`]:
//!
//! - file sources are read into a [`DataSet`] ([`Acquisition::Dataset`])
//! - database, cloud storage and web sources are reachability probes
//!   ([`Acquisition::Reachable`]) that connect, authenticate, and release the connection again
//!
//! If an [`observability::AcquisitionObserver`] is configured, success/failure/alerts are reported
//! to it.

pub mod cloud;
pub mod database;
pub mod file;
pub mod observability;
pub mod web;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{AcquisitionError, AcquisitionResult};
use crate::types::{DataSet, Schema};

use self::cloud::{CloudCredentials, CloudProvider, CloudStorageClient, HttpCloudClient};
use self::database::{DatabaseCredentials, DatabaseDriver, DatabaseEngine, DatabaseTarget};
use self::file::SpreadsheetSheet;
use self::observability::{AcquisitionContext, AcquisitionObserver, AcquisitionSeverity, AcquisitionStats};

/// Default `User-Agent` for HTTP probes.
pub const DEFAULT_USER_AGENT: &str = concat!("tabular-pipeline/", env!("CARGO_PKG_VERSION"));

/// The four kinds of source a descriptor can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    File,
    Database,
    CloudStorage,
    Web,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Database => "database",
            Self::CloudStorage => "cloud storage",
            Self::Web => "web",
        })
    }
}

/// Where data comes from. Engine and provider names are resolved when the source is acquired, so
/// an unknown name surfaces as [`AcquisitionError::UnsupportedEngine`] /
/// [`AcquisitionError::UnsupportedProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    File {
        path: PathBuf,
    },
    Database {
        engine: String,
        host: String,
        port: u16,
        credentials: DatabaseCredentials,
        database_name: String,
    },
    CloudStorage {
        provider: String,
        credentials: CloudCredentials,
    },
    Web {
        url: String,
    },
}

impl SourceDescriptor {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    pub fn web(url: impl Into<String>) -> Self {
        Self::Web { url: url.into() }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::File { .. } => SourceKind::File,
            Self::Database { .. } => SourceKind::Database,
            Self::CloudStorage { .. } => SourceKind::CloudStorage,
            Self::Web { .. } => SourceKind::Web,
        }
    }

    /// Credential-free description for logs and observers.
    pub fn target(&self) -> String {
        match self {
            Self::File { path } => path.display().to_string(),
            Self::Database {
                engine,
                host,
                port,
                credentials,
                database_name,
            } => format!("{engine}://{}@{host}:{port}/{database_name}", credentials.username),
            Self::CloudStorage { provider, credentials } => match CloudProvider::parse(provider) {
                Ok(p) => format!("{p} {}", cloud::endpoint_for(p, credentials)),
                Err(_) => provider.clone(),
            },
            Self::Web { url } => url.clone(),
        }
    }

    /// Resolve the descriptor into the connector that serves it.
    pub fn connector(&self) -> AcquisitionResult<Box<dyn SourceConnector>> {
        let connector: Box<dyn SourceConnector> = match self {
            Self::File { path } => Box::new(FileSource { path: path.clone() }),
            Self::Database {
                engine,
                host,
                port,
                credentials,
                database_name,
            } => Box::new(DatabaseSource {
                target: DatabaseTarget {
                    engine: DatabaseEngine::parse(engine)?,
                    host: host.clone(),
                    port: *port,
                    database_name: database_name.clone(),
                    credentials: credentials.clone(),
                },
            }),
            Self::CloudStorage { provider, credentials } => Box::new(CloudStorageSource {
                provider: CloudProvider::parse(provider)?,
                credentials: credentials.clone(),
            }),
            Self::Web { url } => Box::new(WebSource { url: url.clone() }),
        };
        Ok(connector)
    }
}

/// What a probe learned about a verify-only source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeDetail {
    Database { engine: DatabaseEngine },
    CloudStorage { provider: CloudProvider, containers: Vec<String> },
    Web { status: u16, body_len: usize },
}

/// Result of probing a database, cloud storage or web source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachabilityReport {
    pub kind: SourceKind,
    /// Credential-free target description.
    pub target: String,
    pub detail: ProbeDetail,
}

impl fmt::Display for ReachabilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} source {} is reachable", self.kind, self.target)?;
        match &self.detail {
            ProbeDetail::Database { engine } => write!(f, " ({engine} session opened and closed)"),
            ProbeDetail::CloudStorage { containers, .. } => {
                write!(f, " ({} container(s)", containers.len())?;
                if !containers.is_empty() {
                    write!(f, ": {}", containers.join(", "))?;
                }
                f.write_str(")")
            }
            ProbeDetail::Web { status, body_len } => write!(f, " (HTTP {status}, {body_len} bytes)"),
        }
    }
}

/// Outcome of a successful [`acquire`].
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    Dataset(DataSet),
    Reachable(ReachabilityReport),
}

impl Acquisition {
    /// The loaded dataset, or `None` for a reachability probe.
    pub fn into_dataset(self) -> Option<DataSet> {
        match self {
            Self::Dataset(ds) => Some(ds),
            Self::Reachable(_) => None,
        }
    }

    pub fn dataset(&self) -> Option<&DataSet> {
        match self {
            Self::Dataset(ds) => Some(ds),
            Self::Reachable(_) => None,
        }
    }

    fn stats(&self) -> AcquisitionStats {
        match self {
            Self::Dataset(ds) => AcquisitionStats {
                rows: ds.row_count(),
                columns: ds.column_count(),
            },
            Self::Reachable(_) => AcquisitionStats { rows: 0, columns: 0 },
        }
    }
}

/// Options controlling acquisition behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct AcquireOptions {
    /// Explicit schema for file sources. `None` infers column types.
    pub schema: Option<Schema>,
    /// Sheet to read from spreadsheet files.
    pub sheet: SpreadsheetSheet,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn AcquisitionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: AcquisitionSeverity,
    /// Driver for database probes. `None` uses [`database::default_driver`].
    pub database_driver: Option<Arc<dyn DatabaseDriver>>,
    /// Client for cloud storage probes. `None` uses [`HttpCloudClient`].
    pub cloud_client: Option<Arc<dyn CloudStorageClient>>,
    /// `User-Agent` sent by HTTP probes.
    pub user_agent: String,
}

impl fmt::Debug for AcquireOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquireOptions")
            .field("schema", &self.schema)
            .field("sheet", &self.sheet)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .field("database_driver_set", &self.database_driver.is_some())
            .field("cloud_client_set", &self.cloud_client.is_some())
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            schema: None,
            sheet: SpreadsheetSheet::default(),
            observer: None,
            alert_at_or_above: AcquisitionSeverity::Critical,
            database_driver: None,
            cloud_client: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Capability interface shared by every source kind.
pub trait SourceConnector {
    fn kind(&self) -> SourceKind;

    fn acquire(&self, options: &AcquireOptions) -> AcquisitionResult<Acquisition>;
}

/// Reads a local file into a dataset.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

impl SourceConnector for FileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn acquire(&self, options: &AcquireOptions) -> AcquisitionResult<Acquisition> {
        file::read_file(&self.path, &options.sheet, options.schema.as_ref()).map(Acquisition::Dataset)
    }
}

/// Opens, pings and closes a database session.
#[derive(Debug, Clone)]
pub struct DatabaseSource {
    pub target: DatabaseTarget,
}

impl SourceConnector for DatabaseSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Database
    }

    fn acquire(&self, options: &AcquireOptions) -> AcquisitionResult<Acquisition> {
        let driver = options
            .database_driver
            .clone()
            .or_else(database::default_driver)
            .ok_or_else(|| {
                AcquisitionError::connection(
                    self.target.redacted(),
                    "database support not enabled (enable cargo feature 'db_connectorx')",
                )
            })?;
        database::probe_database(&self.target, driver.as_ref())?;
        Ok(Acquisition::Reachable(ReachabilityReport {
            kind: SourceKind::Database,
            target: self.target.redacted(),
            detail: ProbeDetail::Database {
                engine: self.target.engine,
            },
        }))
    }
}

/// Authenticates against a storage provider and lists its containers.
#[derive(Debug, Clone)]
pub struct CloudStorageSource {
    pub provider: CloudProvider,
    pub credentials: CloudCredentials,
}

impl SourceConnector for CloudStorageSource {
    fn kind(&self) -> SourceKind {
        SourceKind::CloudStorage
    }

    fn acquire(&self, options: &AcquireOptions) -> AcquisitionResult<Acquisition> {
        let target = format!("{} {}", self.provider, cloud::endpoint_for(self.provider, &self.credentials));
        let client: Arc<dyn CloudStorageClient> = match &options.cloud_client {
            Some(client) => Arc::clone(client),
            None => Arc::new(
                HttpCloudClient::new(&options.user_agent)
                    .map_err(|message| AcquisitionError::connection(&target, message))?,
            ),
        };
        let containers = cloud::probe_cloud(self.provider, &self.credentials, client.as_ref())?;
        Ok(Acquisition::Reachable(ReachabilityReport {
            kind: SourceKind::CloudStorage,
            target,
            detail: ProbeDetail::CloudStorage {
                provider: self.provider,
                containers,
            },
        }))
    }
}

/// Issues an HTTP GET and requires `200 OK`.
#[derive(Debug, Clone)]
pub struct WebSource {
    pub url: String,
}

impl SourceConnector for WebSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Web
    }

    fn acquire(&self, options: &AcquireOptions) -> AcquisitionResult<Acquisition> {
        let response = web::probe_web(&self.url, &options.user_agent)?;
        Ok(Acquisition::Reachable(ReachabilityReport {
            kind: SourceKind::Web,
            target: self.url.clone(),
            detail: ProbeDetail::Web {
                status: response.status,
                body_len: response.body_len,
            },
        }))
    }
}

/// Acquire data (or verify reachability) for any source kind.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row/column counts (zero for probes)
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```no_run
/// use tabular_pipeline::source::{acquire, AcquireOptions, SourceDescriptor};
///
/// # fn main() -> Result<(), tabular_pipeline::AcquisitionError> {
/// let acquisition = acquire(&SourceDescriptor::file("people.csv"), &AcquireOptions::default())?;
/// if let Some(ds) = acquisition.into_dataset() {
///     println!("rows={}", ds.row_count());
/// }
/// # Ok(())
/// # }
/// ```
pub fn acquire(descriptor: &SourceDescriptor, options: &AcquireOptions) -> AcquisitionResult<Acquisition> {
    let ctx = AcquisitionContext {
        kind: descriptor.kind(),
        target: descriptor.target(),
    };

    let result = descriptor.connector().and_then(|connector| connector.acquire(options));

    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(acquisition) => obs.on_success(&ctx, acquisition.stats()),
            Err(e) => {
                let sev = AcquisitionSeverity::for_error(e);
                obs.on_failure(&ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }

    result
}
