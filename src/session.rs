//! The active dataset and the operations a front end drives against it.

use std::path::Path;

use log::info;

use crate::chart::{self, ChartKind, RenderInstruction};
use crate::error::PipelineError;
use crate::export::{self, ExportFormat, ExportStats};
use crate::processing::{self, CleanOptions, CleanReport, DatasetSummary};
use crate::source::{self, AcquireOptions, Acquisition, SourceDescriptor};
use crate::types::DataSet;

/// Convenience result type for session operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Options shared by every operation of a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub acquire: AcquireOptions,
    pub clean: CleanOptions,
}

/// Owns the currently loaded dataset.
///
/// Loading a file replaces the dataset wholesale; probing a non-file source leaves it untouched.
/// Cleaning replaces it with the cleaned copy only when cleaning succeeds.
#[derive(Debug, Default)]
pub struct Session {
    dataset: Option<DataSet>,
    pub config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { dataset: None, config }
    }

    /// The loaded dataset, if any.
    pub fn dataset(&self) -> Option<&DataSet> {
        self.dataset.as_ref()
    }

    /// Acquire `descriptor`. A file source replaces the current dataset.
    pub fn load(&mut self, descriptor: &SourceDescriptor) -> PipelineResult<Acquisition> {
        let acquisition = source::acquire(descriptor, &self.config.acquire)?;
        if let Some(ds) = acquisition.dataset() {
            info!(
                "loaded {} rows x {} columns from {}",
                ds.row_count(),
                ds.column_count(),
                descriptor.target()
            );
            self.dataset = Some(ds.clone());
        }
        Ok(acquisition)
    }

    /// Clean the current dataset in place of the old one.
    pub fn clean(&mut self) -> PipelineResult<CleanReport> {
        let current = self.require()?;
        let cleaned = processing::clean(current, &self.config.clean)?;
        self.dataset = Some(cleaned.dataset);
        Ok(cleaned.report)
    }

    pub fn summary(&self) -> PipelineResult<DatasetSummary> {
        Ok(processing::summarize(self.require()?))
    }

    pub fn export(&self, format: ExportFormat, destination: impl AsRef<Path>) -> PipelineResult<ExportStats> {
        Ok(export::write(self.require()?, format, destination)?)
    }

    pub fn plan(&self, column: &str, kind: ChartKind) -> PipelineResult<RenderInstruction> {
        Ok(chart::plan(self.require()?, column, kind)?)
    }

    fn require(&self) -> PipelineResult<&DataSet> {
        self.dataset.as_ref().ok_or(PipelineError::NoDataset)
    }
}
