use std::fmt;
use std::sync::Arc;

use log::{error, info, warn};

use crate::error::AcquisitionError;

use super::SourceKind;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AcquisitionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (operation failed, usually user-correctable).
    Error,
    /// Critical error (I/O or network/authentication failures).
    Critical,
}

impl AcquisitionSeverity {
    /// Severity assigned to a failed acquisition.
    pub fn for_error(e: &AcquisitionError) -> Self {
        match e {
            AcquisitionError::Io(_) | AcquisitionError::ConnectionError { .. } => Self::Critical,
            AcquisitionError::UnsupportedFormat { .. }
            | AcquisitionError::ParseError { .. }
            | AcquisitionError::UnsupportedEngine { .. }
            | AcquisitionError::UnsupportedProvider { .. }
            | AcquisitionError::UnexpectedStatus { .. } => Self::Error,
        }
    }
}

/// Context about an acquisition attempt. `target` never contains credentials.
#[derive(Debug, Clone)]
pub struct AcquisitionContext {
    pub kind: SourceKind,
    pub target: String,
}

/// Minimal stats reported on successful acquisition. Probes report zero rows/columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub rows: usize,
    pub columns: usize,
}

/// Observer interface for acquisition outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait AcquisitionObserver: Send + Sync {
    /// Called when acquisition succeeds.
    fn on_success(&self, _ctx: &AcquisitionContext, _stats: AcquisitionStats) {}

    /// Called when acquisition fails.
    fn on_failure(&self, _ctx: &AcquisitionContext, _severity: AcquisitionSeverity, _error: &AcquisitionError) {}

    /// Called when an acquisition failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &AcquisitionContext, severity: AcquisitionSeverity, error: &AcquisitionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn AcquisitionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn AcquisitionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl AcquisitionObserver for CompositeObserver {
    fn on_success(&self, ctx: &AcquisitionContext, stats: AcquisitionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &AcquisitionContext, severity: AcquisitionSeverity, error: &AcquisitionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &AcquisitionContext, severity: AcquisitionSeverity, error: &AcquisitionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Routes acquisition events to the `log` facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl AcquisitionObserver for LogObserver {
    fn on_success(&self, ctx: &AcquisitionContext, stats: AcquisitionStats) {
        info!(
            "[acquire][ok] kind={:?} target={} rows={} columns={}",
            ctx.kind, ctx.target, stats.rows, stats.columns
        );
    }

    fn on_failure(&self, ctx: &AcquisitionContext, severity: AcquisitionSeverity, error: &AcquisitionError) {
        warn!(
            "[acquire][{:?}] kind={:?} target={} err={}",
            severity, ctx.kind, ctx.target, error
        );
    }

    fn on_alert(&self, ctx: &AcquisitionContext, severity: AcquisitionSeverity, error: &AcquisitionError) {
        error!(
            "[ALERT][acquire][{:?}] kind={:?} target={} err={}",
            severity, ctx.kind, ctx.target, error
        );
    }
}
