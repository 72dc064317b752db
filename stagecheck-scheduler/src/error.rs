use std::path::PathBuf;

use thiserror::Error;

use stagecheck_core::{RecordError, RegistryError, Side};
use stagecheck_diff::DiffError;

/// Failures of a [`crate::DataSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid record #{index} in {path}: {source}")]
    Record {
        path: PathBuf,
        index: usize,
        #[source]
        source: RecordError,
    },

    /// Free-form failure for sources that are not file based.
    #[error("{0}")]
    Unavailable(String),
}

/// Fatal errors: the whole `execute` call fails before any task runs.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid concurrency {concurrency}: at least one worker is required")]
    InvalidConcurrency { concurrency: usize },

    #[error("failed to build worker runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("worker pool closed")]
    PoolClosed,

    #[error("execute called from inside a tokio runtime; use execute_async")]
    NestedRuntime,
}

/// Per-task failure, downgraded to `ResultAggregate::error` at the task
/// boundary. Renders as `"<kind>: <message>"`.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("fetch: {side} dataset: {source}")]
    Fetch {
        side: Side,
        #[source]
        source: SourceError,
    },

    /// Matched datasets disagree; see [`DiffError::is_inconsistency`].
    #[error("inconsistency: {0}")]
    Inconsistent(DiffError),

    /// Any other reconcile failure, such as a record of the wrong type.
    #[error("reconcile: {0}")]
    Reconcile(DiffError),

    #[error("policy: {0}")]
    Policy(#[from] RegistryError),

    #[error("panic: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Fetch { .. } => "fetch",
            TaskError::Inconsistent(_) => "inconsistency",
            TaskError::Reconcile(_) => "reconcile",
            TaskError::Policy(_) => "policy",
            TaskError::Panicked(_) => "panic",
        }
    }
}

impl From<DiffError> for TaskError {
    fn from(err: DiffError) -> Self {
        if err.is_inconsistency() {
            TaskError::Inconsistent(err)
        } else {
            TaskError::Reconcile(err)
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.into(),
        source,
    }
}
