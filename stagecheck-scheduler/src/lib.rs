//! Concurrent reconciliation runtime: data sources, worker pool, report.
//!
//! [`Scheduler::execute`] fans out one task per applicable
//! (scope, entity type) pair onto a bounded pool and joins the results back
//! in input order.

mod error;
pub mod report;
mod runtime;
pub mod source;

pub use error::{SchedulerError, SourceError, TaskError};
pub use report::{dump_to_log, ReconcileReport, ScopeResults};
pub use runtime::{init_tracing, Scheduler};
pub use source::{DataSource, FileDataSource, RawRecord};
pub use stagecheck_core::Side;
