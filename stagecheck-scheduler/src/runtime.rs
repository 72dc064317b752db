use std::any::Any;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use stagecheck_core::{EntityType, ModelRegistry, Scope, Side};
use stagecheck_diff::{reconcile, CategorySet, ResultAggregate};

use crate::error::{SchedulerError, TaskError};
use crate::report::{ReconcileReport, ScopeResults};
use crate::source::DataSource;

/// Runs one reconciliation task per applicable (scope, entity type) pair.
///
/// The registry and data source are shared read-only by every task.
#[derive(Clone)]
pub struct Scheduler {
    registry: Arc<ModelRegistry>,
    source: Arc<dyn DataSource>,
}

impl Scheduler {
    pub fn new(registry: Arc<ModelRegistry>, source: Arc<dyn DataSource>) -> Self {
        Self { registry, source }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Blocking entry point: builds a runtime with `concurrency` workers,
    /// runs every task, and tears the runtime down before returning.
    ///
    /// Must not be called from inside a tokio runtime; that is reported as
    /// [`SchedulerError::NestedRuntime`]. Async callers use
    /// [`Scheduler::execute_async`].
    pub fn execute(
        &self,
        scopes: &[Scope],
        entity_types: &[EntityType],
        wanted: &CategorySet,
        concurrency: usize,
    ) -> Result<ReconcileReport, SchedulerError> {
        check_concurrency(concurrency)?;
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(SchedulerError::NestedRuntime);
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(concurrency)
            .max_blocking_threads(concurrency)
            .enable_all()
            .build()
            .map_err(SchedulerError::Runtime)?;
        let report = runtime.block_on(self.execute_async(scopes, entity_types, wanted, concurrency));
        runtime.shutdown_background();
        report
    }

    /// Submit every task, at most `concurrency` running at once, then join
    /// them positionally so the report follows scope and entity-type input
    /// order whatever the completion order.
    pub async fn execute_async(
        &self,
        scopes: &[Scope],
        entity_types: &[EntityType],
        wanted: &CategorySet,
        concurrency: usize,
    ) -> Result<ReconcileReport, SchedulerError> {
        check_concurrency(concurrency)?;
        let semaphore = Arc::new(Semaphore::new(concurrency));

        let mut batches: Vec<(Scope, Vec<(EntityType, JoinHandle<ResultAggregate>)>)> =
            Vec::with_capacity(scopes.len());
        for scope in scopes {
            let mut handles = Vec::new();
            for entity_type in entity_types {
                // A type without a policy is still submitted; its task
                // reports the policy failure.
                if let Ok(false) = self.registry.is_applicable(entity_type, scope) {
                    debug!(entity_type = %entity_type, scope = %scope.id, "not applicable");
                    continue;
                }
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| SchedulerError::PoolClosed)?;

                let registry = Arc::clone(&self.registry);
                let source = Arc::clone(&self.source);
                let task_scope = scope.clone();
                let task_type = entity_type.clone();
                let task_wanted = wanted.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    run_task(&registry, source.as_ref(), &task_scope, &task_type, &task_wanted)
                });
                handles.push((entity_type.clone(), handle));
            }
            batches.push((scope.clone(), handles));
        }

        let mut report = ReconcileReport::default();
        for (scope, handles) in batches {
            let mut results = Vec::with_capacity(handles.len());
            for (entity_type, handle) in handles {
                let aggregate = match handle.await {
                    Ok(aggregate) => aggregate,
                    Err(join_err) => {
                        let err = TaskError::Panicked(if join_err.is_panic() {
                            panic_message(join_err.into_panic())
                        } else {
                            join_err.to_string()
                        });
                        error!(entity_type = %entity_type, scope = %scope.id, error = %err, "task aborted");
                        ResultAggregate::failed(entity_type, err.to_string())
                    }
                };
                results.push(aggregate);
            }
            report.push(ScopeResults { scope, results });
        }
        Ok(report)
    }
}

fn check_concurrency(concurrency: usize) -> Result<(), SchedulerError> {
    if concurrency == 0 {
        return Err(SchedulerError::InvalidConcurrency { concurrency });
    }
    Ok(())
}

/// Task boundary: every failure becomes an error aggregate.
fn run_task(
    registry: &ModelRegistry,
    source: &dyn DataSource,
    scope: &Scope,
    entity_type: &EntityType,
    wanted: &CategorySet,
) -> ResultAggregate {
    info!(
        entity_type = %entity_type,
        tenant = %scope.tenant_id,
        scope = %scope.id,
        "checking"
    );
    match reconcile_one(registry, source, scope, entity_type, wanted) {
        Ok(aggregate) => aggregate,
        Err(err) => {
            error!(entity_type = %entity_type, scope = %scope.id, error = %err, "reconciliation failed");
            ResultAggregate::failed(entity_type.clone(), err.to_string())
        }
    }
}

fn reconcile_one(
    registry: &ModelRegistry,
    source: &dyn DataSource,
    scope: &Scope,
    entity_type: &EntityType,
    wanted: &CategorySet,
) -> Result<ResultAggregate, TaskError> {
    let policy = registry.policy_for(entity_type)?;
    let staging = source
        .fetch(scope, policy, Side::Staging)
        .map_err(|source| TaskError::Fetch {
            side: Side::Staging,
            source,
        })?;
    let live = source
        .fetch(scope, policy, Side::Live)
        .map_err(|source| TaskError::Fetch {
            side: Side::Live,
            source,
        })?;
    Ok(reconcile(staging, live, policy, wanted)?)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_owned()
    }
}

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
