//! Scope-ordered scheduler output and its log dump.

use serde::Serialize;
use tracing::{info, Level};

use stagecheck_core::{Scope, ScopeId};
use stagecheck_diff::{Category, ResultAggregate};

/// Results of one scope, in entity-type input order.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeResults {
    pub scope: Scope,
    pub results: Vec<ResultAggregate>,
}

/// Every scope's results, in scope input order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ReconcileReport {
    scopes: Vec<ScopeResults>,
}

impl ReconcileReport {
    pub(crate) fn push(&mut self, results: ScopeResults) {
        self.scopes.push(results);
    }

    pub fn get(&self, scope: ScopeId) -> Option<&ScopeResults> {
        self.scopes.iter().find(|s| s.scope.id == scope)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScopeResults> {
        self.scopes.iter()
    }

    pub fn scope_ids(&self) -> Vec<ScopeId> {
        self.scopes.iter().map(|s| s.scope.id).collect()
    }

    /// Aggregates that carry an error.
    pub fn error_count(&self) -> usize {
        self.aggregates().filter(|a| a.is_error()).count()
    }

    /// No errors and nothing outside `both-exact`.
    pub fn is_clean(&self) -> bool {
        self.aggregates().all(|a| {
            !a.is_error() && a.categories().all(|c| c == Category::BothExact)
        })
    }

    fn aggregates(&self) -> impl Iterator<Item = &ResultAggregate> {
        self.scopes.iter().flat_map(|s| s.results.iter())
    }
}

impl<'a> IntoIterator for &'a ReconcileReport {
    type Item = &'a ScopeResults;
    type IntoIter = std::slice::Iter<'a, ScopeResults>;

    fn into_iter(self) -> Self::IntoIter {
        self.scopes.iter()
    }
}

/// Write every non-empty category at `info` level.
///
/// With `group_by_scope` the dump is one block per scope; otherwise one block
/// per entity type across all scopes. Does nothing when `info` is disabled.
pub fn dump_to_log(report: &ReconcileReport, group_by_scope: bool) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }

    if group_by_scope {
        for scope_results in report {
            info!("");
            info!("---------------");
            info!("Scope {}", scope_results.scope.label());
            info!("---------------");
            for aggregate in &scope_results.results {
                dump_aggregate(aggregate, None);
            }
        }
        return;
    }

    let mut entity_types = Vec::new();
    for aggregate in report.aggregates() {
        if !entity_types.contains(aggregate.entity_type()) {
            entity_types.push(aggregate.entity_type().clone());
        }
    }
    for entity_type in entity_types {
        info!("");
        info!("==== {entity_type} ====");
        for scope_results in report {
            for aggregate in scope_results
                .results
                .iter()
                .filter(|a| a.entity_type() == &entity_type)
            {
                dump_aggregate(aggregate, Some(&scope_results.scope));
            }
        }
    }
}

fn dump_aggregate(aggregate: &ResultAggregate, scope: Option<&Scope>) {
    let prefix = scope.map(|s| format!("[{}] ", s.label())).unwrap_or_default();
    if let Some(err) = aggregate.error() {
        info!("{prefix}{}: ERROR {err}", aggregate.entity_type());
        return;
    }
    for category in aggregate.categories() {
        info!("{prefix}{} {category}:", aggregate.entity_type());
        for record in aggregate.records(category) {
            info!("{prefix}  {}", record.summary_line(","));
        }
    }
}
