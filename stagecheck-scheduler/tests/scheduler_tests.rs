//! Scheduler behavior: failure isolation, ordering, panics and pool sizing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use stagecheck_core::{
    Attribute, ComparisonPolicy, EntityType, ModelRegistry, PolicyFlags, Record, Scope, ScopeId,
    Side,
};
use stagecheck_diff::{Category, CategorySet};
use stagecheck_scheduler::{DataSource, Scheduler, SchedulerError, SourceError};

const PAGE: &str = "wiki.Page";
const ENTRY: &str = "blogs.Entry";
const EVENT: &str = "calendar.Event";

fn registry() -> Arc<ModelRegistry> {
    let mut registry = ModelRegistry::new(2);
    for entity_type in [PAGE, ENTRY, EVENT] {
        registry
            .register_policy(
                ComparisonPolicy::new(entity_type, "id", vec![Attribute::Status]).with_flags(
                    PolicyFlags {
                        grouped: true,
                        staged: true,
                        ..PolicyFlags::default()
                    },
                ),
            )
            .expect("register");
    }
    registry.register_handler("wiki", [PAGE]);
    registry.register_handler("blogs", [ENTRY]);
    registry.register_handler("calendar", [EVENT]);
    Arc::new(registry)
}

fn types() -> Vec<EntityType> {
    vec![PAGE.into(), ENTRY.into(), EVENT.into()]
}

fn scopes(n: i64) -> Vec<Scope> {
    (1..=n).map(|id| Scope::new(id * 10, 1)).collect()
}

/// Serves one staged and one live record per task, optionally sleeping,
/// failing or panicking for selected (scope, entity type) pairs.
#[derive(Default)]
struct ScriptedSource {
    delays_ms: HashMap<(i64, String), u64>,
    failing: Vec<(i64, String)>,
    panicking: Vec<(i64, String)>,
}

impl DataSource for ScriptedSource {
    fn fetch(
        &self,
        scope: &Scope,
        policy: &ComparisonPolicy,
        side: Side,
    ) -> Result<Vec<Record>, SourceError> {
        let key = (scope.id.0, policy.entity_type().to_string());
        if let Some(ms) = self.delays_ms.get(&key) {
            std::thread::sleep(Duration::from_millis(*ms));
        }
        if self.failing.contains(&key) {
            return Err(SourceError::Unavailable("connection refused".into()));
        }
        if self.panicking.contains(&key) {
            panic!("source exploded");
        }
        let status = match side {
            Side::Staging => 0_i64,
            Side::Live => 2_i64,
        };
        let record = Record::new(policy.entity_type().clone(), 1, scope.id.0, 1)
            .with_identity_key(format!("{}-{}", scope.id, policy.entity_type()))
            .with_attribute(Attribute::Status, status)
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        Ok(vec![record])
    }
}

fn scheduler(source: ScriptedSource) -> Scheduler {
    Scheduler::new(registry(), Arc::new(source))
}

fn entity_order(report: &stagecheck_scheduler::ReconcileReport) -> Vec<(ScopeId, Vec<String>)> {
    report
        .iter()
        .map(|s| {
            (
                s.scope.id,
                s.results.iter().map(|r| r.entity_type().to_string()).collect(),
            )
        })
        .collect()
}

#[test]
fn failing_fetch_only_affects_its_own_task() {
    let source = ScriptedSource {
        failing: vec![(20, ENTRY.to_owned())],
        ..ScriptedSource::default()
    };
    let report = scheduler(source)
        .execute(&scopes(3), &types(), &CategorySet::all(), 4)
        .expect("execute");

    assert_eq!(report.error_count(), 1);
    let failed = &report.get(ScopeId(20)).expect("scope 20").results[1];
    let message = failed.error().expect("error set");
    assert!(message.starts_with("fetch: staging dataset"), "got: {message}");
    assert!(failed.is_empty());

    for scope in &report {
        for aggregate in &scope.results {
            if aggregate.error().is_none() {
                assert_eq!(aggregate.len(Category::BothInexact), 1);
            }
        }
    }
}

#[test]
fn panicking_task_becomes_error_aggregate() {
    let source = ScriptedSource {
        panicking: vec![(10, PAGE.to_owned())],
        ..ScriptedSource::default()
    };
    let report = scheduler(source)
        .execute(&scopes(2), &types(), &CategorySet::all(), 2)
        .expect("execute");

    let aggregate = &report.get(ScopeId(10)).expect("scope 10").results[0];
    assert_eq!(aggregate.entity_type().to_string(), PAGE);
    assert_eq!(aggregate.error(), Some("panic: source exploded"));
    assert_eq!(report.error_count(), 1);
}

#[test]
fn zero_concurrency_fails_before_any_task() {
    let err = scheduler(ScriptedSource::default())
        .execute(&scopes(1), &types(), &CategorySet::all(), 0)
        .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConcurrency { concurrency: 0 }));
}

#[test]
fn non_applicable_pairs_are_skipped() {
    let scopes = vec![
        Scope::new(10, 1).with_staged_handlers(["wiki"]),
        Scope::new(20, 1).with_staged_handlers(Vec::<String>::new()),
    ];
    let report = scheduler(ScriptedSource::default())
        .execute(&scopes, &types(), &CategorySet::all(), 1)
        .expect("execute");
    assert_eq!(
        entity_order(&report),
        vec![(ScopeId(10), vec![PAGE.to_owned()]), (ScopeId(20), vec![])]
    );
}

#[test]
fn unregistered_entity_type_becomes_policy_error() {
    let types: Vec<EntityType> = vec![PAGE.into(), "missing.Type".into()];
    let report = scheduler(ScriptedSource::default())
        .execute(&[Scope::new(20, 1)], &types, &CategorySet::all(), 2)
        .expect("execute");

    let results = &report.get(ScopeId(20)).expect("scope 20").results;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].entity_type().to_string(), PAGE);
    assert!(results[0].error().is_none());
    assert_eq!(results[0].len(Category::BothInexact), 1);

    assert_eq!(results[1].entity_type().to_string(), "missing.Type");
    let message = results[1].error().expect("policy failure");
    assert!(message.starts_with("policy: "), "got: {message}");
    assert!(results[1].is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_execute_inside_runtime_is_rejected() {
    let err = scheduler(ScriptedSource::default())
        .execute(&scopes(1), &types(), &CategorySet::all(), 1)
        .unwrap_err();
    assert!(matches!(err, SchedulerError::NestedRuntime));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn execute_async_honors_wanted_categories() {
    let wanted = CategorySet::parse(["staging-only"]).expect("parse");
    let report = scheduler(ScriptedSource::default())
        .execute_async(&scopes(1), &types(), &wanted, 3)
        .await
        .expect("execute");
    assert!(report.iter().all(|s| s.results.iter().all(|r| r.is_empty())));
    assert!(report.is_clean());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn output_order_ignores_completion_order(
        delays in prop::collection::vec(0u64..15, 12),
        concurrency in 1usize..5,
    ) {
        let scopes = scopes(4);
        let mut delays_ms = HashMap::new();
        let mut it = delays.into_iter();
        for scope in &scopes {
            for entity_type in [PAGE, ENTRY, EVENT] {
                delays_ms.insert((scope.id.0, entity_type.to_owned()), it.next().unwrap_or(0));
            }
        }
        let source = ScriptedSource { delays_ms, ..ScriptedSource::default() };
        let report = scheduler(source)
            .execute(&scopes, &types(), &CategorySet::all(), concurrency)
            .expect("execute");

        let expected: Vec<(ScopeId, Vec<String>)> = scopes
            .iter()
            .map(|s| (s.id, vec![PAGE.to_owned(), ENTRY.to_owned(), EVENT.to_owned()]))
            .collect();
        prop_assert_eq!(entity_order(&report), expected);
    }
}
