//! Partitioning properties of `reconcile` over generated record sets.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use stagecheck_core::{Attribute, ComparisonPolicy, IdentityRule, PolicyFlags, Record};
use stagecheck_diff::{reconcile, Category, CategorySet, ResultAggregate};

const TYPE: &str = "wiki.Page";

fn policy() -> ComparisonPolicy {
    ComparisonPolicy::new(TYPE, "pageId", vec![Attribute::Status])
        .with_flags(PolicyFlags {
            grouped: true,
            staged: true,
            ..PolicyFlags::default()
        })
        .with_identity_rule(IdentityRule::KeyOnly)
}

/// `uuid -> status` plus a number of records without any identity.
fn dataset() -> impl Strategy<Value = (BTreeMap<String, i64>, usize)> {
    (
        prop::collection::btree_map("[a-f]{1,2}", 0i64..3, 0..12),
        0usize..3,
    )
}

fn records((keyed, unkeyed): &(BTreeMap<String, i64>, usize), pk_base: i64) -> Vec<Record> {
    let mut out: Vec<Record> = keyed
        .iter()
        .enumerate()
        .map(|(i, (uuid, status))| {
            Record::new(TYPE, 1, 20, pk_base + i as i64)
                .with_identity_key(uuid.clone())
                .with_attribute(Attribute::Status, *status)
                .expect("status")
        })
        .collect();
    for i in 0..*unkeyed {
        out.push(Record::new(TYPE, 1, 20, pk_base + 1000 + i as i64));
    }
    out
}

fn keys(records: Vec<&Record>) -> Vec<Option<String>> {
    records
        .into_iter()
        .map(|r| r.identity_key().map(str::to_owned))
        .collect()
}

fn live_side(result: &ResultAggregate, category: Category) -> Vec<&Record> {
    result.pairs(category).iter().map(|p| &p.live).collect()
}

proptest! {
    #[test]
    fn every_record_lands_in_exactly_one_category(staging in dataset(), live in dataset()) {
        let result = reconcile(records(&staging, 0), records(&live, 5000), &policy(), &CategorySet::all())
            .expect("unique identities");

        let mut staging_side = keys(result.records(Category::BothExact));
        staging_side.extend(keys(result.records(Category::BothInexact)));
        staging_side.extend(keys(result.records(Category::StagingOnly)));
        prop_assert_eq!(staging_side.len(), staging.0.len() + staging.1);

        let mut live_side_keys = keys(live_side(&result, Category::BothExact));
        live_side_keys.extend(keys(live_side(&result, Category::BothInexact)));
        live_side_keys.extend(keys(result.records(Category::LiveOnly)));
        prop_assert_eq!(live_side_keys.len(), live.0.len() + live.1);

        let both: BTreeSet<&String> = staging.0.keys().filter(|k| live.0.contains_key(*k)).collect();
        prop_assert_eq!(
            result.len(Category::BothExact) + result.len(Category::BothInexact),
            both.len()
        );
        // Identity-less records are always exclusive.
        let unkeyed_staging = result
            .records(Category::StagingOnly)
            .iter()
            .filter(|r| r.identity_key().is_none())
            .count();
        prop_assert_eq!(unkeyed_staging, staging.1);
        for record in result.records(Category::StagingOnly) {
            if let Some(key) = record.identity_key() {
                prop_assert!(!live.0.contains_key(key));
            }
        }
    }

    #[test]
    fn exact_matches_are_symmetric(staging in dataset(), live in dataset()) {
        let forward = reconcile(records(&staging, 0), records(&live, 5000), &policy(), &CategorySet::all())
            .expect("forward");
        let backward = reconcile(records(&live, 5000), records(&staging, 0), &policy(), &CategorySet::all())
            .expect("backward");

        prop_assert_eq!(
            keys(forward.records(Category::BothExact)),
            keys(backward.records(Category::BothExact))
        );
        prop_assert_eq!(
            keys(forward.records(Category::StagingOnly)),
            keys(backward.records(Category::LiveOnly))
        );
        prop_assert_eq!(
            keys(forward.records(Category::LiveOnly)),
            keys(backward.records(Category::StagingOnly))
        );
    }

    #[test]
    fn identical_sets_are_all_exact(data in dataset()) {
        let keyed_only = (data.0.clone(), 0);
        let result = reconcile(records(&keyed_only, 0), records(&keyed_only, 0), &policy(), &CategorySet::all())
            .expect("reconcile");
        prop_assert_eq!(result.len(Category::BothExact), data.0.len());
        prop_assert_eq!(result.len(Category::BothInexact), 0);
        prop_assert_eq!(result.len(Category::StagingOnly), 0);
        prop_assert_eq!(result.len(Category::LiveOnly), 0);
    }
}
