//! Reconcile one staging record set against one live record set.
//!
//! # Algorithm
//!
//! 1. Index both sets by computed identity (duplicates are an error).
//! 2. A record whose identity appears in the other index is matched; the
//!    rest are exclusive to their own dataset. Records without an identity
//!    are always exclusive.
//! 3. Matched records of each side are sorted by identity and paired by
//!    position; any disagreement is a data inconsistency.
//! 4. Each pair is checked for exact equality under the policy.
//!
//! Steps 3 and 4 are skipped entirely when no "both" category is wanted.

use std::collections::HashMap;

use tracing::debug;

use stagecheck_core::{compare_identities, ComparisonPolicy, Identity, Record, Side};

use crate::category::{Category, CategorySet};
use crate::compare::differences;
use crate::error::DiffError;
use crate::result::{MatchedPair, ResultAggregate};

type Keyed = (Option<Identity>, Record);

pub fn reconcile(
    staging: Vec<Record>,
    live: Vec<Record>,
    policy: &ComparisonPolicy,
    wanted: &CategorySet,
) -> Result<ResultAggregate, DiffError> {
    let staging = keyed(staging, policy)?;
    let live = keyed(live, policy)?;

    let staging_index = index(&staging, Side::Staging)?;
    let live_index = index(&live, Side::Live)?;

    let (staging_matched, staging_only) = partition(staging, &live_index);
    let (live_matched, live_only) = partition(live, &staging_index);

    let mut result = ResultAggregate::new(policy.entity_type().clone());

    if wanted.contains(Category::StagingOnly) {
        result.staging_only = sorted_records(staging_only);
    }
    if wanted.contains(Category::LiveOnly) {
        result.live_only = sorted_records(live_only);
    }

    if wanted.wants_pairs() {
        for pair in pair_up(staging_matched, live_matched, policy)? {
            if pair.differences.is_empty() {
                if wanted.contains(Category::BothExact) {
                    result.both_exact.push(pair);
                }
            } else if wanted.contains(Category::BothInexact) {
                debug!(
                    "{} #{} differs on {}",
                    policy.entity_type(),
                    pair.staging.local_key(),
                    pair.differences
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(",")
                );
                result.both_inexact.push(pair);
            }
        }
    }

    debug!("reconciled {}: {:?}", policy.entity_type(), result.counts());
    Ok(result)
}

fn keyed(records: Vec<Record>, policy: &ComparisonPolicy) -> Result<Vec<Keyed>, DiffError> {
    records
        .into_iter()
        .map(|record| {
            if record.entity_type() != policy.entity_type() {
                return Err(DiffError::EntityTypeMismatch {
                    expected: policy.entity_type().clone(),
                    found: record.entity_type().clone(),
                });
            }
            Ok((policy.identity_of(&record), record))
        })
        .collect()
}

fn index(records: &[Keyed], side: Side) -> Result<HashMap<Identity, usize>, DiffError> {
    let mut index = HashMap::with_capacity(records.len());
    for (position, (identity, _)) in records.iter().enumerate() {
        let Some(identity) = identity else { continue };
        if index.insert(identity.clone(), position).is_some() {
            return Err(DiffError::DuplicateIdentity {
                side,
                identity: identity.to_string(),
            });
        }
    }
    Ok(index)
}

/// Split into (matched in `other`, exclusive).
fn partition(records: Vec<Keyed>, other: &HashMap<Identity, usize>) -> (Vec<Keyed>, Vec<Keyed>) {
    records.into_iter().partition(|(identity, _)| {
        identity
            .as_ref()
            .is_some_and(|identity| other.contains_key(identity))
    })
}

fn sort(records: &mut [Keyed]) {
    records.sort_by(|(a, _), (b, _)| compare_identities(a.as_ref(), b.as_ref()));
}

fn sorted_records(mut records: Vec<Keyed>) -> Vec<Record> {
    sort(&mut records);
    records.into_iter().map(|(_, record)| record).collect()
}

fn pair_up(
    mut staging: Vec<Keyed>,
    mut live: Vec<Keyed>,
    policy: &ComparisonPolicy,
) -> Result<Vec<MatchedPair>, DiffError> {
    if staging.len() != live.len() {
        return Err(DiffError::UnbalancedMatches {
            staging: staging.len(),
            live: live.len(),
        });
    }
    sort(&mut staging);
    sort(&mut live);

    staging
        .into_iter()
        .zip(live)
        .enumerate()
        .map(|(index, ((s_id, s), (l_id, l)))| {
            if s_id.is_none() || s_id != l_id {
                return Err(DiffError::Misaligned {
                    index,
                    staging: display(s_id.as_ref()),
                    live: display(l_id.as_ref()),
                });
            }
            let differences = differences(policy, &s, &l);
            Ok(MatchedPair {
                staging: s,
                live: l,
                differences,
            })
        })
        .collect()
}

fn display(identity: Option<&Identity>) -> String {
    identity.map(ToString::to_string).unwrap_or_else(|| "<none>".to_owned())
}
