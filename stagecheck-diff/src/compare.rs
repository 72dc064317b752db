//! Exact-equality check of one matched staging/live pair.
//!
//! Checks run in a fixed order: tenant, scope (grouped types only), then
//! every exact attribute of the policy. An attribute that is absent on
//! either side never counts as a difference.

use serde::Serialize;

use stagecheck_core::{AttrValue, Attribute, ComparisonPolicy, Record};

use crate::localized;

/// One failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Difference {
    Tenant,
    Scope,
    Attribute(Attribute),
}

impl std::fmt::Display for Difference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difference::Tenant => f.write_str("companyId"),
            Difference::Scope => f.write_str("groupId"),
            Difference::Attribute(attr) => write!(f, "{attr}"),
        }
    }
}

fn checks<'a>(
    policy: &'a ComparisonPolicy,
    staging: &'a Record,
    live: &'a Record,
) -> impl Iterator<Item = Difference> + 'a {
    let tenant = (staging.tenant_id() != live.tenant_id()).then_some(Difference::Tenant);
    let scope = (policy.flags().grouped && staging.scope_id() != live.scope_id())
        .then_some(Difference::Scope);

    let attributes = policy
        .exact_attributes()
        .iter()
        .copied()
        .filter(move |attr| !attribute_equal(*attr, staging, live))
        .map(Difference::Attribute);

    tenant.into_iter().chain(scope).chain(attributes)
}

fn attribute_equal(attr: Attribute, staging: &Record, live: &Record) -> bool {
    match (staging.get(attr), live.get(attr)) {
        (Some(a), Some(b)) => values_equal(attr, &a, &b),
        _ => true,
    }
}

fn values_equal(attr: Attribute, a: &AttrValue, b: &AttrValue) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (AttrValue::Text(a), AttrValue::Text(b)) if attr.is_localizable() => {
            localized::equals(a, b).unwrap_or(false)
        }
        _ => false,
    }
}

/// First failed check, if any.
pub fn first_difference(
    policy: &ComparisonPolicy,
    staging: &Record,
    live: &Record,
) -> Option<Difference> {
    checks(policy, staging, live).next()
}

/// Every failed check, in check order.
pub fn differences(policy: &ComparisonPolicy, staging: &Record, live: &Record) -> Vec<Difference> {
    checks(policy, staging, live).collect()
}

pub fn is_exact(policy: &ComparisonPolicy, staging: &Record, live: &Record) -> bool {
    first_difference(policy, staging, live).is_none()
}
