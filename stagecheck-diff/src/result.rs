//! Categorized outcome of one (scope, entity type) reconciliation.

use serde::Serialize;

use stagecheck_core::{EntityType, Record};

use crate::category::Category;
use crate::compare::Difference;

/// A staging record and its live counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedPair {
    pub staging: Record,
    pub live: Record,
    /// Failed checks; empty for exact pairs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub differences: Vec<Difference>,
}

/// Per-task result. Empty categories are omitted from serialized output and
/// from [`ResultAggregate::get`]; a failed task carries only `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultAggregate {
    entity_type: EntityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(rename = "both-exact", skip_serializing_if = "Vec::is_empty")]
    pub(crate) both_exact: Vec<MatchedPair>,
    #[serde(rename = "both-inexact", skip_serializing_if = "Vec::is_empty")]
    pub(crate) both_inexact: Vec<MatchedPair>,
    #[serde(rename = "staging-only", skip_serializing_if = "Vec::is_empty")]
    pub(crate) staging_only: Vec<Record>,
    #[serde(rename = "live-only", skip_serializing_if = "Vec::is_empty")]
    pub(crate) live_only: Vec<Record>,
}

impl ResultAggregate {
    pub fn new(entity_type: impl Into<EntityType>) -> Self {
        Self {
            entity_type: entity_type.into(),
            error: None,
            both_exact: Vec::new(),
            both_inexact: Vec::new(),
            staging_only: Vec::new(),
            live_only: Vec::new(),
        }
    }

    /// Aggregate for a task that failed; every category is empty.
    pub fn failed(entity_type: impl Into<EntityType>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(entity_type)
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Records of `category`; the staging side for the "both" categories.
    pub fn records(&self, category: Category) -> Vec<&Record> {
        match category {
            Category::BothExact => self.both_exact.iter().map(|p| &p.staging).collect(),
            Category::BothInexact => self.both_inexact.iter().map(|p| &p.staging).collect(),
            Category::StagingOnly => self.staging_only.iter().collect(),
            Category::LiveOnly => self.live_only.iter().collect(),
        }
    }

    /// Matched pairs of a "both" category; empty for the exclusive ones.
    pub fn pairs(&self, category: Category) -> &[MatchedPair] {
        match category {
            Category::BothExact => &self.both_exact,
            Category::BothInexact => &self.both_inexact,
            Category::StagingOnly | Category::LiveOnly => &[],
        }
    }

    pub fn len(&self, category: Category) -> usize {
        match category {
            Category::BothExact => self.both_exact.len(),
            Category::BothInexact => self.both_inexact.len(),
            Category::StagingOnly => self.staging_only.len(),
            Category::LiveOnly => self.live_only.len(),
        }
    }

    /// Category lookup by name (legacy spellings accepted). Unknown and
    /// empty categories both yield `None`.
    pub fn get(&self, name: &str) -> Option<Vec<&Record>> {
        let category: Category = name.parse().ok()?;
        if self.len(category) == 0 {
            return None;
        }
        Some(self.records(category))
    }

    /// Non-empty categories in canonical order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL.into_iter().filter(|c| self.len(*c) > 0)
    }

    /// `(category, count)` for every non-empty category.
    pub fn counts(&self) -> Vec<(Category, usize)> {
        self.categories().map(|c| (c, self.len(c))).collect()
    }

    /// No records in any category.
    pub fn is_empty(&self) -> bool {
        self.categories().next().is_none()
    }
}
