//! Result categories and the set of categories a caller asks for.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DiffError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    BothExact,
    BothInexact,
    StagingOnly,
    LiveOnly,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::BothExact,
        Category::BothInexact,
        Category::StagingOnly,
        Category::LiveOnly,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::BothExact => "both-exact",
            Category::BothInexact => "both-inexact",
            Category::StagingOnly => "staging-only",
            Category::LiveOnly => "live-only",
        }
    }

    /// Categories that hold matched staging/live pairs.
    pub fn is_pair(self) -> bool {
        matches!(self, Category::BothExact | Category::BothInexact)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "both-exact" => Ok(Category::BothExact),
            "both-inexact" | "both-notexact" => Ok(Category::BothInexact),
            "staging-only" | "only-staging" => Ok(Category::StagingOnly),
            "live-only" | "only-live" => Ok(Category::LiveOnly),
            other => Err(DiffError::UnknownCategory {
                name: other.to_owned(),
            }),
        }
    }
}

/// Ordered set of wanted categories. Unwanted categories are never computed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySet(BTreeSet<Category>);

impl CategorySet {
    pub fn all() -> Self {
        Category::ALL.into_iter().collect()
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.contains(&category)
    }

    /// Whether the exact-comparison pass has to run.
    pub fn wants_pairs(&self) -> bool {
        self.0.iter().any(|c| c.is_pair())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.iter().copied()
    }

    /// Parse a list of category names, accepting the legacy spellings.
    pub fn parse<I, S>(names: I) -> Result<Self, DiffError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<T: IntoIterator<Item = Category>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|c| c.name()).collect();
        f.write_str(&names.join(","))
    }
}
