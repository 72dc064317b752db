//! Error types for stagecheck-diff.

use thiserror::Error;

use stagecheck_core::{EntityType, Side};

/// Reasons a reconciliation cannot produce a trustworthy result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// Two records of one dataset share an identity, so pairing is ambiguous.
    #[error("inconsistent data: duplicate identity '{identity}' in {side} dataset")]
    DuplicateIdentity { side: Side, identity: String },

    /// Matched sequences have different lengths after intersection.
    #[error("inconsistent data: {staging} staging matches vs {live} live matches")]
    UnbalancedMatches { staging: usize, live: usize },

    /// Sorted matched sequences disagree on identity at the same position.
    #[error("inconsistent data at position {index}: staging '{staging}' vs live '{live}'")]
    Misaligned {
        index: usize,
        staging: String,
        live: String,
    },

    #[error("record of type '{found}' passed to a '{expected}' reconciliation")]
    EntityTypeMismatch {
        expected: EntityType,
        found: EntityType,
    },

    #[error("unknown result category '{name}'")]
    UnknownCategory { name: String },
}

impl DiffError {
    /// Dataset inconsistency, as opposed to a caller mistake.
    pub fn is_inconsistency(&self) -> bool {
        matches!(
            self,
            DiffError::DuplicateIdentity { .. }
                | DiffError::UnbalancedMatches { .. }
                | DiffError::Misaligned { .. }
        )
    }
}
