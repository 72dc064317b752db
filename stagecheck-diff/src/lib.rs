//! # stagecheck-diff
//!
//! Staging/live reconciliation engine.
//!
//! Call [`reconcile`] with both record sets of one entity type, its
//! [`ComparisonPolicy`](stagecheck_core::ComparisonPolicy) and the wanted
//! [`CategorySet`]; the returned [`ResultAggregate`] holds every record in
//! exactly one category.

pub mod category;
pub mod compare;
pub mod engine;
pub mod error;
pub mod localized;
pub mod result;

pub use category::{Category, CategorySet};
pub use compare::{differences, first_difference, is_exact, Difference};
pub use engine::reconcile;
pub use error::DiffError;
pub use result::{MatchedPair, ResultAggregate};
