//! Stagecheck core library: record model, comparison policies and the model registry.
//!
//! Public API surface:
//! - [`types`]: newtypes, scopes, the closed attribute set and typed values
//! - [`record`]: [`Record`], one entity instance from one dataset
//! - [`policy`]: [`ComparisonPolicy`] and cross-environment [`Identity`]
//! - [`registry`]: YAML-backed [`ModelRegistry`]
//! - [`error`]: [`RegistryError`], [`RecordError`]

pub mod error;
pub mod policy;
pub mod record;
pub mod registry;
pub mod types;

pub use error::{RecordError, RegistryError};
pub use policy::{
    compare_identities, ComparisonPolicy, Identity, IdentityRule, PolicyFlags, PolicyVariant,
};
pub use record::Record;
pub use registry::ModelRegistry;
pub use types::{
    AttrValue, Attribute, EntityType, HandlerId, Scope, ScopeId, Side, TenantId, ValueKind,
};
