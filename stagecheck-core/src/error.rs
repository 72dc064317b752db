//! Error types for stagecheck-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Attribute, EntityType, ValueKind};

/// All errors that can arise while loading or querying the model registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error for an in-memory document.
    #[error("invalid model registry document: {0}")]
    Syntax(#[from] serde_yaml::Error),

    /// YAML parse error on load, with file path and serde_yaml line context.
    #[error("failed to parse model registry at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.stagecheck/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The registry YAML file did not exist at the expected path.
    #[error("model registry not found at {path}")]
    RegistryNotFound { path: PathBuf },

    #[error("unsupported model registry version {version} (expected 1)")]
    UnsupportedVersion { version: u32 },

    /// `defaults.default.exactAttributes` is the last resort for every model.
    #[error("defaults.default must declare exactAttributes")]
    MissingDefaultExactAttributes,

    #[error("model '{entity_type}' declares an empty primary key")]
    EmptyPrimaryKey { entity_type: EntityType },

    #[error("model '{entity_type}' is declared more than once")]
    DuplicateEntityType { entity_type: EntityType },

    /// Lookup of an entity type that has no policy.
    #[error("no comparison policy for entity type '{entity_type}'")]
    UnknownEntityType { entity_type: EntityType },
}

/// Errors raised while building a [`crate::Record`] from typed or raw values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("attribute '{attribute}' expects a {expected} value, got {found}")]
    KindMismatch {
        attribute: Attribute,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("attribute '{attribute}' cannot be read from '{value}'")]
    Unparseable { attribute: Attribute, value: String },

    #[error("unknown attribute '{name}'")]
    UnknownAttribute { name: String },
}
