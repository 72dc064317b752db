//! YAML-backed model registry.
//!
//! # Storage layout
//!
//! ```text
//! ~/.stagecheck/
//!   models.yaml     (comparison policies + handler registration table)
//! ```
//!
//! # API pattern
//!
//! - `fn_at(home: &Path, …)` / `load_at(path)`: explicit location, used in tests
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! # Document
//!
//! ```yaml
//! version: 1
//! numberThreads: 4
//! ignoreEntityTypes: [calendar.Event]
//! defaults:
//!   default:
//!     exactAttributes: [createDate, status, version, name, title, description, size]
//! handlers:
//!   - id: journal
//!     entityTypes: [journal.Article]
//! models:
//!   - entityType: journal.Article
//!     primaryKey: id
//!     audited: true
//!     grouped: true
//!     resourced: true
//!     staged: true
//!     workflowed: true
//!     variant: noCreateDate
//! ```
//!
//! A model setting resolves from the model entry, then `defaults.workflowed`
//! (workflowed models), then `defaults.resourced` (resourced models), then
//! `defaults.default`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::Deserialize;
use tracing::debug;

use crate::error::RegistryError;
use crate::policy::{ComparisonPolicy, IdentityRule, PolicyFlags, PolicyVariant};
use crate::types::{Attribute, EntityType, HandlerId, Scope};

pub const SUPPORTED_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// 1. Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub number_threads: usize,
    #[serde(default)]
    pub ignore_entity_types: Vec<EntityType>,
    #[serde(default)]
    pub defaults: ModelDefaults,
    #[serde(default)]
    pub handlers: Vec<HandlerRegistration>,
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

fn default_version() -> u32 {
    SUPPORTED_VERSION
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefaults {
    #[serde(default)]
    pub default: ModelSettings,
    #[serde(default)]
    pub workflowed: ModelSettings,
    #[serde(default)]
    pub resourced: ModelSettings,
}

/// Partial settings; `None` defers to the next level of resolution.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettings {
    #[serde(default)]
    pub exact_attributes: Option<Vec<Attribute>>,
    #[serde(default)]
    pub variant: Option<PolicyVariant>,
    #[serde(default)]
    pub identity: Option<IdentityRule>,
}

/// Explicit mapping of entity types to the handler that owns their staging.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerRegistration {
    pub id: HandlerId,
    #[serde(default)]
    pub entity_types: Vec<EntityType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub entity_type: EntityType,
    pub primary_key: String,
    #[serde(flatten)]
    pub flags: PolicyFlags,
    #[serde(flatten)]
    pub settings: ModelSettings,
}

// ---------------------------------------------------------------------------
// 2. ModelRegistry
// ---------------------------------------------------------------------------

/// Comparison policies plus handler registration, built once at startup and
/// shared read-only by every reconciliation task.
#[derive(Debug)]
pub struct ModelRegistry {
    number_threads: usize,
    ignored: BTreeSet<EntityType>,
    order: Vec<EntityType>,
    policies: HashMap<EntityType, ComparisonPolicy>,
    handlers: Vec<HandlerRegistration>,
    /// entity type → owning handler; populated lazily, first writer wins.
    handler_cache: RwLock<HashMap<EntityType, Option<HandlerId>>>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ModelRegistry {
    /// Empty registry with the given default worker count (`0` means 1).
    pub fn new(number_threads: usize) -> Self {
        Self {
            number_threads: number_threads.max(1),
            ignored: BTreeSet::new(),
            order: Vec::new(),
            policies: HashMap::new(),
            handlers: Vec::new(),
            handler_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let doc: RegistryDocument = serde_yaml::from_str(yaml)?;
        Self::from_document(doc)
    }

    pub fn from_document(doc: RegistryDocument) -> Result<Self, RegistryError> {
        if doc.version != SUPPORTED_VERSION {
            return Err(RegistryError::UnsupportedVersion { version: doc.version });
        }
        let fallback_exact = doc
            .defaults
            .default
            .exact_attributes
            .clone()
            .ok_or(RegistryError::MissingDefaultExactAttributes)?;

        let mut registry = Self::new(doc.number_threads);
        registry.ignored = doc.ignore_entity_types.into_iter().collect();

        for model in doc.models {
            registry.register_policy(resolve_policy(model, &doc.defaults, &fallback_exact))?;
        }
        for handler in doc.handlers {
            registry.register_handler(handler.id, handler.entity_types);
        }
        Ok(registry)
    }

    /// Add a policy. Entity types keep their registration order.
    pub fn register_policy(&mut self, policy: ComparisonPolicy) -> Result<(), RegistryError> {
        let entity_type = policy.entity_type().clone();
        if policy.primary_key().trim().is_empty() {
            return Err(RegistryError::EmptyPrimaryKey { entity_type });
        }
        if self.policies.contains_key(&entity_type) {
            return Err(RegistryError::DuplicateEntityType { entity_type });
        }
        self.order.push(entity_type.clone());
        self.policies.insert(entity_type, policy);
        Ok(())
    }

    /// Add a handler registration. When several handlers claim the same
    /// entity type, the first registration wins.
    pub fn register_handler<I, E>(&mut self, id: impl Into<HandlerId>, entity_types: I)
    where
        I: IntoIterator<Item = E>,
        E: Into<EntityType>,
    {
        self.handlers.push(HandlerRegistration {
            id: id.into(),
            entity_types: entity_types.into_iter().map(Into::into).collect(),
        });
        self.handler_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn ignore(&mut self, entity_type: impl Into<EntityType>) {
        self.ignored.insert(entity_type.into());
    }

    /// Default worker pool size.
    pub fn number_threads(&self) -> usize {
        self.number_threads
    }

    pub fn policy_for(&self, entity_type: &EntityType) -> Result<&ComparisonPolicy, RegistryError> {
        self.policies
            .get(entity_type)
            .ok_or_else(|| RegistryError::UnknownEntityType {
                entity_type: entity_type.clone(),
            })
    }

    /// Policies in registration order.
    pub fn policies(&self) -> impl Iterator<Item = &ComparisonPolicy> {
        self.order.iter().filter_map(|et| self.policies.get(et))
    }

    pub fn is_ignored(&self, entity_type: &EntityType) -> bool {
        self.ignored.contains(entity_type)
    }

    /// Handler owning `entity_type`, memoized.
    pub fn handler_for(&self, entity_type: &EntityType) -> Option<HandlerId> {
        {
            let cache = self.handler_cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(entity_type) {
                return hit.clone();
            }
        }

        let computed = self
            .handlers
            .iter()
            .find(|h| h.entity_types.contains(entity_type))
            .map(|h| h.id.clone());
        debug!(entity_type = %entity_type, handler = ?computed, "resolved owning handler");

        let mut cache = self.handler_cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.entry(entity_type.clone()).or_insert(computed).clone()
    }

    /// Whether `entity_type` is staged in `scope`: the model must be staged
    /// and grouped, owned by a registered handler, and that handler must be
    /// staged in the scope. Ignored types are never applicable; a type with
    /// no policy is an error.
    pub fn is_applicable(
        &self,
        entity_type: &EntityType,
        scope: &Scope,
    ) -> Result<bool, RegistryError> {
        if self.is_ignored(entity_type) {
            return Ok(false);
        }
        let flags = self.policy_for(entity_type)?.flags();
        if !flags.staged || !flags.grouped {
            return Ok(false);
        }
        Ok(match self.handler_for(entity_type) {
            Some(handler) => scope.stages(&handler),
            None => false,
        })
    }

    /// Entity types to check, in registration order, ignored types dropped.
    ///
    /// A non-empty `filter` keeps only the listed types; listed types the
    /// registry does not know are appended in filter order so the scheduler
    /// reports them as policy failures.
    pub fn entity_types(&self, filter: &[EntityType]) -> Vec<EntityType> {
        let mut types: Vec<EntityType> = self
            .order
            .iter()
            .filter(|et| !self.ignored.contains(*et))
            .filter(|et| filter.is_empty() || filter.contains(et))
            .cloned()
            .collect();
        for et in filter {
            if !self.policies.contains_key(et) && !types.contains(et) {
                types.push(et.clone());
            }
        }
        types
    }

    /// Entity types that can be applicable to some scope: known, not
    /// ignored, staged and grouped.
    pub fn checkable(&self) -> Vec<&ComparisonPolicy> {
        self.policies()
            .filter(|p| !self.is_ignored(p.entity_type()))
            .filter(|p| p.flags().staged && p.flags().grouped)
            .collect()
    }
}

fn resolve_policy(
    model: ModelEntry,
    defaults: &ModelDefaults,
    fallback_exact: &[Attribute],
) -> ComparisonPolicy {
    let flags = model.flags;
    let mut chain: Vec<&ModelSettings> = vec![&model.settings];
    if flags.workflowed {
        chain.push(&defaults.workflowed);
    }
    if flags.resourced {
        chain.push(&defaults.resourced);
    }
    chain.push(&defaults.default);

    let exact = chain
        .iter()
        .find_map(|s| s.exact_attributes.clone())
        .unwrap_or_else(|| fallback_exact.to_vec());
    let variant = chain.iter().find_map(|s| s.variant).unwrap_or_default();
    let identity = chain.iter().find_map(|s| s.identity).unwrap_or_default();

    ComparisonPolicy::new(model.entity_type.clone(), model.primary_key.clone(), exact)
        .with_flags(flags)
        .with_variant(variant)
        .with_identity_rule(identity)
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// `<home>/.stagecheck/models.yaml`, pure, no I/O.
pub fn default_path_at(home: &Path) -> PathBuf {
    home.join(".stagecheck").join("models.yaml")
}

/// `default_path_at` convenience wrapper.
pub fn default_path() -> Result<PathBuf, RegistryError> {
    Ok(default_path_at(&home()?))
}

/// Load the registry at `path`.
///
/// Returns `RegistryError::RegistryNotFound` if absent,
/// `RegistryError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<ModelRegistry, RegistryError> {
    if !path.exists() {
        return Err(RegistryError::RegistryNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let doc: RegistryDocument = serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    ModelRegistry::from_document(doc)
}

/// Load `~/.stagecheck/models.yaml`.
pub fn load() -> Result<ModelRegistry, RegistryError> {
    load_at(&default_path()?)
}

fn home() -> Result<PathBuf, RegistryError> {
    dirs::home_dir().ok_or(RegistryError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
