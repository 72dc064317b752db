//! Comparison policies and cross-environment identity.
//!
//! A [`ComparisonPolicy`] is plain data resolved once per entity type by the
//! [`crate::ModelRegistry`]. Entity-type specific behavior is expressed by a
//! small closed set of [`PolicyVariant`]s rather than per-type code.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::types::{Attribute, EntityType};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Computed identity used to match a staging record to its live counterpart.
///
/// The derived ordering sorts every `Key` before every `Fallback`, keys
/// lexically and fallbacks numerically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    Key(String),
    Fallback(i64),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Key(k) => f.write_str(k),
            Identity::Fallback(k) => write!(f, "#{k}"),
        }
    }
}

/// Total order over optional identities: absent identities sort after every
/// present one and compare equal to each other.
pub fn compare_identities(a: Option<&Identity>, b: Option<&Identity>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// How an identity is derived when the record has no identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityRule {
    /// Identity key, else secondary key for resourced types, else local key.
    #[default]
    KeyOrFallback,
    /// Identity key only; records without one never match.
    KeyOnly,
    /// `<secondary key>_<version>`, so each version of a resource matches
    /// the same version on the other side. Records missing either part fall
    /// back to their identity key.
    ResourceVersion,
}

impl fmt::Display for IdentityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityRule::KeyOrFallback => write!(f, "keyOrFallback"),
            IdentityRule::KeyOnly => write!(f, "keyOnly"),
            IdentityRule::ResourceVersion => write!(f, "resourceVersion"),
        }
    }
}

// ---------------------------------------------------------------------------
// Variants and flags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyVariant {
    #[default]
    Default,
    /// `createDate` is not part of exact equality.
    NoCreateDate,
    /// `name` is neither fetched nor compared.
    IgnoreName,
}

impl PolicyVariant {
    fn exact_removals(self) -> &'static [Attribute] {
        match self {
            PolicyVariant::Default => &[],
            PolicyVariant::NoCreateDate => &[Attribute::CreateDate],
            PolicyVariant::IgnoreName => &[Attribute::Name],
        }
    }

    fn fetch_removals(self) -> &'static [Attribute] {
        match self {
            PolicyVariant::IgnoreName => &[Attribute::Name],
            _ => &[],
        }
    }
}

impl fmt::Display for PolicyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyVariant::Default => write!(f, "default"),
            PolicyVariant::NoCreateDate => write!(f, "noCreateDate"),
            PolicyVariant::IgnoreName => write!(f, "ignoreName"),
        }
    }
}

/// Model capabilities that decide which attributes a pass must fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyFlags {
    #[serde(default)]
    pub audited: bool,
    #[serde(default)]
    pub grouped: bool,
    /// Multi-versioned: versions share a resource-level secondary key.
    #[serde(default)]
    pub resourced: bool,
    #[serde(default)]
    pub staged: bool,
    #[serde(default)]
    pub workflowed: bool,
}

// ---------------------------------------------------------------------------
// ComparisonPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonPolicy {
    entity_type: EntityType,
    primary_key: String,
    declared_exact: Vec<Attribute>,
    exact: Vec<Attribute>,
    flags: PolicyFlags,
    variant: PolicyVariant,
    identity_rule: IdentityRule,
}

impl ComparisonPolicy {
    pub fn new(
        entity_type: impl Into<EntityType>,
        primary_key: impl Into<String>,
        exact_attributes: Vec<Attribute>,
    ) -> Self {
        let mut policy = Self {
            entity_type: entity_type.into(),
            primary_key: primary_key.into(),
            declared_exact: exact_attributes,
            exact: Vec::new(),
            flags: PolicyFlags::default(),
            variant: PolicyVariant::Default,
            identity_rule: IdentityRule::default(),
        };
        policy.refresh_exact();
        policy
    }

    pub fn with_flags(mut self, flags: PolicyFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_variant(mut self, variant: PolicyVariant) -> Self {
        self.variant = variant;
        self.refresh_exact();
        self
    }

    pub fn with_identity_rule(mut self, rule: IdentityRule) -> Self {
        self.identity_rule = rule;
        self
    }

    fn refresh_exact(&mut self) {
        let removals = self.variant.exact_removals();
        let mut exact: Vec<Attribute> = Vec::with_capacity(self.declared_exact.len());
        for attr in &self.declared_exact {
            if !removals.contains(attr) && !exact.contains(attr) {
                exact.push(*attr);
            }
        }
        self.exact = exact;
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Name of the per-environment primary key column.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn flags(&self) -> PolicyFlags {
        self.flags
    }

    pub fn variant(&self) -> PolicyVariant {
        self.variant
    }

    pub fn identity_rule(&self) -> IdentityRule {
        self.identity_rule
    }

    /// Attributes checked for exact equality, with the variant applied.
    pub fn exact_attributes(&self) -> &[Attribute] {
        &self.exact
    }

    /// Cross-environment identity of `record` under this policy.
    pub fn identity_of(&self, record: &Record) -> Option<Identity> {
        if self.identity_rule == IdentityRule::ResourceVersion {
            if let (Some(resource), Some(version)) = (record.secondary_key(), record.version()) {
                return Some(Identity::Key(format!("{resource}_{version}")));
            }
        }
        if let Some(key) = record.identity_key() {
            return Some(Identity::Key(key.to_owned()));
        }
        match self.identity_rule {
            IdentityRule::KeyOnly | IdentityRule::ResourceVersion => None,
            IdentityRule::KeyOrFallback if self.flags.resourced => {
                record.secondary_key().map(Identity::Fallback)
            }
            IdentityRule::KeyOrFallback => Some(Identity::Fallback(record.local_key())),
        }
    }

    /// Ordered, de-duplicated list of attributes a reconciliation pass needs.
    pub fn fetch_attributes(&self) -> Vec<Attribute> {
        let mut attrs = vec![Attribute::Uuid, Attribute::CompanyId];
        if self.flags.grouped {
            attrs.push(Attribute::GroupId);
        }
        if self.flags.audited {
            attrs.extend([Attribute::CompanyId, Attribute::CreateDate]);
        }
        if self.flags.resourced || self.identity_rule == IdentityRule::ResourceVersion {
            attrs.push(Attribute::ResourcePrimKey);
        }
        if self.identity_rule == IdentityRule::ResourceVersion {
            attrs.push(Attribute::Version);
        }
        if self.flags.staged {
            attrs.extend([Attribute::Uuid, Attribute::CompanyId, Attribute::CreateDate]);
        }
        if self.flags.workflowed {
            attrs.push(Attribute::Status);
        }
        attrs.extend(self.exact.iter().copied());

        let removals = self.variant.fetch_removals();
        let mut out = Vec::with_capacity(attrs.len());
        for attr in attrs {
            if !removals.contains(&attr) && !out.contains(&attr) {
                out.push(attr);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
