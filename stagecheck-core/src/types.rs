//! Domain types shared by every stagecheck crate.
//!
//! Attribute names form a closed set: anything outside [`Attribute`] is
//! rejected when the model registry or a snapshot is loaded, never while
//! comparing records.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Fully qualified name of an entity type (e.g. `com.acme.journal.Article`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(pub String);

impl EntityType {
    /// Last dot-separated segment, used for compact display.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EntityType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityType {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of the handler (module) that owns the staging of an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(pub String);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for HandlerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HandlerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Logical scope (site / workspace) identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ScopeId(pub i64);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Tenant (company) identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TenantId(pub i64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which of the two compared datasets a record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Staging,
    Live,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Staging => "staging",
            Side::Live => "live",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// A tenant-partitioned grouping under which staging and live are compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub id: ScopeId,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub name: String,
    /// Handlers staged in this scope. `None` stages every handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staged_handlers: Option<BTreeSet<HandlerId>>,
}

impl Scope {
    pub fn new(id: i64, tenant_id: i64) -> Self {
        Self {
            id: ScopeId(id),
            tenant_id: TenantId(tenant_id),
            name: String::new(),
            staged_handlers: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_staged_handlers<I, H>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<HandlerId>,
    {
        self.staged_handlers = Some(handlers.into_iter().map(Into::into).collect());
        self
    }

    /// Whether content owned by `handler` is staged in this scope.
    pub fn stages(&self, handler: &HandlerId) -> bool {
        match &self.staged_handlers {
            Some(handlers) => handlers.contains(handler),
            None => true,
        }
    }

    /// `"<id> - <name>"`, or just the id when unnamed.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            format!("{} - {}", self.id, self.name)
        }
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Storage type of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Text,
    Timestamp,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Text => write!(f, "text"),
            ValueKind::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// Every attribute name a record, policy or snapshot may mention.
///
/// The first four are key attributes backed by dedicated [`crate::Record`]
/// fields; the rest live in the record's attribute bag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    Uuid,
    CompanyId,
    #[serde(alias = "scopeGroupId")]
    GroupId,
    ResourcePrimKey,
    CreateDate,
    #[serde(alias = "modified")]
    ModifiedDate,
    Status,
    Version,
    Name,
    Title,
    Description,
    Size,
}

impl Attribute {
    pub const ALL: [Attribute; 12] = [
        Attribute::Uuid,
        Attribute::CompanyId,
        Attribute::GroupId,
        Attribute::ResourcePrimKey,
        Attribute::CreateDate,
        Attribute::ModifiedDate,
        Attribute::Status,
        Attribute::Version,
        Attribute::Name,
        Attribute::Title,
        Attribute::Description,
        Attribute::Size,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Uuid => "uuid",
            Attribute::CompanyId => "companyId",
            Attribute::GroupId => "groupId",
            Attribute::ResourcePrimKey => "resourcePrimKey",
            Attribute::CreateDate => "createDate",
            Attribute::ModifiedDate => "modifiedDate",
            Attribute::Status => "status",
            Attribute::Version => "version",
            Attribute::Name => "name",
            Attribute::Title => "title",
            Attribute::Description => "description",
            Attribute::Size => "size",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Attribute::Uuid
            | Attribute::Version
            | Attribute::Name
            | Attribute::Title
            | Attribute::Description => ValueKind::Text,
            Attribute::CompanyId
            | Attribute::GroupId
            | Attribute::ResourcePrimKey
            | Attribute::Status
            | Attribute::Size => ValueKind::Integer,
            Attribute::CreateDate | Attribute::ModifiedDate => ValueKind::Timestamp,
        }
    }

    /// Key attributes map onto dedicated record fields instead of the bag.
    pub fn is_key(self) -> bool {
        matches!(
            self,
            Attribute::Uuid | Attribute::CompanyId | Attribute::GroupId | Attribute::ResourcePrimKey
        )
    }

    /// Display text that may be serialized as a per-locale map.
    pub fn is_localizable(self) -> bool {
        matches!(
            self,
            Attribute::Name | Attribute::Title | Attribute::Description
        )
    }

    /// Convert a raw snapshot value into a typed value for this attribute.
    ///
    /// `null` yields `Ok(None)`. Versions given as numbers keep a decimal
    /// point (`1` becomes `"1.0"`); timestamps accept RFC 3339 strings,
    /// `YYYY-MM-DD HH:MM:SS` (UTC) or epoch milliseconds.
    pub fn coerce(self, raw: &serde_json::Value) -> Result<Option<AttrValue>, RecordError> {
        use serde_json::Value;

        let unparseable = || RecordError::Unparseable {
            attribute: self,
            value: raw.to_string(),
        };

        if raw.is_null() {
            return Ok(None);
        }

        let value = match self.kind() {
            ValueKind::Integer => match raw {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().and_then(whole_i64))
                    .map(AttrValue::Integer)
                    .ok_or_else(unparseable)?,
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(AttrValue::Integer)
                    .map_err(|_| unparseable())?,
                _ => return Err(unparseable()),
            },
            ValueKind::Text => match raw {
                Value::String(s) if self == Attribute::Version => {
                    AttrValue::Text(s.replace(',', "."))
                }
                Value::String(s) => AttrValue::Text(s.clone()),
                Value::Number(n) if self == Attribute::Version => match n.as_i64() {
                    Some(i) => AttrValue::Text(format!("{i}.0")),
                    None => AttrValue::Text(format!("{:?}", n.as_f64().ok_or_else(unparseable)?)),
                },
                Value::Number(n) => AttrValue::Text(n.to_string()),
                Value::Object(_) if self.is_localizable() => AttrValue::Text(raw.to_string()),
                _ => return Err(unparseable()),
            },
            ValueKind::Timestamp => match raw {
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                    .map(AttrValue::Timestamp)
                    .ok_or_else(unparseable)?,
                Value::String(s) => parse_timestamp(s)
                    .map(AttrValue::Timestamp)
                    .ok_or_else(unparseable)?,
                _ => return Err(unparseable()),
            },
        };
        Ok(Some(value))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "modified" => return Ok(Attribute::ModifiedDate),
            "scopeGroupId" => return Ok(Attribute::GroupId),
            _ => {}
        }
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.as_str() == s)
            .ok_or_else(|| RecordError::UnknownAttribute { name: s.to_owned() })
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl AttrValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            AttrValue::Integer(_) => ValueKind::Integer,
            AttrValue::Text(_) => ValueKind::Text,
            AttrValue::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            AttrValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Integer(i) => write!(f, "{i}"),
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Integer(i)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(t: DateTime<Utc>) -> Self {
        AttrValue::Timestamp(t)
    }
}

/// `f` as an `i64` when it is a whole number inside the `i64` range.
fn whole_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (in_range && f.fract() == 0.0).then_some(f as i64)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
