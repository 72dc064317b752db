//! One entity instance read from one dataset (staging or live).
//!
//! Records are built once by a data source and never mutated afterwards;
//! every builder method consumes and returns `Self`.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::RecordError;
use crate::types::{AttrValue, Attribute, EntityType, ScopeId, TenantId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    entity_type: EntityType,
    identity_key: Option<String>,
    local_key: i64,
    secondary_key: Option<i64>,
    scope_id: ScopeId,
    tenant_id: TenantId,
    attributes: BTreeMap<Attribute, AttrValue>,
}

impl Record {
    pub fn new(
        entity_type: impl Into<EntityType>,
        tenant_id: i64,
        scope_id: i64,
        local_key: i64,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            identity_key: None,
            local_key,
            secondary_key: None,
            scope_id: ScopeId(scope_id),
            tenant_id: TenantId(tenant_id),
            attributes: BTreeMap::new(),
        }
    }

    /// An empty key is treated as no key at all.
    pub fn with_identity_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.identity_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    pub fn with_secondary_key(mut self, key: i64) -> Self {
        self.secondary_key = Some(key);
        self
    }

    /// Set a typed attribute.
    ///
    /// Key attributes update the matching key field; everything else goes
    /// into the attribute bag. The value kind must match [`Attribute::kind`].
    pub fn with_attribute(
        mut self,
        attribute: Attribute,
        value: impl Into<AttrValue>,
    ) -> Result<Self, RecordError> {
        let value = value.into();
        if value.kind() != attribute.kind() {
            return Err(RecordError::KindMismatch {
                attribute,
                expected: attribute.kind(),
                found: value.kind(),
            });
        }
        match (attribute, value) {
            (Attribute::Uuid, AttrValue::Text(key)) => return Ok(self.with_identity_key(key)),
            (Attribute::CompanyId, AttrValue::Integer(id)) => self.tenant_id = TenantId(id),
            (Attribute::GroupId, AttrValue::Integer(id)) => self.scope_id = ScopeId(id),
            (Attribute::ResourcePrimKey, AttrValue::Integer(key)) => self.secondary_key = Some(key),
            (attribute, value) => {
                self.attributes.insert(attribute, value);
            }
        }
        Ok(self)
    }

    /// Set an attribute from an untyped snapshot value. `null` leaves the
    /// record unchanged.
    pub fn with_raw_attribute(
        self,
        attribute: Attribute,
        raw: &serde_json::Value,
    ) -> Result<Self, RecordError> {
        match attribute.coerce(raw)? {
            Some(value) => self.with_attribute(attribute, value),
            None => Ok(self),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn identity_key(&self) -> Option<&str> {
        self.identity_key.as_deref()
    }

    pub fn local_key(&self) -> i64 {
        self.local_key
    }

    pub fn secondary_key(&self) -> Option<i64> {
        self.secondary_key
    }

    pub fn scope_id(&self) -> ScopeId {
        self.scope_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Uniform typed lookup across key fields and the attribute bag.
    pub fn get(&self, attribute: Attribute) -> Option<Cow<'_, AttrValue>> {
        match attribute {
            Attribute::Uuid => self
                .identity_key
                .as_ref()
                .map(|k| Cow::Owned(AttrValue::Text(k.clone()))),
            Attribute::CompanyId => Some(Cow::Owned(AttrValue::Integer(self.tenant_id.0))),
            Attribute::GroupId => Some(Cow::Owned(AttrValue::Integer(self.scope_id.0))),
            Attribute::ResourcePrimKey => {
                self.secondary_key.map(|k| Cow::Owned(AttrValue::Integer(k)))
            }
            other => self.attributes.get(&other).map(Cow::Borrowed),
        }
    }

    pub fn create_date(&self) -> Option<DateTime<Utc>> {
        self.timestamp(Attribute::CreateDate)
    }

    pub fn modified_date(&self) -> Option<DateTime<Utc>> {
        self.timestamp(Attribute::ModifiedDate)
    }

    pub fn status(&self) -> Option<i64> {
        self.attributes.get(&Attribute::Status).and_then(AttrValue::as_integer)
    }

    pub fn size(&self) -> Option<i64> {
        self.attributes.get(&Attribute::Size).and_then(AttrValue::as_integer)
    }

    pub fn version(&self) -> Option<&str> {
        self.text(Attribute::Version)
    }

    pub fn name(&self) -> Option<&str> {
        self.text(Attribute::Name)
    }

    pub fn title(&self) -> Option<&str> {
        self.text(Attribute::Title)
    }

    pub fn description(&self) -> Option<&str> {
        self.text(Attribute::Description)
    }

    fn text(&self, attribute: Attribute) -> Option<&str> {
        self.attributes.get(&attribute).and_then(AttrValue::as_text)
    }

    fn timestamp(&self, attribute: Attribute) -> Option<DateTime<Utc>> {
        self.attributes.get(&attribute).and_then(AttrValue::as_timestamp)
    }

    /// One-line rendering for log dumps:
    /// entity type, tenant, scope, local key, secondary key, identity key,
    /// create date, modified date, status, version, name, title.
    pub fn summary_line(&self, sep: &str) -> String {
        fn opt<T: ToString>(v: Option<T>) -> String {
            v.map(|v| v.to_string()).unwrap_or_default()
        }

        [
            self.entity_type.to_string(),
            self.tenant_id.to_string(),
            self.scope_id.to_string(),
            self.local_key.to_string(),
            opt(self.secondary_key),
            opt(self.identity_key()),
            opt(self.create_date().map(|d| d.to_rfc3339())),
            opt(self.modified_date().map(|d| d.to_rfc3339())),
            opt(self.status()),
            opt(self.version()),
            opt(self.name()),
            opt(self.title()),
        ]
        .join(sep)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
