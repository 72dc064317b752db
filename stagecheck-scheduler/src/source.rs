//! Record retrieval.
//!
//! # Snapshot layout ([`FileDataSource`])
//!
//! ```text
//! <root>/
//!   scopes.json                               ([{ id, tenantId, name, stagedHandlers }])
//!   staging/<tenant>/<scope>/<entity-type>.json
//!   live/<tenant>/<scope>/<entity-type>.json
//! ```
//!
//! Each record file is a JSON array of [`RawRecord`]s. A missing file is an
//! empty dataset.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use stagecheck_core::{Attribute, ComparisonPolicy, EntityType, Record, Scope, Side};

use crate::error::{io_err, SourceError};

/// Supplies the records of one entity type in one scope for one side.
///
/// A call returns a consistent snapshot or an error, never a partial set.
pub trait DataSource: Send + Sync {
    fn fetch(
        &self,
        scope: &Scope,
        policy: &ComparisonPolicy,
        side: Side,
    ) -> Result<Vec<Record>, SourceError>;
}

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// On-disk record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default)]
    pub uuid: Option<String>,
    pub pk: i64,
    #[serde(default)]
    pub resource_prim_key: Option<i64>,
    #[serde(default)]
    pub company_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl RawRecord {
    /// Build a typed record, keeping only the attributes `policy` fetches.
    /// Missing tenant and scope ids default to the scope being read.
    pub fn into_record(
        self,
        scope: &Scope,
        policy: &ComparisonPolicy,
    ) -> Result<Record, stagecheck_core::RecordError> {
        let fetched = policy.fetch_attributes();
        let mut record = Record::new(
            policy.entity_type().clone(),
            self.company_id.unwrap_or(scope.tenant_id.0),
            self.group_id.unwrap_or(scope.id.0),
            self.pk,
        );
        if let Some(uuid) = self.uuid {
            record = record.with_identity_key(uuid);
        }
        if let Some(key) = self.resource_prim_key {
            record = record.with_secondary_key(key);
        }
        for (name, raw) in &self.attributes {
            let attribute = Attribute::from_str(name)?;
            if attribute.is_key() || !fetched.contains(&attribute) {
                continue;
            }
            record = record.with_raw_attribute(attribute, raw)?;
        }
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// FileDataSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileDataSource {
    root: PathBuf,
}

impl FileDataSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<side>/<tenant>/<scope>/<entity-type>.json`, pure, no I/O.
    pub fn record_path(&self, side: Side, scope: &Scope, entity_type: &EntityType) -> PathBuf {
        self.root
            .join(side.as_str())
            .join(scope.tenant_id.to_string())
            .join(scope.id.to_string())
            .join(format!("{entity_type}.json"))
    }

    /// `<root>/scopes.json`, pure, no I/O.
    pub fn scopes_path(&self) -> PathBuf {
        self.root.join("scopes.json")
    }

    /// Scopes listed in `scopes.json`, in file order.
    pub fn load_scopes(&self) -> Result<Vec<Scope>, SourceError> {
        let path = self.scopes_path();
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        serde_json::from_str(&contents).map_err(|source| SourceError::Json { path, source })
    }
}

impl DataSource for FileDataSource {
    fn fetch(
        &self,
        scope: &Scope,
        policy: &ComparisonPolicy,
        side: Side,
    ) -> Result<Vec<Record>, SourceError> {
        let path = self.record_path(side, scope, policy.entity_type());
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_err(&path, err)),
        };
        let raw: Vec<RawRecord> = serde_json::from_str(&contents).map_err(|source| {
            SourceError::Json {
                path: path.clone(),
                source,
            }
        })?;

        raw.into_iter()
            .enumerate()
            .map(|(index, raw)| {
                raw.into_record(scope, policy)
                    .map_err(|source| SourceError::Record {
                        path: path.clone(),
                        index,
                        source,
                    })
            })
            .collect()
    }
}
