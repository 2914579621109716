//! Fixture files for the in-memory backend
//!
//! A fixture is a JSON document holding collections of records and
//! per-user aggregate documents:
//!
//! ```json
//! {
//!   "collections": {
//!     "tasks": [{"id": "t1", "status": "Negado", "date": {"seconds": 1700000000}}]
//!   },
//!   "aggregates": [
//!     {"collection": "modalities", "item": "m1", "user": "u1", "fields": {"total": 5}}
//!   ]
//! }
//! ```

use super::memory::MemoryBackend;
use super::types::AggregatePath;
use crate::error::{Error, Result};
use crate::types::{JsonObject, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Seed data for a `MemoryBackend`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Records by collection name
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<Record>>,

    /// Aggregate documents
    #[serde(default)]
    pub aggregates: Vec<AggregateEntry>,
}

/// One aggregate document of a fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateEntry {
    /// Parent collection
    pub collection: String,
    /// Parent record id
    pub item: String,
    /// Aggregate sub-collection
    #[serde(default = "default_sub_collection")]
    pub sub_collection: String,
    /// Owning user id
    pub user: String,
    /// Document fields
    #[serde(default)]
    pub fields: JsonObject,
}

fn default_sub_collection() -> String {
    "user_times".to_string()
}

impl AggregateEntry {
    /// Location of this document
    pub fn path(&self) -> AggregatePath {
        AggregatePath::new(
            &self.collection,
            &self.item,
            &self.sub_collection,
            &self.user,
        )
    }
}

impl Fixture {
    /// Parse a fixture from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let fixture: Self = serde_json::from_str(json)?;
        fixture.validate()?;
        Ok(fixture)
    }

    /// Load a fixture file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read fixture '{}': {e}",
                    path.display()
                ))
            }
        })?;
        Self::from_json_str(&content)
    }

    /// Total number of records across collections
    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Insert everything into `backend`
    pub fn seed(&self, backend: &MemoryBackend) {
        for (collection, records) in &self.collections {
            debug!("Seeding {} records into '{collection}'", records.len());
            backend.insert_many(collection, records.iter().cloned());
        }
        for entry in &self.aggregates {
            backend.set_aggregate(entry.path(), entry.fields.clone());
        }
    }

    /// Build a backend holding this fixture
    pub fn into_backend(self) -> MemoryBackend {
        let backend = MemoryBackend::new();
        self.seed(&backend);
        backend
    }

    fn validate(&self) -> Result<()> {
        for (collection, records) in &self.collections {
            let mut seen = std::collections::HashSet::new();
            for record in records {
                if record.id.is_empty() {
                    return Err(Error::config(format!(
                        "Record without id in collection '{collection}'"
                    )));
                }
                if !seen.insert(record.id.as_str()) {
                    return Err(Error::config(format!(
                        "Duplicate id '{}' in collection '{collection}'",
                        record.id
                    )));
                }
            }
        }
        Ok(())
    }
}
