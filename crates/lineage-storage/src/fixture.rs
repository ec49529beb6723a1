//! JSON fixtures for seeding a memory store.
//!
//! ```json
//! {
//!   "people": [
//!     {
//!       "hash": "0x…",
//!       "version": 1,
//!       "tag": "Ada",
//!       "children": [{ "hash": "0x…", "version": 1 }]
//!     }
//!   ]
//! }
//! ```
//!
//! `version` defaults to 1 everywhere. Children may reference people that
//! have no entry of their own; those are leaves.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::memory::MemoryLineageStore;

fn default_version() -> u64 {
    1
}

/// A whole fixture document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureDocument {
    #[serde(default)]
    pub people: Vec<FixturePerson>,
}

/// One person version and its children.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixturePerson {
    pub hash: String,
    #[serde(default = "default_version")]
    pub version: u64,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub children: Vec<FixtureChild>,
}

/// Reference to a child version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureChild {
    pub hash: String,
    #[serde(default = "default_version")]
    pub version: u64,
}

impl FixtureDocument {
    /// Builds a memory store from this document.
    ///
    /// All people are inserted before any edge, so children may be listed
    /// before their own entry.
    pub fn into_store(self) -> StorageResult<MemoryLineageStore> {
        let store = MemoryLineageStore::new();
        for person in &self.people {
            store
                .insert_version(&person.hash, person.version, person.tag.clone())
                .map_err(|e| fixture_error(&person.hash, e))?;
        }

        let mut edges = 0usize;
        for person in &self.people {
            for child in &person.children {
                store
                    .insert_child(&person.hash, person.version, &child.hash, child.version)
                    .map_err(|e| fixture_error(&person.hash, e))?;
                edges += 1;
            }
        }

        debug!(people = store.len(), edges, "Loaded lineage fixture");
        Ok(store)
    }
}

fn fixture_error(person_hash: &str, error: StorageError) -> StorageError {
    StorageError::Fixture {
        message: format!("entry {}: {}", person_hash, error),
    }
}

/// Parses a fixture from a JSON string.
pub fn load_fixture_str(json: &str) -> StorageResult<MemoryLineageStore> {
    let document: FixtureDocument =
        serde_json::from_str(json).map_err(|e| StorageError::Fixture {
            message: format!("invalid fixture JSON: {}", e),
        })?;
    document.into_store()
}

/// Reads and parses a fixture file.
pub fn load_fixture(path: impl AsRef<Path>) -> StorageResult<MemoryLineageStore> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| StorageError::Fixture {
        message: format!("cannot read {}: {}", path.display(), e),
    })?;
    load_fixture_str(&json)
}
