//! In-memory lineage store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::instrument;

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    validate_limit, validate_person_hash, validate_version, ChildrenSlice, LineageStore,
};

/// Normalized `(lowercased hash, version)` key.
type VersionKey = (String, u64);

fn version_key(person_hash: &str, version: u64) -> VersionKey {
    (person_hash.to_ascii_lowercase(), version)
}

#[derive(Debug, Clone)]
struct VersionRecord {
    tag: Option<String>,
    /// Children in insertion order, with the spelling used on insert.
    children: Vec<(String, u64)>,
}

/// In-memory implementation of [`LineageStore`].
///
/// Uses DashMap for thread-safe concurrent access. Listing a page is
/// O(limit); duplicate edge detection is O(children).
#[derive(Debug, Default)]
pub struct MemoryLineageStore {
    versions: DashMap<VersionKey, VersionRecord>,
}

impl MemoryLineageStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored person versions.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub(crate) fn insert_version(
        &self,
        person_hash: &str,
        version: u64,
        tag: Option<String>,
    ) -> StorageResult<()> {
        validate_person_hash(person_hash)?;
        validate_version(version)?;

        self.versions
            .entry(version_key(person_hash, version))
            .and_modify(|record| record.tag = tag.clone())
            .or_insert_with(|| VersionRecord {
                tag,
                children: Vec::new(),
            });
        Ok(())
    }

    pub(crate) fn insert_child(
        &self,
        parent_hash: &str,
        parent_version: u64,
        child_hash: &str,
        child_version: u64,
    ) -> StorageResult<()> {
        validate_person_hash(child_hash)?;
        validate_version(child_version)?;

        let mut parent = self
            .versions
            .get_mut(&version_key(parent_hash, parent_version))
            .ok_or_else(|| StorageError::VersionNotFound {
                person_hash: parent_hash.to_string(),
                version: parent_version,
            })?;

        let duplicate = parent
            .children
            .iter()
            .any(|(hash, v)| *v == child_version && hash.eq_ignore_ascii_case(child_hash));
        if !duplicate {
            parent
                .children
                .push((child_hash.to_string(), child_version));
        }
        Ok(())
    }

    fn not_found(person_hash: &str, version: u64) -> StorageError {
        StorageError::VersionNotFound {
            person_hash: person_hash.to_string(),
            version,
        }
    }
}

#[async_trait]
impl LineageStore for MemoryLineageStore {
    #[instrument(skip(self, tag))]
    async fn put_version(
        &self,
        person_hash: &str,
        version: u64,
        tag: Option<String>,
    ) -> StorageResult<()> {
        self.insert_version(person_hash, version, tag)
    }

    #[instrument(skip(self))]
    async fn add_child(
        &self,
        parent_hash: &str,
        parent_version: u64,
        child_hash: &str,
        child_version: u64,
    ) -> StorageResult<()> {
        self.insert_child(parent_hash, parent_version, child_hash, child_version)
    }

    #[instrument(skip(self))]
    async fn list_children(
        &self,
        person_hash: &str,
        version: u64,
        offset: u64,
        limit: u64,
    ) -> StorageResult<ChildrenSlice> {
        validate_limit(limit)?;

        let record = self
            .versions
            .get(&version_key(person_hash, version))
            .ok_or_else(|| Self::not_found(person_hash, version))?;

        let total = record.children.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(total);
        let end = start
            .saturating_add(usize::try_from(limit).unwrap_or(usize::MAX))
            .min(total);
        let (child_hashes, child_version_indices) =
            record.children[start..end].iter().cloned().unzip();

        Ok(ChildrenSlice {
            child_hashes,
            child_version_indices,
            total_count: total as u64,
            has_more: end < total,
            next_offset: end as u64,
        })
    }

    async fn get_tag(&self, person_hash: &str, version: u64) -> StorageResult<Option<String>> {
        self.versions
            .get(&version_key(person_hash, version))
            .map(|record| record.tag.clone())
            .ok_or_else(|| Self::not_found(person_hash, version))
    }

    async fn version_exists(&self, person_hash: &str, version: u64) -> StorageResult<bool> {
        Ok(self
            .versions
            .contains_key(&version_key(person_hash, version)))
    }
}
