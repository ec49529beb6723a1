//! Adapters that bridge the storage layer to the domain layer.
//!
//! The domain layer (lineage-domain) reads relations through the
//! `RelationReader` trait. The storage layer (lineage-storage) implements
//! `LineageStore`. This module connects the two.

use std::sync::Arc;

use async_trait::async_trait;

use lineage_domain::error::{DomainError, DomainResult};
use lineage_domain::walker::{ChildrenListing, RelationReader};
use lineage_storage::{LineageStore, StorageError, MAX_PAGE_LIMIT};

/// Adapter that implements `RelationReader` using a `LineageStore`.
///
/// People referenced as children but without a record of their own are
/// treated as leaves: they list no children and carry no tag.
pub struct StoreRelationReader<S: LineageStore> {
    storage: Arc<S>,
}

impl<S: LineageStore> StoreRelationReader<S> {
    /// Creates a new adapter wrapping the given storage.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

fn storage_error(error: StorageError) -> DomainError {
    DomainError::RelationRead {
        message: format!("storage error: {}", error),
    }
}

#[async_trait]
impl<S: LineageStore> RelationReader for StoreRelationReader<S> {
    async fn list_children(
        &self,
        person_hash: &str,
        version: u64,
        offset: u64,
        limit: u64,
    ) -> DomainResult<ChildrenListing> {
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        match self
            .storage
            .list_children(person_hash, version, offset, limit)
            .await
        {
            Ok(slice) => Ok(ChildrenListing {
                child_hashes: slice.child_hashes,
                child_version_indices: slice.child_version_indices,
                total_count: slice.total_count,
                has_more: slice.has_more,
                next_offset: slice.next_offset,
            }),
            Err(StorageError::VersionNotFound { .. }) => Ok(ChildrenListing {
                next_offset: offset,
                ..ChildrenListing::default()
            }),
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn get_node_tag(&self, person_hash: &str, version: u64) -> DomainResult<Option<String>> {
        match self.storage.get_tag(person_hash, version).await {
            Ok(tag) => Ok(tag),
            Err(StorageError::VersionNotFound { .. }) => Ok(None),
            Err(e) => Err(storage_error(e)),
        }
    }
}
