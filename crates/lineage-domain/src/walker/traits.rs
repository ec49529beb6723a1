//! Read-only relation source consumed by the walker.

use async_trait::async_trait;

use crate::error::DomainResult;

/// One page of children as reported by the relation source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenListing {
    pub child_hashes: Vec<String>,
    pub child_version_indices: Vec<u64>,
    /// Total number of children; informational, not used by the walk.
    pub total_count: u64,
    pub has_more: bool,
    pub next_offset: u64,
}

/// Positional form used by contract-style readers:
/// `(child_hashes, child_version_indices, total_count, has_more, next_offset)`.
impl From<(Vec<String>, Vec<u64>, u64, bool, u64)> for ChildrenListing {
    fn from(
        (child_hashes, child_version_indices, total_count, has_more, next_offset): (
            Vec<String>,
            Vec<u64>,
            u64,
            bool,
            u64,
        ),
    ) -> Self {
        Self {
            child_hashes,
            child_version_indices,
            total_count,
            has_more,
            next_offset,
        }
    }
}

/// Paginated parent -> children relation reader.
///
/// The page cache is the only caller; everything else in the walk goes
/// through the cache.
#[async_trait]
pub trait RelationReader: Send + Sync {
    /// Lists up to `limit` children of a node version, starting at `offset`.
    async fn list_children(
        &self,
        person_hash: &str,
        version: u64,
        offset: u64,
        limit: u64,
    ) -> DomainResult<ChildrenListing>;

    /// Fetches the short descriptive tag of a node version.
    ///
    /// Default implementation returns no tag without any I/O. Override when
    /// the relation source exposes tags.
    async fn get_node_tag(&self, _person_hash: &str, _version: u64) -> DomainResult<Option<String>> {
        Ok(None)
    }
}
