//! Remote page cache for lineage walks.
//!
//! Memoizes the two remote lookups a walk performs: per-node metadata (the
//! tag) and per-(node, offset) children pages. Storage is Moka's async cache,
//! which also coalesces concurrent loads of the same key so that a node
//! reachable through several parents is fetched once.
//!
//! # Key Design
//!
//! Keys are built from the normalized [`NodeKey`]: `<hash>-v-<version>` for
//! metadata and `<hash>-v-<version>:o:<offset>` for pages. The original hash
//! spelling is passed through to the relation reader untouched.
//!
//! # Lifetime
//!
//! A cache is created per walk unless the caller supplies a shared
//! `Arc<PageCache>` through the walk options. Entries are never invalidated:
//! a failed read is stored as an empty, terminal page flagged `degraded` so
//! that it is not retried on every revisit.

use std::sync::Arc;

use moka::future::Cache;

use crate::model::NodeKey;
use crate::walker::ChildrenListing;

/// Configuration for the page cache.
#[derive(Debug, Clone)]
pub struct PageCacheConfig {
    /// Maximum number of entries per cache (metadata and pages separately).
    ///
    /// Repeated lookups are served without a remote read only while the
    /// entry stays resident; a capacity below the number of keys a walk
    /// touches lets moka evict and the reader is called again.
    pub max_capacity: u64,
}

impl Default for PageCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 250_000,
        }
    }
}

impl PageCacheConfig {
    /// Sets the maximum capacity.
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

/// Cached node metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMeta {
    pub tag: Option<String>,
    /// The metadata read failed and was replaced by an empty entry.
    pub degraded: bool,
}

impl VersionMeta {
    pub fn new(tag: Option<String>) -> Self {
        Self {
            tag,
            degraded: false,
        }
    }

    pub fn degraded() -> Self {
        Self {
            tag: None,
            degraded: true,
        }
    }
}

/// One cached page of children for a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenPage {
    pub child_hashes: Vec<String>,
    pub child_version_indices: Vec<u64>,
    pub has_more: bool,
    pub next_offset: u64,
    pub page_offset: u64,
    /// The page read failed and was replaced by an empty terminal page.
    pub degraded: bool,
}

impl ChildrenPage {
    /// Builds a page from a relation reader listing.
    pub fn from_listing(listing: ChildrenListing, page_offset: u64) -> Self {
        Self {
            child_hashes: listing.child_hashes,
            child_version_indices: listing.child_version_indices,
            has_more: listing.has_more,
            next_offset: listing.next_offset,
            page_offset,
            degraded: false,
        }
    }

    /// Empty, terminal page stored in place of a failed read.
    pub fn exhausted(page_offset: u64) -> Self {
        Self {
            page_offset,
            next_offset: page_offset,
            degraded: true,
            ..Default::default()
        }
    }

    /// Children as `(hash, version)` pairs in source order.
    pub fn children(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.child_hashes
            .iter()
            .map(String::as_str)
            .zip(self.child_version_indices.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.child_hashes.len().min(self.child_version_indices.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset of the next page, if there is one and it moves forward.
    pub fn next_page_offset(&self) -> Option<u64> {
        (self.has_more && self.next_offset > self.page_offset).then_some(self.next_offset)
    }
}

/// Memoized node metadata and children pages.
pub struct PageCache {
    versions: Cache<String, Arc<VersionMeta>>,
    pages: Cache<String, Arc<ChildrenPage>>,
    config: PageCacheConfig,
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("config", &self.config)
            .field("version_entries", &self.versions.entry_count())
            .field("page_entries", &self.pages.entry_count())
            .finish()
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new(PageCacheConfig::default())
    }
}

impl PageCache {
    /// Creates a new page cache with the given configuration.
    pub fn new(config: PageCacheConfig) -> Self {
        Self {
            versions: Cache::builder().max_capacity(config.max_capacity).build(),
            pages: Cache::builder().max_capacity(config.max_capacity).build(),
            config,
        }
    }

    pub fn config(&self) -> &PageCacheConfig {
        &self.config
    }

    /// Returns cached metadata without touching the relation reader.
    pub async fn get_version(&self, key: &NodeKey) -> Option<Arc<VersionMeta>> {
        self.versions.get(&key.cache_key()).await
    }

    /// Returns a cached page without touching the relation reader.
    pub async fn get_page(&self, key: &NodeKey, offset: u64) -> Option<Arc<ChildrenPage>> {
        self.pages.get(&key.page_cache_key(offset)).await
    }

    /// Approximate number of entries across both caches.
    pub fn entry_count(&self) -> u64 {
        self.versions.entry_count() + self.pages.entry_count()
    }

    /// Runs pending maintenance so that `entry_count` is up to date.
    pub async fn run_pending_tasks(&self) {
        self.versions.run_pending_tasks().await;
        self.pages.run_pending_tasks().await;
    }

    pub(crate) fn versions(&self) -> &Cache<String, Arc<VersionMeta>> {
        &self.versions
    }

    pub(crate) fn pages(&self) -> &Cache<String, Arc<ChildrenPage>> {
        &self.pages
    }
}
