//! LineageStore trait definition.

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

/// Number of hex digits in a person hash.
const PERSON_HASH_HEX_LEN: usize = 64;

/// Upper bound for a single children page.
pub const MAX_PAGE_LIMIT: u64 = 1_000;

/// One page of children, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenSlice {
    pub child_hashes: Vec<String>,
    pub child_version_indices: Vec<u64>,
    /// Total children of the parent, across all pages.
    pub total_count: u64,
    pub has_more: bool,
    /// Offset of the next page; equals `total_count` on the last page.
    pub next_offset: u64,
}

/// Validates a person hash: `0x` prefix optional, 64 hex digits.
pub fn validate_person_hash(person_hash: &str) -> StorageResult<()> {
    let digits = person_hash
        .strip_prefix("0x")
        .or_else(|| person_hash.strip_prefix("0X"))
        .unwrap_or(person_hash);
    if digits.len() != PERSON_HASH_HEX_LEN {
        return Err(StorageError::InvalidInput {
            message: format!(
                "person hash must have {} hex digits, got {}",
                PERSON_HASH_HEX_LEN,
                digits.len()
            ),
        });
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(StorageError::InvalidInput {
            message: format!("person hash is not hex: {}", person_hash),
        });
    }
    Ok(())
}

/// Validates a version index (1-based).
pub fn validate_version(version: u64) -> StorageResult<()> {
    if version == 0 {
        return Err(StorageError::InvalidInput {
            message: "version index must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Validates a page limit.
pub fn validate_limit(limit: u64) -> StorageResult<()> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(StorageError::InvalidInput {
            message: format!("page limit must be between 1 and {}", MAX_PAGE_LIMIT),
        });
    }
    Ok(())
}

/// Abstract storage interface for lineage relations.
///
/// Implementations must be thread-safe (Send + Sync). Person hashes are
/// compared case-insensitively; the spelling used on insert is what reads
/// return.
#[async_trait]
pub trait LineageStore: Send + Sync + 'static {
    // Writes

    /// Creates or updates a person version with an optional tag.
    async fn put_version(
        &self,
        person_hash: &str,
        version: u64,
        tag: Option<String>,
    ) -> StorageResult<()>;

    /// Appends a child edge. The parent version must exist; adding the same
    /// edge twice is a no-op.
    async fn add_child(
        &self,
        parent_hash: &str,
        parent_version: u64,
        child_hash: &str,
        child_version: u64,
    ) -> StorageResult<()>;

    // Reads

    /// Lists up to `limit` children starting at `offset`.
    async fn list_children(
        &self,
        person_hash: &str,
        version: u64,
        offset: u64,
        limit: u64,
    ) -> StorageResult<ChildrenSlice>;

    /// Gets the tag of a person version.
    async fn get_tag(&self, person_hash: &str, version: u64) -> StorageResult<Option<String>>;

    /// Returns true when the person version exists.
    async fn version_exists(&self, person_hash: &str, version: u64) -> StorageResult<bool>;
}
