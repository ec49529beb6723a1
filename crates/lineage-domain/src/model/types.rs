//! Core lineage types: node identity, emitted nodes and filter decisions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Number of hex digits in a person hash (32 bytes, `0x` prefix optional).
pub const PERSON_HASH_HEX_LEN: usize = 64;

/// Validates that a person hash is a fixed-length hex identifier.
pub fn validate_person_hash(value: &str) -> DomainResult<()> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    if digits.len() != PERSON_HASH_HEX_LEN || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DomainError::InvalidPersonHash {
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validates that a version index is positive.
pub fn validate_version(person_hash: &str, version: u64) -> DomainResult<()> {
    if version == 0 {
        return Err(DomainError::InvalidVersion {
            person_hash: person_hash.to_string(),
            version,
        });
    }
    Ok(())
}

/// Normalized identity of one version of one person record.
///
/// The hash is lowercased so that keys compare case-insensitively; callers
/// that talk to the relation reader keep the original spelling separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    hash: String,
    version: u64,
}

impl NodeKey {
    /// Creates a key, lowercasing the hash.
    pub fn new(person_hash: &str, version: u64) -> Self {
        Self {
            hash: person_hash.to_ascii_lowercase(),
            version,
        }
    }

    /// The lowercased person hash.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Node-level cache key: `<hash>-v-<version>`.
    pub fn cache_key(&self) -> String {
        format!("{}-v-{}", self.hash, self.version)
    }

    /// Page-level cache key: `<hash>-v-<version>:o:<offset>`.
    pub fn page_cache_key(&self, offset: u64) -> String {
        format!("{}-v-{}:o:{}", self.hash, self.version, offset)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v-{}", self.hash, self.version)
    }
}

/// A node materialized by a walk.
///
/// Emitted once per included key, in discovery order. `parent` is the key of
/// the nearest included ancestor (the root for top-level inclusions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Person hash as reported by the relation source (original case).
    pub person_hash: String,
    pub version_index: u64,
    pub key: NodeKey,
    pub tag: Option<String>,
    /// Depth in the relation graph; the root is at depth 1.
    pub depth: u32,
    pub parent: Option<NodeKey>,
}

impl GraphNode {
    pub fn new(person_hash: impl Into<String>, version_index: u64, depth: u32) -> Self {
        let person_hash = person_hash.into();
        let key = NodeKey::new(&person_hash, version_index);
        Self {
            person_hash,
            version_index,
            key,
            tag: None,
            depth,
            parent: None,
        }
    }

    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_parent(mut self, parent: Option<NodeKey>) -> Self {
        self.parent = parent;
        self
    }
}

/// What the filter sees for each visited key.
#[derive(Debug, Clone, Copy)]
pub struct FilterInput<'a> {
    pub person_hash: &'a str,
    pub version_index: u64,
    pub depth: u32,
    pub tag: Option<&'a str>,
}

/// Inclusion and descent decision for one visited key.
///
/// `include` controls whether a node is materialized and yielded; `descend`
/// controls whether its children are explored. The two are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDecision {
    pub include: bool,
    pub descend: bool,
}

impl FilterDecision {
    pub fn new(include: bool, descend: bool) -> Self {
        Self { include, descend }
    }

    /// Explore the subtree without materializing this node.
    pub fn descend_only() -> Self {
        Self::new(false, true)
    }

    /// Materialize this node but do not explore its children.
    pub fn include_only() -> Self {
        Self::new(true, false)
    }
}

impl Default for FilterDecision {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl From<bool> for FilterDecision {
    fn from(value: bool) -> Self {
        Self::new(value, value)
    }
}

/// Per-node inclusion filter.
///
/// Any `Fn(&FilterInput) -> FilterDecision` closure is a filter.
pub trait NodeFilter: Send + Sync {
    fn decide(&self, input: &FilterInput<'_>) -> FilterDecision;
}

impl<F> NodeFilter for F
where
    F: Fn(&FilterInput<'_>) -> FilterDecision + Send + Sync,
{
    fn decide(&self, input: &FilterInput<'_>) -> FilterDecision {
        self(input)
    }
}
