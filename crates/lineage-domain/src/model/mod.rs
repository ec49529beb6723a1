//! Lineage node identity and the materialized tree.
//!
//! - `types`: node keys, emitted graph nodes and the inclusion filter contract
//! - `tree`: arena-backed tree built by one walk session

mod tree;
mod types;

#[cfg(test)]
mod types_proptest;

pub use tree::{LineageTree, NodeId, TreeNode};
pub use types::{
    validate_person_hash, validate_version, FilterDecision, FilterInput, GraphNode, NodeFilter,
    NodeKey, PERSON_HASH_HEX_LEN,
};
