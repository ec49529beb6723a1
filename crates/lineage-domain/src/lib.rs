//! lineage-domain: Core lineage traversal logic
//!
//! This crate contains the incremental lineage walker:
//! - Node identity and the materialized lineage tree
//! - Session page cache in front of the relation reader
//! - DFS/BFS traversal with filters, limits, cancellation and streaming
//! - Adaptive fan-out and progress metrics
//! - Flattening of the tree into renderable rows
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               lineage-domain                 │
//! ├─────────────────────────────────────────────┤
//! │  model/   - Node keys, filters & tree       │
//! │  cache/   - Memoized metadata & pages       │
//! │  walker/  - Traversal engine                │
//! │  flatten/ - Row view for rendering          │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod flatten;
pub mod model;
pub mod walker;

// Re-export commonly used types at the crate root
pub use cache::{PageCache, PageCacheConfig};
pub use error::{DomainError, DomainResult};
pub use flatten::{flatten, ExpandState, FlatRow};
pub use model::{FilterDecision, FilterInput, GraphNode, LineageTree, NodeFilter, NodeId, NodeKey};
pub use walker::{
    FanOut, FetchErrorPolicy, FetchPolicy, LineageWalker, RelationReader, Traversal, WalkObserver,
    WalkOptions, WalkOutcome, WalkStream, WalkerMetrics,
};
