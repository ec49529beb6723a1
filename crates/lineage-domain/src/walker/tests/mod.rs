//! Tests for the lineage walker.
//!
//! Organized by functionality:
//! - Traversal order (DFS, BFS, pagination)
//! - Safety limits (depth, revisits, hard node limit)
//! - Filters and anchoring
//! - Caching and fetch failures
//! - Adaptive concurrency and observers
//! - Cancellation and streaming

mod mocks;
