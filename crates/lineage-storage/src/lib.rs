//! lineage-storage: Lineage relation storage
//!
//! This crate provides the relation source behind the walker CLI:
//! - LineageStore trait for paginated parent -> children reads
//! - In-memory implementation
//! - JSON fixture loader
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              lineage-storage                 │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs  - LineageStore trait            │
//! │  memory.rs  - In-memory implementation      │
//! │  fixture.rs - JSON fixture loader           │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod fixture;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use fixture::{load_fixture, load_fixture_str, FixtureDocument};
pub use memory::MemoryLineageStore;
pub use traits::{ChildrenSlice, LineageStore, MAX_PAGE_LIMIT};
