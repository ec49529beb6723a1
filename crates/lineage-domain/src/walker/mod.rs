//! Incremental lineage walker.
//!
//! Walks parent -> children relations exposed by a paginated
//! [`RelationReader`], turning remote reads into a [`LineageTree`] while
//! yielding nodes as they are discovered.
//!
//! # Components
//!
//! - [`PageCache`](crate::cache::PageCache) memoizes node metadata and
//!   children pages; it is the only caller of the reader.
//! - [`AbortGate`] wraps the caller's cancellation token.
//! - [`AdaptiveConcurrency`] retunes the fan-out width from the moving
//!   average of page latencies.
//! - [`MetricsRecorder`] keeps counters and reports them to a
//!   [`WalkObserver`].
//! - [`LineageWalker`] drives DFS or BFS traversal.
//!
//! # Safety limits
//!
//! - Depth: nodes deeper than `max_depth` are never visited.
//! - Revisits: each `(hash, version)` key is visited at most once per walk.
//! - Hard node limit: once reached, the whole walk stops.
//!
//! [`LineageTree`]: crate::model::LineageTree

mod abort;
mod concurrency;
mod config;
mod driver;
mod loader;
mod metrics;
mod observer;
mod session;
mod stream;
mod traits;

#[cfg(test)]
mod tests;

pub use abort::AbortGate;
pub use concurrency::{AdaptiveConcurrency, FAST_PAGE_MS, SLOW_PAGE_MS};
pub use config::{FanOut, FetchErrorPolicy, FetchPolicy, Traversal, WalkOptions};
pub use driver::LineageWalker;
pub use metrics::{ema, LookupKind, MetricsRecorder, Progress, WalkerMetrics};
pub use observer::WalkObserver;
pub use stream::{WalkOutcome, WalkStream};
pub use traits::{ChildrenListing, RelationReader};
