//! Configuration for a lineage walk.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::cache::PageCache;
use crate::model::{FilterDecision, FilterInput, NodeFilter};

use super::observer::WalkObserver;

/// Traversal strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Traversal {
    /// Depth-first: each child's subtree completes before the next sibling.
    #[default]
    Dfs,
    /// Breadth-first: level order through a queue.
    Bfs,
}

/// How children inside one batch are processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOut {
    /// Each child's subtree is awaited before the next one starts. The batch
    /// width only shapes batching and page prefetch; yield order is
    /// deterministic.
    #[default]
    Sequential,
    /// All children of a batch are walked concurrently. Yield order inside a
    /// batch follows completion order.
    Concurrent,
}

/// What to do when a remote read keeps failing after its retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorPolicy {
    /// Cache an empty terminal result and keep walking; the outcome is
    /// flagged `partial`.
    #[default]
    Truncate,
    /// Fail the walk with `DomainError::RelationRead`.
    Fail,
}

/// Retry and failure handling for remote reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff: Duration,
    pub on_error: FetchErrorPolicy,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            backoff: Duration::from_millis(200),
            on_error: FetchErrorPolicy::Truncate,
        }
    }
}

impl FetchPolicy {
    /// Delay before retry number `attempt` (0-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Options for one walk.
///
/// Numeric bounds are clamped when the walk starts: `page_size >= 1`,
/// `parallel >= 1`, `1 <= min_parallel <= max_parallel`, and `parallel`
/// within those bounds. Unset `min_parallel` / `max_parallel` default to
/// `1` and `2 * parallel`.
#[derive(Clone)]
pub struct WalkOptions {
    /// Nodes deeper than this are not visited; nodes at exactly this depth
    /// are visited but never expanded. The root is at depth 1.
    pub max_depth: u32,
    /// Children requested per page.
    pub page_size: u64,
    /// Initial fan-out width.
    pub parallel: usize,
    /// Global cap on materialized nodes.
    pub hard_node_limit: u64,
    pub traversal: Traversal,
    pub fan_out: FanOut,
    pub adaptive_concurrency: bool,
    pub min_parallel: Option<usize>,
    pub max_parallel: Option<usize>,
    /// Minimum time between stats emissions; `None` or zero emits on every
    /// cache access.
    pub stats_interval: Option<Duration>,
    pub fetch: FetchPolicy,
    /// Capacity of the node channel behind a streaming walk.
    pub channel_capacity: usize,
    pub filter: Option<Arc<dyn NodeFilter>>,
    pub observer: Option<Arc<dyn WalkObserver>>,
    pub cancel: Option<CancellationToken>,
    /// Shared cache; a fresh one is created per walk when unset.
    pub page_cache: Option<Arc<PageCache>>,
}

impl std::fmt::Debug for WalkOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkOptions")
            .field("max_depth", &self.max_depth)
            .field("page_size", &self.page_size)
            .field("parallel", &self.parallel)
            .field("hard_node_limit", &self.hard_node_limit)
            .field("traversal", &self.traversal)
            .field("fan_out", &self.fan_out)
            .field("adaptive_concurrency", &self.adaptive_concurrency)
            .field("min_parallel", &self.min_parallel)
            .field("max_parallel", &self.max_parallel)
            .field("stats_interval", &self.stats_interval)
            .field("fetch", &self.fetch)
            .field("channel_capacity", &self.channel_capacity)
            .field("has_filter", &self.filter.is_some())
            .field("has_observer", &self.observer.is_some())
            .field("cancellable", &self.cancel.is_some())
            .field("shared_cache", &self.page_cache.is_some())
            .finish()
    }
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: 30,
            page_size: 25,
            parallel: 6,
            hard_node_limit: 20_000,
            traversal: Traversal::Dfs,
            fan_out: FanOut::Sequential,
            adaptive_concurrency: true,
            min_parallel: None,
            max_parallel: None,
            stats_interval: None,
            fetch: FetchPolicy::default(),
            channel_capacity: 256,
            filter: None,
            observer: None,
            cancel: None,
            page_cache: None,
        }
    }
}

impl WalkOptions {
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_parallel_bounds(mut self, min: usize, max: usize) -> Self {
        self.min_parallel = Some(min);
        self.max_parallel = Some(max);
        self
    }

    pub fn with_hard_node_limit(mut self, limit: u64) -> Self {
        self.hard_node_limit = limit;
        self
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    pub fn with_adaptive_concurrency(mut self, enabled: bool) -> Self {
        self.adaptive_concurrency = enabled;
        self
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = Some(interval);
        self
    }

    pub fn with_fetch_policy(mut self, fetch: FetchPolicy) -> Self {
        self.fetch = fetch;
        self
    }

    /// Sets a closure filter.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&FilterInput<'_>) -> FilterDecision + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_node_filter(mut self, filter: Arc<dyn NodeFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn WalkObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_page_cache(mut self, cache: Arc<PageCache>) -> Self {
        self.page_cache = Some(cache);
        self
    }

    /// Applies the bound clamping described on the type.
    pub fn normalized(mut self) -> Self {
        self.page_size = self.page_size.max(1);
        self.parallel = self.parallel.max(1);
        self.channel_capacity = self.channel_capacity.max(1);

        let min = self.min_parallel.unwrap_or(1).max(1);
        let max = self
            .max_parallel
            .unwrap_or_else(|| self.parallel.saturating_mul(2))
            .max(min);
        self.min_parallel = Some(min);
        self.max_parallel = Some(max);
        self.parallel = self.parallel.clamp(min, max);
        self
    }

    /// `(min_parallel, max_parallel)` after normalization.
    pub fn parallel_bounds(&self) -> (usize, usize) {
        let min = self.min_parallel.unwrap_or(1).max(1);
        let max = self
            .max_parallel
            .unwrap_or_else(|| self.parallel.saturating_mul(2))
            .max(min);
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_walk_contract() {
        let options = WalkOptions::default();
        assert_eq!(options.max_depth, 30);
        assert_eq!(options.page_size, 25);
        assert_eq!(options.parallel, 6);
        assert_eq!(options.hard_node_limit, 20_000);
        assert_eq!(options.traversal, Traversal::Dfs);
        assert!(options.adaptive_concurrency);
        assert!(options.stats_interval.is_none());
        assert_eq!(options.parallel_bounds(), (1, 12));
    }

    #[test]
    fn test_normalized_clamps_degenerate_values() {
        let options = WalkOptions::default()
            .with_page_size(0)
            .with_parallel(0)
            .normalized();
        assert_eq!(options.page_size, 1);
        assert_eq!(options.parallel, 1);
        assert_eq!(options.min_parallel, Some(1));
        assert_eq!(options.max_parallel, Some(2));
    }

    #[test]
    fn test_normalized_orders_bounds_and_clamps_parallel() {
        let options = WalkOptions::default()
            .with_parallel(20)
            .with_parallel_bounds(4, 2)
            .normalized();
        assert_eq!(options.min_parallel, Some(4));
        assert_eq!(options.max_parallel, Some(4));
        assert_eq!(options.parallel, 4);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = FetchPolicy {
            retries: 3,
            backoff: Duration::from_millis(50),
            on_error: FetchErrorPolicy::Fail,
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(50));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
    }

    #[test]
    fn test_debug_hides_callbacks() {
        let options = WalkOptions::default().with_filter(|_| FilterDecision::default());
        let rendered = format!("{:?}", options);
        assert!(rendered.contains("has_filter: true"));
    }
}
