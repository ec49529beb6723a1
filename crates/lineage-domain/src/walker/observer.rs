//! Callbacks fired while a walk progresses.

use crate::model::GraphNode;

use super::metrics::{Progress, WalkerMetrics};

/// Observer notified synchronously from inside the walk.
///
/// All methods default to no-ops. Implementations must return quickly; they
/// run on the walk's task between suspension points.
pub trait WalkObserver: Send + Sync {
    /// Called once for every included node, before it is yielded.
    fn on_node(&self, _node: &GraphNode) {}

    /// Called after every inclusion decision. Not rate-limited.
    fn on_progress(&self, _progress: Progress) {}

    /// Called with a metrics snapshot, gated by the stats interval.
    fn on_stats(&self, _stats: &WalkerMetrics) {}
}
