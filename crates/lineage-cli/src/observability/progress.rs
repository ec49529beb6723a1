//! Walk observer that reports through `tracing`.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use lineage_domain::walker::{Progress, WalkObserver, WalkerMetrics};
use lineage_domain::GraphNode;

/// Logs discovered nodes at debug level and stats snapshots at info level.
///
/// Stats are already gated by the walk's stats interval; progress is logged
/// every `progress_every` visits.
#[derive(Debug)]
pub struct LoggingObserver {
    progress_every: u64,
    last_logged: AtomicU64,
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new(500)
    }
}

impl LoggingObserver {
    pub fn new(progress_every: u64) -> Self {
        Self {
            progress_every: progress_every.max(1),
            last_logged: AtomicU64::new(0),
        }
    }

    /// Number of visits at the last progress line.
    pub fn last_logged(&self) -> u64 {
        self.last_logged.load(Ordering::Relaxed)
    }
}

impl WalkObserver for LoggingObserver {
    fn on_node(&self, node: &GraphNode) {
        debug!(
            node = %node.key,
            depth = node.depth,
            tag = node.tag.as_deref(),
            "Discovered node"
        );
    }

    fn on_progress(&self, progress: Progress) {
        let last = self.last_logged.load(Ordering::Relaxed);
        if progress.visited >= last + self.progress_every {
            self.last_logged.store(progress.visited, Ordering::Relaxed);
            info!(
                created = progress.created,
                visited = progress.visited,
                depth = progress.depth,
                "Walk progress"
            );
        }
    }

    fn on_stats(&self, stats: &WalkerMetrics) {
        info!(
            created = stats.created,
            visited = stats.visited,
            depth = stats.depth,
            children_hit_ratio = stats.children_hit_ratio(),
            avg_children_ms = stats.avg_children_ms,
            avg_version_ms = stats.avg_version_ms,
            parallel = stats.parallel,
            "Walk stats"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(visited: u64) -> Progress {
        Progress {
            created: visited,
            visited,
            depth: 1,
        }
    }

    #[test]
    fn test_progress_is_logged_every_n_visits() {
        let observer = LoggingObserver::new(10);

        observer.on_progress(progress(5));
        assert_eq!(observer.last_logged(), 0);

        observer.on_progress(progress(10));
        assert_eq!(observer.last_logged(), 10);

        observer.on_progress(progress(15));
        assert_eq!(observer.last_logged(), 10);

        observer.on_progress(progress(21));
        assert_eq!(observer.last_logged(), 21);
    }
}
