//! Walk counters, latency averages and the rate-limited stats reporter.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::observer::WalkObserver;

/// Weight kept from the previous average on every new latency sample.
const EMA_DECAY: f64 = 0.9;

/// Sentinel for "stats never emitted".
const NEVER: u64 = u64::MAX;

/// Exponential moving average; the first sample seeds the average.
pub fn ema(previous: f64, sample: f64) -> f64 {
    if previous == 0.0 {
        sample
    } else {
        previous * EMA_DECAY + sample * (1.0 - EMA_DECAY)
    }
}

/// A point-in-time copy of the walk counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WalkerMetrics {
    /// Nodes materialized (included) so far.
    pub created: u64,
    /// Distinct keys admitted to the visited set.
    pub visited: u64,
    /// Deepest depth visited.
    pub depth: u32,
    pub version_cache_hits: u64,
    pub version_cache_misses: u64,
    pub children_cache_hits: u64,
    pub children_cache_misses: u64,
    pub avg_version_ms: f64,
    pub avg_children_ms: f64,
    /// Current fan-out width.
    pub parallel: usize,
}

impl WalkerMetrics {
    /// Children-page hit ratio; 0.0 before any access.
    pub fn children_hit_ratio(&self) -> f64 {
        ratio(self.children_cache_hits, self.children_cache_misses)
    }

    /// Version-metadata hit ratio; 0.0 before any access.
    pub fn version_hit_ratio(&self) -> f64 {
        ratio(self.version_cache_hits, self.version_cache_misses)
    }
}

fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Progress counters handed to [`WalkObserver::on_progress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub created: u64,
    pub visited: u64,
    pub depth: u32,
}

/// Which remote lookup a cache access or latency sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Version,
    Children,
}

impl LookupKind {
    fn label(self) -> &'static str {
        match self {
            LookupKind::Version => "version",
            LookupKind::Children => "children",
        }
    }
}

/// Session-scoped metrics recorder.
///
/// Counters are atomics and averages are stored as `f64` bits, so the
/// recorder can be shared between concurrently polled subtrees without
/// locking. Observers only ever receive copies.
pub struct MetricsRecorder {
    created: AtomicU64,
    visited: AtomicU64,
    depth: AtomicU64,
    version_hits: AtomicU64,
    version_misses: AtomicU64,
    children_hits: AtomicU64,
    children_misses: AtomicU64,
    avg_version_bits: AtomicU64,
    avg_children_bits: AtomicU64,
    parallel: AtomicUsize,
    observer: Option<Arc<dyn WalkObserver>>,
    stats_interval: Option<Duration>,
    started: Instant,
    last_emit_ms: AtomicU64,
}

impl std::fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRecorder")
            .field("metrics", &self.snapshot())
            .field("stats_interval", &self.stats_interval)
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

impl MetricsRecorder {
    pub fn new(
        parallel: usize,
        observer: Option<Arc<dyn WalkObserver>>,
        stats_interval: Option<Duration>,
    ) -> Self {
        Self {
            created: AtomicU64::new(0),
            visited: AtomicU64::new(0),
            depth: AtomicU64::new(0),
            version_hits: AtomicU64::new(0),
            version_misses: AtomicU64::new(0),
            children_hits: AtomicU64::new(0),
            children_misses: AtomicU64::new(0),
            avg_version_bits: AtomicU64::new(0f64.to_bits()),
            avg_children_bits: AtomicU64::new(0f64.to_bits()),
            parallel: AtomicUsize::new(parallel),
            observer,
            // A zero interval means "emit on every access".
            stats_interval: stats_interval.filter(|d| !d.is_zero()),
            started: Instant::now(),
            last_emit_ms: AtomicU64::new(NEVER),
        }
    }

    /// Returns a copy of all counters.
    pub fn snapshot(&self) -> WalkerMetrics {
        WalkerMetrics {
            created: self.created.load(Ordering::Relaxed),
            visited: self.visited.load(Ordering::Relaxed),
            depth: self.depth.load(Ordering::Relaxed) as u32,
            version_cache_hits: self.version_hits.load(Ordering::Relaxed),
            version_cache_misses: self.version_misses.load(Ordering::Relaxed),
            children_cache_hits: self.children_hits.load(Ordering::Relaxed),
            children_cache_misses: self.children_misses.load(Ordering::Relaxed),
            avg_version_ms: f64::from_bits(self.avg_version_bits.load(Ordering::Relaxed)),
            avg_children_ms: f64::from_bits(self.avg_children_bits.load(Ordering::Relaxed)),
            parallel: self.parallel.load(Ordering::Relaxed),
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            created: self.created.load(Ordering::Relaxed),
            visited: self.visited.load(Ordering::Relaxed),
            depth: self.depth.load(Ordering::Relaxed) as u32,
        }
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn avg_children_ms(&self) -> f64 {
        f64::from_bits(self.avg_children_bits.load(Ordering::Relaxed))
    }

    /// Records a newly admitted key at `depth`.
    pub fn record_visit(&self, depth: u32) {
        self.visited.fetch_add(1, Ordering::Relaxed);
        self.depth.fetch_max(u64::from(depth), Ordering::Relaxed);
    }

    /// Reserves one slot under `limit`; returns false once the limit is hit.
    pub fn try_reserve_created(&self, limit: u64) -> bool {
        self.created
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                (c < limit).then_some(c + 1)
            })
            .is_ok()
    }

    pub fn set_parallel(&self, parallel: usize) {
        self.parallel.store(parallel, Ordering::Relaxed);
    }

    /// Records a cache access and feeds the stats reporter.
    pub fn record_access(&self, kind: LookupKind, hit: bool) {
        let counter = match (kind, hit) {
            (LookupKind::Version, true) => &self.version_hits,
            (LookupKind::Version, false) => &self.version_misses,
            (LookupKind::Children, true) => &self.children_hits,
            (LookupKind::Children, false) => &self.children_misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if hit {
            metrics::counter!("lineage_page_cache_hits_total", "kind" => kind.label()).increment(1);
        } else {
            metrics::counter!("lineage_page_cache_misses_total", "kind" => kind.label())
                .increment(1);
        }
        self.maybe_emit_stats();
    }

    /// Folds a remote read latency into the moving average.
    pub fn record_latency(&self, kind: LookupKind, elapsed: Duration) {
        let bits = match kind {
            LookupKind::Version => &self.avg_version_bits,
            LookupKind::Children => &self.avg_children_bits,
        };
        let sample = elapsed.as_secs_f64() * 1_000.0;
        // The closure always returns Some, so the update cannot fail.
        let _ = bits.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |prev| {
            Some(ema(f64::from_bits(prev), sample).to_bits())
        });

        metrics::histogram!("lineage_page_fetch_duration_seconds", "kind" => kind.label())
            .record(elapsed.as_secs_f64());
        self.maybe_emit_stats();
    }

    /// Notifies the observer of progress after an inclusion decision.
    pub fn report_progress(&self) {
        if let Some(observer) = &self.observer {
            observer.on_progress(self.progress());
        }
    }

    /// Emits a stats snapshot regardless of the interval.
    pub fn flush_stats(&self) {
        if let Some(observer) = &self.observer {
            self.last_emit_ms
                .store(self.elapsed_ms(), Ordering::Relaxed);
            observer.on_stats(&self.snapshot());
        }
    }

    fn maybe_emit_stats(&self) {
        let Some(observer) = &self.observer else {
            return;
        };

        if let Some(interval) = self.stats_interval {
            let now = self.elapsed_ms();
            let interval_ms = interval.as_millis() as u64;
            let due = self
                .last_emit_ms
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
                    (last == NEVER || now.saturating_sub(last) >= interval_ms).then_some(now)
                })
                .is_ok();
            if !due {
                return;
            }
        }

        observer.on_stats(&self.snapshot());
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingObserver {
        stats: Mutex<Vec<WalkerMetrics>>,
        progress: Mutex<Vec<Progress>>,
    }

    impl WalkObserver for CollectingObserver {
        fn on_progress(&self, progress: Progress) {
            self.progress.lock().unwrap().push(progress);
        }

        fn on_stats(&self, stats: &WalkerMetrics) {
            self.stats.lock().unwrap().push(*stats);
        }
    }

    #[test]
    fn test_ema_seeds_then_smooths() {
        assert_eq!(ema(0.0, 400.0), 400.0);
        let next = ema(400.0, 1_400.0);
        assert!((next - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_record_latency_updates_average() {
        let recorder = MetricsRecorder::new(6, None, None);
        recorder.record_latency(LookupKind::Children, Duration::from_millis(100));
        recorder.record_latency(LookupKind::Children, Duration::from_millis(1_100));
        let snapshot = recorder.snapshot();
        assert!((snapshot.avg_children_ms - 200.0).abs() < 1e-6);
        assert_eq!(snapshot.avg_version_ms, 0.0);
    }

    #[test]
    fn test_access_counters_and_ratios() {
        let recorder = MetricsRecorder::new(6, None, None);
        recorder.record_access(LookupKind::Children, false);
        recorder.record_access(LookupKind::Children, true);
        recorder.record_access(LookupKind::Children, true);
        recorder.record_access(LookupKind::Version, false);

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.children_cache_misses, 1);
        assert_eq!(snapshot.children_cache_hits, 2);
        assert_eq!(snapshot.version_cache_misses, 1);
        assert!((snapshot.children_hit_ratio() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(snapshot.version_hit_ratio(), 0.0);
    }

    #[test]
    fn test_reserve_never_exceeds_limit() {
        let recorder = MetricsRecorder::new(1, None, None);
        assert!(recorder.try_reserve_created(2));
        assert!(recorder.try_reserve_created(2));
        assert!(!recorder.try_reserve_created(2));
        assert_eq!(recorder.created(), 2);
    }

    #[test]
    fn test_visit_tracks_deepest_depth() {
        let recorder = MetricsRecorder::new(1, None, None);
        recorder.record_visit(1);
        recorder.record_visit(4);
        recorder.record_visit(2);
        let progress = recorder.progress();
        assert_eq!(progress.visited, 3);
        assert_eq!(progress.depth, 4);
    }

    #[test]
    fn test_stats_emitted_on_every_access_without_interval() {
        let observer = Arc::new(CollectingObserver::default());
        let recorder = MetricsRecorder::new(2, Some(observer.clone()), None);
        recorder.record_access(LookupKind::Children, false);
        recorder.record_access(LookupKind::Children, true);
        assert_eq!(observer.stats.lock().unwrap().len(), 2);

        let zero_interval = MetricsRecorder::new(2, Some(observer.clone()), Some(Duration::ZERO));
        zero_interval.record_access(LookupKind::Version, true);
        assert_eq!(observer.stats.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_stats_rate_limited_by_interval() {
        let observer = Arc::new(CollectingObserver::default());
        let recorder = MetricsRecorder::new(
            2,
            Some(observer.clone()),
            Some(Duration::from_secs(3_600)),
        );
        for _ in 0..10 {
            recorder.record_access(LookupKind::Children, true);
        }
        let stats = observer.stats.lock().unwrap();
        assert_eq!(stats.len(), 1, "only the first access may emit");
        assert_eq!(stats[0].children_cache_hits, 1);
    }

    #[test]
    fn test_snapshots_are_copies() {
        let observer = Arc::new(CollectingObserver::default());
        let recorder = MetricsRecorder::new(2, Some(observer.clone()), None);
        recorder.record_access(LookupKind::Version, false);
        recorder.record_access(LookupKind::Version, false);
        let stats = observer.stats.lock().unwrap();
        assert_eq!(stats[0].version_cache_misses, 1);
        assert_eq!(stats[1].version_cache_misses, 2);
    }

    #[test]
    fn test_progress_reported_to_observer() {
        let observer = Arc::new(CollectingObserver::default());
        let recorder = MetricsRecorder::new(2, Some(observer.clone()), None);
        recorder.record_visit(1);
        assert!(recorder.try_reserve_created(10));
        recorder.report_progress();
        assert_eq!(
            observer.progress.lock().unwrap().as_slice(),
            &[Progress {
                created: 1,
                visited: 1,
                depth: 1
            }]
        );
    }
}
