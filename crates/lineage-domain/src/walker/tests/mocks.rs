//! Mock implementations for walker testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{DomainError, DomainResult};
use crate::model::{GraphNode, NodeKey};
use crate::walker::{ChildrenListing, Progress, RelationReader, WalkObserver, WalkerMetrics};

/// Builds a well-formed person hash from a small number.
pub fn person(n: u32) -> String {
    format!("0x{:064x}", n)
}

/// In-memory relation graph with call counting, latency and failure
/// injection.
pub struct MockRelationReader {
    children: RwLock<HashMap<NodeKey, Vec<(String, u64)>>>,
    tags: RwLock<HashMap<NodeKey, String>>,
    failing: RwLock<HashSet<NodeKey>>,
    transient_failures: RwLock<HashMap<NodeKey, usize>>,
    latency: RwLock<Duration>,
    list_calls: AtomicUsize,
    tag_calls: AtomicUsize,
    listed: Mutex<Vec<(NodeKey, u64)>>,
}

impl MockRelationReader {
    pub fn new() -> Self {
        Self {
            children: RwLock::new(HashMap::new()),
            tags: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            transient_failures: RwLock::new(HashMap::new()),
            latency: RwLock::new(Duration::ZERO),
            list_calls: AtomicUsize::new(0),
            tag_calls: AtomicUsize::new(0),
            listed: Mutex::new(Vec::new()),
        }
    }

    /// Adds `child` (version 1) under `parent` (version 1).
    pub async fn add_edge(&self, parent: u32, child: u32) {
        self.add_raw_edge(&person(parent), 1, &person(child), 1)
            .await;
    }

    pub async fn add_raw_edge(&self, parent: &str, version: u64, child: &str, child_version: u64) {
        self.children
            .write()
            .await
            .entry(NodeKey::new(parent, version))
            .or_default()
            .push((child.to_string(), child_version));
    }

    pub async fn set_tag(&self, node: u32, tag: &str) {
        self.tags
            .write()
            .await
            .insert(NodeKey::new(&person(node), 1), tag.to_string());
    }

    /// Every children listing of `node` fails.
    pub async fn fail_node(&self, node: u32) {
        self.failing
            .write()
            .await
            .insert(NodeKey::new(&person(node), 1));
    }

    /// The next `times` children listings of `node` fail.
    pub async fn fail_node_times(&self, node: u32, times: usize) {
        self.transient_failures
            .write()
            .await
            .insert(NodeKey::new(&person(node), 1), times);
    }

    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }

    /// Number of listings requested for `node`, across all offsets.
    pub fn list_calls_for(&self, node: u32) -> usize {
        let key = NodeKey::new(&person(node), 1);
        self.listed
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == key)
            .count()
    }
}

#[async_trait]
impl RelationReader for MockRelationReader {
    async fn list_children(
        &self,
        person_hash: &str,
        version: u64,
        offset: u64,
        limit: u64,
    ) -> DomainResult<ChildrenListing> {
        let key = NodeKey::new(person_hash, version);
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.clone(), offset));

        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.failing.read().await.contains(&key) {
            return Err(DomainError::RelationRead {
                message: format!("listing {} failed", key),
            });
        }
        if let Some(remaining) = self.transient_failures.write().await.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DomainError::RelationRead {
                    message: format!("listing {} temporarily unavailable", key),
                });
            }
        }

        let all = self
            .children
            .read()
            .await
            .get(&key)
            .cloned()
            .unwrap_or_default();
        let start = (offset as usize).min(all.len());
        let end = start.saturating_add(limit as usize).min(all.len());
        let (hashes, versions): (Vec<String>, Vec<u64>) = all[start..end].iter().cloned().unzip();

        Ok(ChildrenListing::from((
            hashes,
            versions,
            all.len() as u64,
            end < all.len(),
            end as u64,
        )))
    }

    async fn get_node_tag(&self, person_hash: &str, version: u64) -> DomainResult<Option<String>> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tags
            .read()
            .await
            .get(&NodeKey::new(person_hash, version))
            .cloned())
    }
}

/// Observer that records everything it is told.
#[derive(Default)]
pub struct RecordingObserver {
    pub nodes: Mutex<Vec<GraphNode>>,
    pub progress: Mutex<Vec<Progress>>,
    pub stats: Mutex<Vec<WalkerMetrics>>,
}

impl WalkObserver for RecordingObserver {
    fn on_node(&self, node: &GraphNode) {
        self.nodes.lock().unwrap().push(node.clone());
    }

    fn on_progress(&self, progress: Progress) {
        self.progress.lock().unwrap().push(progress);
    }

    fn on_stats(&self, stats: &WalkerMetrics) {
        self.stats.lock().unwrap().push(*stats);
    }
}
