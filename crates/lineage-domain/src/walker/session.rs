//! Per-walk traversal state and the DFS/BFS drivers.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashSet;
use futures::future::{try_join, try_join_all};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::{ChildrenPage, PageCache};
use crate::error::{DomainError, DomainResult};
use crate::model::{
    validate_person_hash, FilterDecision, FilterInput, GraphNode, LineageTree, NodeId, NodeKey,
};

use super::abort::AbortGate;
use super::concurrency::AdaptiveConcurrency;
use super::config::{FanOut, Traversal, WalkOptions};
use super::loader::PageLoader;
use super::metrics::MetricsRecorder;
use super::traits::RelationReader;
use super::WalkOutcome;

/// Type alias for boxed future to handle async recursion.
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub(crate) type NodeSender = mpsc::Sender<DomainResult<GraphNode>>;

/// Result of admitting a key to the walk.
#[derive(Debug, Clone, Copy)]
struct Admission {
    /// Tree node that children of this key attach to.
    anchor: NodeId,
    descend: bool,
}

/// A node waiting in the BFS queue for its children to be expanded.
#[derive(Debug, Clone)]
struct Pending {
    person_hash: String,
    version: u64,
    depth: u32,
    anchor: NodeId,
}

/// State owned by exactly one walk.
///
/// Nothing here is process-wide: two walks over the same root get separate
/// visited sets, trees and metrics (and separate caches unless one is shared
/// explicitly through the options).
pub(crate) struct WalkSession<R> {
    loader: PageLoader<R>,
    options: WalkOptions,
    gate: AbortGate,
    metrics: Arc<MetricsRecorder>,
    visited: DashSet<NodeKey>,
    tree: Mutex<LineageTree>,
    concurrency: Mutex<AdaptiveConcurrency>,
    sink: Option<NodeSender>,
    limit_reached: AtomicBool,
}

impl<R> WalkSession<R>
where
    R: RelationReader,
{
    pub(crate) fn new(
        reader: Arc<R>,
        root_hash: &str,
        root_version: u64,
        options: WalkOptions,
        sink: Option<NodeSender>,
    ) -> Self {
        let options = options.normalized();
        let (min, max) = options.parallel_bounds();
        let concurrency =
            AdaptiveConcurrency::new(options.parallel, min, max, options.adaptive_concurrency);

        let gate = AbortGate::new(options.cancel.clone());
        let metrics = Arc::new(MetricsRecorder::new(
            concurrency.current(),
            options.observer.clone(),
            options.stats_interval,
        ));
        let cache = options
            .page_cache
            .clone()
            .unwrap_or_else(|| Arc::new(PageCache::default()));
        let loader = PageLoader::new(
            reader,
            cache,
            Arc::clone(&metrics),
            gate.clone(),
            options.fetch,
            options.page_size,
        );

        Self {
            loader,
            gate,
            metrics,
            visited: DashSet::new(),
            tree: Mutex::new(LineageTree::new(GraphNode::new(root_hash, root_version, 1))),
            concurrency: Mutex::new(concurrency),
            sink,
            limit_reached: AtomicBool::new(false),
            options,
        }
    }

    /// Walks the whole reachable graph from the root.
    pub(crate) async fn run(&self, root_hash: &str, root_version: u64) -> DomainResult<()> {
        debug!(
            root = %NodeKey::new(root_hash, root_version),
            traversal = ?self.options.traversal,
            max_depth = self.options.max_depth,
            hard_node_limit = self.options.hard_node_limit,
            "Starting lineage walk"
        );

        let result = match self.options.traversal {
            Traversal::Dfs => {
                self.visit_dfs(root_hash.to_string(), root_version, 1, None)
                    .await
            }
            Traversal::Bfs => self.run_bfs(root_hash, root_version).await,
        };
        self.metrics.flush_stats();

        let metrics = self.metrics.snapshot();
        debug!(
            created = metrics.created,
            visited = metrics.visited,
            depth = metrics.depth,
            limit_reached = self.limit_reached(),
            aborted = matches!(result, Err(DomainError::Aborted)),
            "Lineage walk finished"
        );
        result
    }

    /// Sends a terminal error to the stream consumer, if any.
    pub(crate) async fn send_error(&self, error: DomainError) {
        if let Some(sink) = &self.sink {
            // The consumer may already be gone.
            let _ = sink.send(Err(error)).await;
        }
    }

    /// Consumes the session into its outcome.
    pub(crate) fn into_outcome(self) -> WalkOutcome {
        let tree = self
            .tree
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        WalkOutcome {
            tree,
            metrics: self.metrics.snapshot(),
            visited: self.visited.len(),
            limit_reached: self.limit_reached.load(Ordering::Relaxed),
            partial: self.loader.is_partial(),
        }
    }

    fn limit_reached(&self) -> bool {
        self.limit_reached.load(Ordering::Relaxed)
    }

    fn lock_tree(&self) -> MutexGuard<'_, LineageTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Retunes the fan-out width once per children-page step.
    fn retune(&self) -> usize {
        let avg = self.metrics.avg_children_ms();
        let mut concurrency = self
            .concurrency
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = concurrency.current();
        let after = concurrency.adjust(avg);
        if before != after {
            debug!(before, after, avg_children_ms = avg, "Adjusted fan-out width");
        }
        self.metrics.set_parallel(after);
        after
    }

    /// Admits one key: visited check, metadata, filter and materialization.
    ///
    /// Returns `None` when the key is rejected (too deep, already visited,
    /// node limit reached).
    async fn admit(
        &self,
        person_hash: &str,
        version: u64,
        depth: u32,
        parent: Option<NodeId>,
    ) -> DomainResult<Option<Admission>> {
        self.gate.check()?;
        if depth > self.options.max_depth || self.limit_reached() {
            return Ok(None);
        }

        let key = NodeKey::new(person_hash, version);
        if !self.visited.insert(key) {
            return Ok(None);
        }
        self.metrics.record_visit(depth);

        let meta = self.loader.load_version(person_hash, version).await?;
        let decision = match &self.options.filter {
            Some(filter) => filter.decide(&FilterInput {
                person_hash,
                version_index: version,
                depth,
                tag: meta.tag.as_deref(),
            }),
            None => FilterDecision::default(),
        };

        let mut anchor = parent.unwrap_or(NodeId::ROOT);
        let mut emitted = None;
        if parent.is_none() {
            self.lock_tree().set_root_tag(meta.tag.clone());
        }

        if decision.include {
            if !self
                .metrics
                .try_reserve_created(self.options.hard_node_limit)
            {
                self.mark_limit_reached();
                self.metrics.report_progress();
                return Ok(None);
            }

            let node = {
                let mut tree = self.lock_tree();
                match parent {
                    None => tree.root().node.clone(),
                    Some(parent_id) => {
                        let node = GraphNode::new(person_hash, version, depth)
                            .with_tag(meta.tag.clone())
                            .with_parent(Some(tree[parent_id].node.key.clone()));
                        anchor = tree.attach(parent_id, node.clone());
                        node
                    }
                }
            };
            if self.metrics.created() >= self.options.hard_node_limit {
                self.mark_limit_reached();
            }
            emitted = Some(node);
        }

        self.metrics.report_progress();
        if let Some(node) = emitted {
            self.emit(node).await?;
        }

        Ok(Some(Admission {
            anchor,
            descend: decision.descend,
        }))
    }

    fn mark_limit_reached(&self) {
        if !self.limit_reached.swap(true, Ordering::Relaxed) {
            debug!(
                hard_node_limit = self.options.hard_node_limit,
                "Node limit reached; stopping walk"
            );
        }
    }

    /// Hands an included node to the observer and the stream consumer.
    async fn emit(&self, node: GraphNode) -> DomainResult<()> {
        if let Some(observer) = &self.options.observer {
            observer.on_node(&node);
        }
        if let Some(sink) = &self.sink {
            // A dropped receiver means the consumer lost interest.
            sink.send(Ok(node))
                .await
                .map_err(|_| DomainError::Aborted)?;
        }
        Ok(())
    }

    /// Children of a page that carry a usable identity.
    fn usable_children(&self, page: &ChildrenPage) -> Vec<(String, u64)> {
        if page.child_hashes.len() != page.child_version_indices.len() {
            warn!(
                hashes = page.child_hashes.len(),
                versions = page.child_version_indices.len(),
                offset = page.page_offset,
                "Children page has mismatched hash and version counts"
            );
        }
        page.children()
            .filter(|(hash, version)| {
                let usable = *version > 0 && validate_person_hash(hash).is_ok();
                if !usable {
                    warn!(child = %hash, version, "Skipping malformed child");
                }
                usable
            })
            .map(|(hash, version)| (hash.to_string(), version))
            .collect()
    }

    /// Walks every children page of a node, prefetching the next page while
    /// the current one is processed.
    ///
    /// Nodes at `max_depth` are never expanded, so their pages are never
    /// fetched.
    async fn walk_pages<'a, F, Fut>(
        &'a self,
        person_hash: &'a str,
        version: u64,
        depth: u32,
        mut on_page: F,
    ) -> DomainResult<Vec<Pending>>
    where
        F: FnMut(Arc<ChildrenPage>) -> Fut,
        Fut: Future<Output = DomainResult<Vec<Pending>>> + 'a,
    {
        let mut discovered = Vec::new();
        if depth >= self.options.max_depth || self.limit_reached() {
            return Ok(discovered);
        }

        self.gate.check()?;
        let mut page = self
            .loader
            .load_children_page(person_hash, version, 0)
            .await?;

        loop {
            self.gate.check()?;
            if self.limit_reached() {
                break;
            }
            self.retune();

            if page.has_more && page.next_page_offset().is_none() {
                warn!(
                    node = %NodeKey::new(person_hash, version),
                    offset = page.page_offset,
                    next_offset = page.next_offset,
                    "Children page offset did not advance; stopping pagination"
                );
            }

            match page.next_page_offset() {
                Some(offset) => {
                    let prefetch = self
                        .loader
                        .load_children_page(person_hash, version, offset);
                    let (found, next) = try_join(on_page(page), prefetch).await?;
                    discovered.extend(found);
                    page = next;
                }
                None => {
                    discovered.extend(on_page(page).await?);
                    break;
                }
            }
        }
        Ok(discovered)
    }

    /// Depth-first visit of one key and, if allowed, its subtree.
    fn visit_dfs(
        &self,
        person_hash: String,
        version: u64,
        depth: u32,
        parent: Option<NodeId>,
    ) -> BoxFuture<'_, DomainResult<()>> {
        Box::pin(async move {
            let Some(admission) = self.admit(&person_hash, version, depth, parent).await? else {
                return Ok(());
            };
            if !admission.descend {
                return Ok(());
            }

            let anchor = admission.anchor;
            self.walk_pages(&person_hash, version, depth, move |page| {
                self.process_page_dfs(page, depth + 1, anchor)
            })
            .await?;
            Ok(())
        })
    }

    /// Processes one page of children depth-first, batch by batch.
    async fn process_page_dfs(
        &self,
        page: Arc<ChildrenPage>,
        depth: u32,
        anchor: NodeId,
    ) -> DomainResult<Vec<Pending>> {
        let children = self.usable_children(&page);
        let width = self.metrics.snapshot().parallel.max(1);

        for batch in children.chunks(width) {
            self.gate.check()?;
            if self.limit_reached() {
                break;
            }
            match self.options.fan_out {
                FanOut::Sequential => {
                    for (hash, version) in batch {
                        self.gate.check()?;
                        if self.limit_reached() {
                            break;
                        }
                        self.visit_dfs(hash.clone(), *version, depth, Some(anchor))
                            .await?;
                    }
                }
                FanOut::Concurrent => {
                    try_join_all(batch.iter().map(|(hash, version)| {
                        self.visit_dfs(hash.clone(), *version, depth, Some(anchor))
                    }))
                    .await?;
                }
            }
        }
        Ok(Vec::new())
    }

    /// Breadth-first walk through a queue of nodes awaiting expansion.
    async fn run_bfs(&self, root_hash: &str, root_version: u64) -> DomainResult<()> {
        let mut queue = VecDeque::new();
        if let Some(admission) = self.admit(root_hash, root_version, 1, None).await? {
            if admission.descend {
                queue.push_back(Pending {
                    person_hash: root_hash.to_string(),
                    version: root_version,
                    depth: 1,
                    anchor: admission.anchor,
                });
            }
        }

        while let Some(item) = queue.pop_front() {
            self.gate.check()?;
            if self.limit_reached() {
                break;
            }
            let (depth, anchor) = (item.depth, item.anchor);
            let discovered = self
                .walk_pages(&item.person_hash, item.version, depth, move |page| {
                    self.process_page_bfs(page, depth + 1, anchor)
                })
                .await?;
            queue.extend(discovered);
        }
        Ok(())
    }

    /// Admits one page of children and returns those to expand later.
    async fn process_page_bfs(
        &self,
        page: Arc<ChildrenPage>,
        depth: u32,
        anchor: NodeId,
    ) -> DomainResult<Vec<Pending>> {
        let children = self.usable_children(&page);
        let width = self.metrics.snapshot().parallel.max(1);
        let mut pending = Vec::new();

        for batch in children.chunks(width) {
            self.gate.check()?;
            if self.limit_reached() {
                break;
            }
            let admissions = match self.options.fan_out {
                FanOut::Sequential => {
                    let mut admissions = Vec::with_capacity(batch.len());
                    for (hash, version) in batch {
                        self.gate.check()?;
                        admissions.push(self.admit(hash, *version, depth, Some(anchor)).await?);
                    }
                    admissions
                }
                FanOut::Concurrent => {
                    try_join_all(
                        batch
                            .iter()
                            .map(|(hash, version)| self.admit(hash, *version, depth, Some(anchor))),
                    )
                    .await?
                }
            };

            for ((hash, version), admission) in batch.iter().zip(admissions) {
                if let Some(admission) = admission.filter(|a| a.descend) {
                    pending.push(Pending {
                        person_hash: hash.clone(),
                        version: *version,
                        depth,
                        anchor: admission.anchor,
                    });
                }
            }
        }
        Ok(pending)
    }
}
