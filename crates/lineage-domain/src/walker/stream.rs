//! Streaming handle over a running walk.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{DomainError, DomainResult};
use crate::model::LineageTree;

use super::metrics::WalkerMetrics;

/// Final state of a completed walk.
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    /// The materialized tree. The root is always present at
    /// [`NodeId::ROOT`](crate::model::NodeId::ROOT).
    pub tree: LineageTree,
    pub metrics: WalkerMetrics,
    /// Number of distinct keys visited.
    pub visited: usize,
    /// True when the hard node limit stopped the walk.
    pub limit_reached: bool,
    /// True when at least one remote read failed and its branch was
    /// truncated.
    pub partial: bool,
}

/// Incremental sequence of nodes produced by a walk.
///
/// Nodes arrive in discovery order. The producer runs on its own task and
/// is bounded by the channel capacity, so a slow consumer applies
/// backpressure. Dropping the stream aborts the walk.
///
/// A cancelled walk ends the sequence with a single
/// `Err(DomainError::Aborted)` item.
pub struct WalkStream {
    rx: mpsc::Receiver<DomainResult<crate::model::GraphNode>>,
    handle: Option<JoinHandle<DomainResult<WalkOutcome>>>,
}

impl std::fmt::Debug for WalkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkStream")
            .field("running", &self.handle.as_ref().is_some_and(|h| !h.is_finished()))
            .finish()
    }
}

impl WalkStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<DomainResult<crate::model::GraphNode>>,
        handle: JoinHandle<DomainResult<WalkOutcome>>,
    ) -> Self {
        Self {
            rx,
            handle: Some(handle),
        }
    }

    /// Drains any remaining nodes and waits for the walk to finish.
    pub async fn into_outcome(mut self) -> DomainResult<WalkOutcome> {
        // Unread nodes are discarded; the producer keeps running to the end.
        while self.rx.recv().await.is_some() {}

        let Some(handle) = self.handle.take() else {
            return Err(DomainError::Internal {
                message: "walk outcome already taken".to_string(),
            });
        };
        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(DomainError::Aborted),
            Err(e) => Err(DomainError::Internal {
                message: format!("walk task failed: {e}"),
            }),
        }
    }
}

impl Stream for WalkStream {
    type Item = DomainResult<crate::model::GraphNode>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for WalkStream {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
