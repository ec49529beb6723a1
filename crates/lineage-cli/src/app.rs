//! Walk orchestration shared by the binary and the integration tests.

use std::sync::Arc;

use anyhow::{bail, Context};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lineage_domain::{flatten, ExpandState, LineageWalker};
use lineage_storage::load_fixture;

use crate::adapters::StoreRelationReader;
use crate::config::CliConfig;
use crate::observability::LoggingObserver;
use crate::render::{render_tree, summary};

/// What to walk and how much of the result to show.
#[derive(Debug, Clone)]
pub struct WalkRequest {
    pub root_hash: String,
    pub version: u64,
    /// Rows below this depth start collapsed; `None` expands everything.
    pub expand_depth: Option<usize>,
}

/// Loads the fixture, streams the walk and renders the tree with a summary
/// line.
pub async fn run_walk(
    config: &CliConfig,
    request: &WalkRequest,
    cancel: CancellationToken,
) -> anyhow::Result<String> {
    let fixture = config
        .store
        .fixture
        .as_deref()
        .context("no fixture configured; pass --fixture or set store.fixture")?;
    let store = Arc::new(
        load_fixture(fixture).with_context(|| format!("failed to load fixture {}", fixture))?,
    );
    info!(fixture, people = store.len(), "Loaded relation store");

    let walker = LineageWalker::new(Arc::new(StoreRelationReader::new(store)));
    let options = config
        .walk
        .to_options()
        .with_observer(Arc::new(LoggingObserver::default()))
        .with_cancellation(cancel);

    let mut stream = walker.walk(&request.root_hash, request.version, options);
    while let Some(item) = stream.next().await {
        match item {
            Ok(node) => debug!(node = %node.key, depth = node.depth, "Received node"),
            Err(e) if e.is_aborted() => {
                warn!("Walk cancelled");
                bail!("walk cancelled");
            }
            Err(e) => return Err(e).context("walk failed"),
        }
    }

    let outcome = stream.into_outcome().await?;
    let state = match request.expand_depth {
        Some(depth) => ExpandState::to_depth(&outcome.tree, depth),
        None => ExpandState::all(&outcome.tree),
    };
    let rows = flatten(&outcome.tree, &state);

    let mut rendered = render_tree(&outcome.tree, &rows);
    rendered.push_str(&summary(&outcome));
    rendered.push('\n');
    Ok(rendered)
}
