//! Public walker entry point.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::Instrument;

use crate::error::DomainResult;
use crate::model::{validate_person_hash, validate_version};

use super::config::WalkOptions;
use super::session::WalkSession;
use super::stream::{WalkOutcome, WalkStream};
use super::traits::RelationReader;

/// Builds lineage trees from a paginated relation source.
///
/// The walker itself is stateless; every call to [`walk`](Self::walk) or
/// [`walk_to_end`](Self::walk_to_end) gets its own visited set, tree,
/// metrics and (unless one is shared through the options) page cache.
pub struct LineageWalker<R> {
    reader: Arc<R>,
}

impl<R> Clone for LineageWalker<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
        }
    }
}

impl<R> std::fmt::Debug for LineageWalker<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineageWalker").finish_non_exhaustive()
    }
}

impl<R> LineageWalker<R>
where
    R: RelationReader + 'static,
{
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    /// Starts a walk and returns the incremental node sequence.
    ///
    /// Must be called within a Tokio runtime. An invalid root yields a
    /// single error item; cancellation yields `Err(DomainError::Aborted)`
    /// as the last item.
    pub fn walk(&self, root_hash: &str, root_version: u64, options: WalkOptions) -> WalkStream {
        let (tx, rx) = mpsc::channel(options.channel_capacity.max(1));
        let reader = Arc::clone(&self.reader);
        let root_hash = root_hash.to_string();
        let span = tracing::debug_span!("lineage_walk", root = %root_hash, version = root_version);

        let handle = tokio::spawn(
            async move {
                if let Err(e) = validate_root(&root_hash, root_version) {
                    let _ = tx.send(Err(e.clone())).await;
                    return Err(e);
                }

                let session =
                    WalkSession::new(reader, &root_hash, root_version, options, Some(tx));
                match session.run(&root_hash, root_version).await {
                    Ok(()) => Ok(session.into_outcome()),
                    Err(e) => {
                        session.send_error(e.clone()).await;
                        Err(e)
                    }
                }
            }
            .instrument(span),
        );

        WalkStream::new(rx, handle)
    }

    /// Runs a walk to completion on the current task.
    pub async fn walk_to_end(
        &self,
        root_hash: &str,
        root_version: u64,
        options: WalkOptions,
    ) -> DomainResult<WalkOutcome> {
        validate_root(root_hash, root_version)?;

        let session = WalkSession::new(
            Arc::clone(&self.reader),
            root_hash,
            root_version,
            options,
            None,
        );
        session.run(root_hash, root_version).await?;
        Ok(session.into_outcome())
    }
}

fn validate_root(root_hash: &str, root_version: u64) -> DomainResult<()> {
    validate_person_hash(root_hash)?;
    validate_version(root_hash, root_version)
}
