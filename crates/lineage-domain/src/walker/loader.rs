//! Cache-or-fetch front for the relation reader.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

use tracing::{debug, warn};

use crate::cache::{ChildrenPage, PageCache, VersionMeta};
use crate::error::{DomainError, DomainResult};
use crate::model::NodeKey;

use super::abort::AbortGate;
use super::config::{FetchErrorPolicy, FetchPolicy};
use super::metrics::{LookupKind, MetricsRecorder};
use super::traits::RelationReader;

/// The only component of a walk that performs remote I/O.
///
/// On a hit the cached entry is returned and the hit counter bumped. On a
/// miss the abort gate is checked, the reader is called (racing the
/// cancellation token, with retries per [`FetchPolicy`]), each attempt's
/// latency is folded into the moving average and the result is stored. Reads that
/// still fail are stored as empty degraded entries under
/// [`FetchErrorPolicy::Truncate`]; cancelled reads are never stored.
pub(crate) struct PageLoader<R> {
    reader: Arc<R>,
    cache: Arc<PageCache>,
    metrics: Arc<MetricsRecorder>,
    gate: AbortGate,
    fetch: FetchPolicy,
    page_size: u64,
    partial: AtomicBool,
}

impl<R> PageLoader<R>
where
    R: RelationReader,
{
    pub(crate) fn new(
        reader: Arc<R>,
        cache: Arc<PageCache>,
        metrics: Arc<MetricsRecorder>,
        gate: AbortGate,
        fetch: FetchPolicy,
        page_size: u64,
    ) -> Self {
        Self {
            reader,
            cache,
            metrics,
            gate,
            fetch,
            page_size,
            partial: AtomicBool::new(false),
        }
    }

    /// True once any degraded entry has been served during this walk.
    pub(crate) fn is_partial(&self) -> bool {
        self.partial.load(Ordering::Relaxed)
    }

    /// Loads node metadata (the tag).
    pub(crate) async fn load_version(
        &self,
        person_hash: &str,
        version: u64,
    ) -> DomainResult<Arc<VersionMeta>> {
        let key = NodeKey::new(person_hash, version);
        let init = async {
            self.gate.check()?;
            let result = self
                .with_retries(LookupKind::Version, || {
                    self.reader.get_node_tag(person_hash, version)
                })
                .await;

            match result {
                Ok(tag) => Ok(Arc::new(VersionMeta::new(tag))),
                Err(e) => self
                    .degrade(&key, None, e)
                    .map(|()| Arc::new(VersionMeta::degraded())),
            }
        };

        let entry = self
            .cache
            .versions()
            .entry(key.cache_key())
            .or_try_insert_with(init)
            .await
            .map_err(|e| (*e).clone())?;

        self.metrics
            .record_access(LookupKind::Version, !entry.is_fresh());
        let meta = entry.into_value();
        if meta.degraded {
            self.partial.store(true, Ordering::Relaxed);
        }
        Ok(meta)
    }

    /// Loads the children page of a node starting at `offset`.
    pub(crate) async fn load_children_page(
        &self,
        person_hash: &str,
        version: u64,
        offset: u64,
    ) -> DomainResult<Arc<ChildrenPage>> {
        let key = NodeKey::new(person_hash, version);
        let init = async {
            self.gate.check()?;
            let result = self
                .with_retries(LookupKind::Children, || {
                    self.reader
                        .list_children(person_hash, version, offset, self.page_size)
                })
                .await;

            match result {
                Ok(listing) => {
                    debug!(
                        node = %key,
                        offset,
                        children = listing.child_hashes.len(),
                        has_more = listing.has_more,
                        "Fetched children page"
                    );
                    Ok(Arc::new(ChildrenPage::from_listing(listing, offset)))
                }
                Err(e) => self
                    .degrade(&key, Some(offset), e)
                    .map(|()| Arc::new(ChildrenPage::exhausted(offset))),
            }
        };

        let entry = self
            .cache
            .pages()
            .entry(key.page_cache_key(offset))
            .or_try_insert_with(init)
            .await
            .map_err(|e| (*e).clone())?;

        self.metrics
            .record_access(LookupKind::Children, !entry.is_fresh());
        let page = entry.into_value();
        if page.degraded {
            self.partial.store(true, Ordering::Relaxed);
        }
        Ok(page)
    }

    /// Runs a reader call with the configured retries, racing cancellation.
    ///
    /// Each attempt's own duration is folded into the latency average;
    /// backoff sleeps between attempts are not.
    async fn with_retries<T, F, Fut>(&self, kind: LookupKind, mut call: F) -> DomainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = DomainResult<T>>,
    {
        let mut attempt = 0;
        loop {
            self.gate.check()?;
            let started = Instant::now();
            let result = self.gate.guard(call()).await;
            if !matches!(result, Err(DomainError::Aborted)) {
                self.metrics.record_latency(kind, started.elapsed());
            }
            match result {
                Ok(value) => return Ok(value),
                Err(DomainError::Aborted) => return Err(DomainError::Aborted),
                Err(e) if attempt < self.fetch.retries => {
                    let delay = self.fetch.backoff_for(attempt);
                    debug!(error = %e, attempt, ?delay, "Retrying relation read");
                    self.gate.sleep(delay).await?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Applies the failure policy to a read that exhausted its retries.
    fn degrade(&self, key: &NodeKey, offset: Option<u64>, error: DomainError) -> DomainResult<()> {
        if error.is_aborted() {
            return Err(error);
        }
        match self.fetch.on_error {
            FetchErrorPolicy::Truncate => {
                warn!(
                    node = %key,
                    offset = ?offset,
                    error = %error,
                    "Relation read failed; treating branch as exhausted"
                );
                Ok(())
            }
            FetchErrorPolicy::Fail => Err(match error {
                DomainError::RelationRead { .. } => error,
                other => DomainError::RelationRead {
                    message: other.to_string(),
                },
            }),
        }
    }
}
