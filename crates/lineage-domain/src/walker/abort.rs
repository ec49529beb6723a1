//! Cooperative cancellation gate.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{DomainError, DomainResult};

/// Checks an externally supplied cancellation token.
///
/// Checked at every loop head, before every remote read and before each
/// child in a batch. Remote reads also race the token, so an in-flight
/// request is abandoned as soon as the token fires.
#[derive(Debug, Clone, Default)]
pub struct AbortGate {
    token: Option<CancellationToken>,
}

impl AbortGate {
    pub fn new(token: Option<CancellationToken>) -> Self {
        Self { token }
    }

    /// Returns true once the token has been cancelled.
    pub fn is_aborted(&self) -> bool {
        self.token.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Fails with [`DomainError::Aborted`] once the token has been cancelled.
    pub fn check(&self) -> DomainResult<()> {
        if self.is_aborted() {
            return Err(DomainError::Aborted);
        }
        Ok(())
    }

    /// Runs `fut` unless the token fires first.
    pub async fn guard<F, T>(&self, fut: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        match &self.token {
            None => fut.await,
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(DomainError::Aborted),
                    result = fut => result,
                }
            }
        }
    }

    /// Sleeps for `duration` unless the token fires first.
    pub async fn sleep(&self, duration: std::time::Duration) -> DomainResult<()> {
        self.guard(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}
