//! Asynchronous Fetchers
//!
//! Transports that suspend while waiting for data implement `AsyncFetcher`.
//! The resolver itself is synchronous, so `BlockingFetcher` drives an async
//! fetcher to completion on a private current-thread runtime and exposes it
//! as a plain `Fetcher`. Existing call sites keep their blocking semantics.
//!
//! `BlockingFetcher` must not be used from inside another Tokio runtime;
//! blocking a runtime worker on a nested runtime panics.

use std::future::Future;

use tokio::runtime::{Builder, Runtime};

use super::errors::FetchError;
use super::fetch::{FetchResult, Fetcher};

/// "Fetch text by address" as a suspending operation.
pub trait AsyncFetcher: Send + Sync {
    fn fetch_text(&self, address: &str) -> impl Future<Output = FetchResult> + Send;
}

/// Adapts an `AsyncFetcher` into a blocking `Fetcher`.
pub struct BlockingFetcher<F> {
    inner: F,
    runtime: Runtime,
}

impl<F: AsyncFetcher> BlockingFetcher<F> {
    /// Wrap `inner`, building a dedicated current-thread runtime.
    pub fn new(inner: F) -> Result<Self, FetchError> {
        let runtime = Builder::new_current_thread()
            .build()
            .map_err(|e| FetchError::new("<runtime>", e.to_string()))?;
        Ok(Self { inner, runtime })
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: AsyncFetcher> Fetcher for BlockingFetcher<F> {
    fn fetch_text(&self, address: &str) -> FetchResult {
        self.runtime.block_on(self.inner.fetch_text(address))
    }
}

impl<F> std::fmt::Debug for BlockingFetcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingFetcher").finish_non_exhaustive()
    }
}
