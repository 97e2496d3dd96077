//! Memoization wrapper over the persistent cache
//!
//! Turns any deterministic-ish async call into a cache-checked call. The
//! read-only path performs the same key derivation but never invokes the
//! underlying function; it exists so a disabled feature (speech synthesis)
//! can still serve previously cached results.

use super::key::memo_context;
use super::value::CacheValue;
use super::{Bucket, PersistentCache};
use crate::error::CoreResult;
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Cache-checked adapter for expensive calls.
///
/// Keys are derived from the call name plus its serialized arguments via
/// [`memo_context`]; both [`Memoizer::call`] and [`Memoizer::lookup`] share
/// that derivation, so a value stored by one is found by the other.
#[derive(Debug, Clone)]
pub struct Memoizer {
    cache: Arc<PersistentCache>,
    bucket: Bucket,
}

impl Memoizer {
    /// Create a memoizer storing into `bucket` of `cache`.
    pub fn new(cache: Arc<PersistentCache>, bucket: Bucket) -> Self {
        Self { cache, bucket }
    }

    /// The underlying cache store.
    pub fn cache(&self) -> &Arc<PersistentCache> {
        &self.cache
    }

    /// Run `f` through the cache: on a hit return the cached value without
    /// invoking `f`; on a miss invoke `f`, store its result, and return it.
    ///
    /// Errors from `f` propagate unchanged and nothing is stored for them.
    pub async fn call<A, F, Fut>(&self, name: &str, args: &A, f: F) -> CoreResult<CacheValue>
    where
        A: Serialize + Debug,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoreResult<CacheValue>>,
    {
        let context = memo_context(name, args);
        if let Some(hit) = self.cache.get(name, &context, self.bucket).await {
            debug!("memoized call {name}: cache hit");
            return Ok(hit);
        }

        let fresh = f().await?;
        self.cache.set(name, &fresh, &context, self.bucket).await;
        Ok(fresh)
    }

    /// Read-only variant: check the cache and return a found value, or
    /// `None` on a miss. Never invokes anything.
    pub async fn lookup<A>(&self, name: &str, args: &A) -> Option<CacheValue>
    where
        A: Serialize + Debug,
    {
        let context = memo_context(name, args);
        self.cache.get(name, &context, self.bucket).await
    }
}
