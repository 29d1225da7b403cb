//! Best-effort access to the response cache.
//!
//! The cache only ever saves provider calls. Read failures, corrupt entries,
//! and write failures are logged and absorbed here so that no cache problem
//! can fail an extraction.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::ports::{CacheKey, CacheNamespace, ResponseCache};

/// Wraps a [`ResponseCache`] with JSON encoding and swallow-and-log policy.
pub struct BestEffortCache<C> {
    inner: Arc<C>,
}

impl<C> Clone for BestEffortCache<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> BestEffortCache<C> {
    /// Wrap a shared cache adapter.
    pub fn new(inner: Arc<C>) -> Self {
        Self { inner }
    }
}

impl<C: ResponseCache> BestEffortCache<C> {
    /// Decode the entry under `key`, treating any failure as a miss.
    pub async fn lookup<T: DeserializeOwned>(
        &self,
        namespace: CacheNamespace,
        key: &CacheKey,
    ) -> Option<T> {
        let bytes = match self.inner.get(namespace, key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(namespace = %namespace, key = %key, "response cache miss");
                return None;
            }
            Err(err) => {
                warn!(namespace = %namespace, key = %key, error = %err, "response cache read failed");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(namespace = %namespace, key = %key, "response cache hit");
                Some(value)
            }
            Err(err) => {
                warn!(
                    namespace = %namespace,
                    key = %key,
                    error = %err,
                    "response cache entry is corrupt; recomputing"
                );
                None
            }
        }
    }

    /// Encode and store `value` under `key`, logging any failure.
    pub async fn store<T: Serialize + Sync>(
        &self,
        namespace: CacheNamespace,
        key: &CacheKey,
        value: &T,
    ) {
        let payload = match serde_json::to_vec(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(namespace = %namespace, key = %key, error = %err, "response cache encode failed");
                return;
            }
        };
        if let Err(err) = self.inner.put(namespace, key, &payload).await {
            warn!(namespace = %namespace, key = %key, error = %err, "response cache write failed");
        }
    }
}
