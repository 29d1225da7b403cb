//! Process-local response cache.
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::ports::{CacheKey, CacheNamespace, ResponseCache, ResponseCacheError};

/// Response cache backed by a `HashMap` guarded by a read-write lock.
#[derive(Debug, Default)]
pub struct InMemoryResponseCache {
    entries: RwLock<HashMap<(CacheNamespace, String), Vec<u8>>>,
}

impl InMemoryResponseCache {
    /// Number of stored entries across all namespaces.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(
        &self,
        namespace: CacheNamespace,
        key: &CacheKey,
    ) -> Result<Option<Vec<u8>>, ResponseCacheError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(&(namespace, key.as_str().to_owned())).cloned())
    }

    async fn put(
        &self,
        namespace: CacheNamespace,
        key: &CacheKey,
        payload: &[u8],
    ) -> Result<(), ResponseCacheError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Entry::Vacant(slot) = entries.entry((namespace, key.as_str().to_owned())) {
            slot.insert(payload.to_vec());
        }
        Ok(())
    }
}
