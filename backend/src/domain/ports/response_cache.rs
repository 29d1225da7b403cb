//! Port interface for the content-addressed response cache.
//!
//! Entries are write-once and never expire: a present entry means "already
//! computed". Adapters store opaque payload bytes; encoding belongs to the
//! domain services that own each namespace.
use async_trait::async_trait;

use super::{CacheKey, CacheNamespace, define_port_error};

define_port_error! {
    /// Errors surfaced by response cache adapters.
    pub enum ResponseCacheError {
        /// Cache backend is unavailable or failed an I/O operation.
        Backend { message: String } => "response cache backend failure: {message}",
        /// Serialisation or deserialisation of cached content failed.
        Serialization { message: String } => "response cache serialisation failed: {message}",
    }
}

/// Content-addressed store of previously computed provider responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Read the payload stored under `key` in `namespace`, if any.
    async fn get(
        &self,
        namespace: CacheNamespace,
        key: &CacheKey,
    ) -> Result<Option<Vec<u8>>, ResponseCacheError>;

    /// Store `payload` under `key` in `namespace`.
    ///
    /// Writing a key that already exists leaves the stored payload in place.
    async fn put(
        &self,
        namespace: CacheNamespace,
        key: &CacheKey,
        payload: &[u8],
    ) -> Result<(), ResponseCacheError>;
}
