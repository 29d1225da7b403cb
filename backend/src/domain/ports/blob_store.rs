//! Driven port for object storage holding receipt images.
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::define_port_error;

/// Where an uploaded blob landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    /// Container (bucket) name.
    pub container: String,
    /// Object key inside the container.
    pub key: String,
}

define_port_error! {
    /// Errors surfaced by blob store adapters.
    pub enum BlobStoreError {
        /// Container or key is not acceptable to the backend.
        InvalidKey { message: String } => "blob key rejected: {message}",
        /// Blob does not exist.
        NotFound { message: String } => "blob not found: {message}",
        /// Storage backend failed the operation.
        Backend { message: String } => "blob store backend failure: {message}",
    }
}

/// Port for uploading blobs and minting retrieval URLs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `bytes` to `container` under `key`.
    async fn put(
        &self,
        container: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<BlobLocation, BlobStoreError>;

    /// Mint a retrieval URL valid for `expires_in`.
    async fn url_for(
        &self,
        container: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<Url, BlobStoreError>;
}
