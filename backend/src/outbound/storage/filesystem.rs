//! Filesystem-backed blob store using capability-scoped directories.
//!
//! Each container is a sub-directory of the root. Retrieval URLs point at a
//! static file server configured to serve the root under `public_base`; the
//! `expires` query parameter carries the Unix expiry time for that server to
//! enforce.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use chrono::Utc;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::domain::ports::{BlobLocation, BlobStore, BlobStoreError};
use crate::outbound::http_support::endpoint_url;

/// Blob store writing objects below a local directory.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: Arc<Dir>,
    public_base: Url,
}

impl FilesystemBlobStore {
    /// Open (creating if needed) a store rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Backend`] when the directory cannot be
    /// created or opened.
    pub fn open(path: impl AsRef<Path>, public_base: Url) -> Result<Self, BlobStoreError> {
        let path = path.as_ref();
        Dir::create_ambient_dir_all(path, ambient_authority())
            .map_err(|err| BlobStoreError::backend(format!("create {}: {err}", path.display())))?;
        let root = Dir::open_ambient_dir(path, ambient_authority())
            .map_err(|err| BlobStoreError::backend(format!("open {}: {err}", path.display())))?;
        Ok(Self {
            root: Arc::new(root),
            public_base,
        })
    }
}

fn validate_segment(kind: &str, value: &str) -> Result<(), BlobStoreError> {
    if value.is_empty() {
        return Err(BlobStoreError::invalid_key(format!("{kind} must not be empty")));
    }
    if value.starts_with('.') || value.contains(['/', '\\']) {
        return Err(BlobStoreError::invalid_key(format!(
            "{kind} {value:?} must be a plain file name"
        )));
    }
    Ok(())
}

fn write_blob(root: &Dir, container: &str, key: &str, bytes: &[u8]) -> io::Result<()> {
    root.create_dir_all(container)?;
    let temp = format!("{container}/.{}.tmp", Uuid::new_v4());
    root.write(&temp, bytes)?;
    let target = format!("{container}/{key}");
    if let Err(err) = root.rename(&temp, root, &target) {
        let _cleanup = root.remove_file(&temp);
        return Err(err);
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(
        &self,
        container: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<BlobLocation, BlobStoreError> {
        validate_segment("container", container)?;
        validate_segment("key", key)?;

        let root = Arc::clone(&self.root);
        let location = BlobLocation {
            container: container.to_owned(),
            key: key.to_owned(),
        };
        let target = location.clone();
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            write_blob(&root, &target.container, &target.key, &bytes)
        })
        .await
        .map_err(|err| BlobStoreError::backend(format!("blob worker failed: {err}")))?
        .map_err(|err| BlobStoreError::backend(format!("write {container}/{key}: {err}")))?;

        debug!(container, key, content_type, "blob stored");
        Ok(location)
    }

    async fn url_for(
        &self,
        container: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<Url, BlobStoreError> {
        validate_segment("container", container)?;
        validate_segment("key", key)?;
        if !self.root.exists(format!("{container}/{key}")) {
            return Err(BlobStoreError::not_found(format!("{container}/{key}")));
        }

        let ttl = chrono::Duration::from_std(expires_in)
            .map_err(|err| BlobStoreError::invalid_key(format!("expiry out of range: {err}")))?;
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| BlobStoreError::invalid_key("expiry out of range"))?;

        let mut url = endpoint_url(&self.public_base, &format!("{container}/{key}"))
            .map_err(|err| BlobStoreError::backend(format!("public url: {err}")))?;
        url.query_pairs_mut()
            .append_pair("expires", &expires_at.timestamp().to_string());
        Ok(url)
    }
}
