//! Disk-backed response cache using capability-scoped directories.
//!
//! Layout: `<root>/<namespace>/<key>.json`. Entries are written to a unique
//! temporary file and renamed into place, so a reader never sees a partial
//! payload.

use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{CacheKey, CacheNamespace, ResponseCache, ResponseCacheError};

/// Response cache persisting one file per entry.
#[derive(Debug, Clone)]
pub struct FileResponseCache {
    root: Arc<Dir>,
}

impl FileResponseCache {
    /// Open (creating if needed) a cache rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseCacheError::Backend`] when the directory cannot be
    /// created or opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ResponseCacheError> {
        let path = path.as_ref();
        Dir::create_ambient_dir_all(path, ambient_authority()).map_err(|err| {
            ResponseCacheError::backend(format!("create {}: {err}", path.display()))
        })?;
        let root = Dir::open_ambient_dir(path, ambient_authority()).map_err(|err| {
            ResponseCacheError::backend(format!("open {}: {err}", path.display()))
        })?;
        Ok(Self::from_dir(root))
    }

    /// Wrap an already opened directory.
    pub fn from_dir(root: Dir) -> Self {
        Self {
            root: Arc::new(root),
        }
    }
}

fn entry_path(namespace: CacheNamespace, key: &CacheKey) -> String {
    format!("{}/{}.json", namespace.as_str(), key.as_str())
}

fn read_entry(root: &Dir, path: &str) -> io::Result<Option<Vec<u8>>> {
    match root.read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

fn write_entry(
    root: &Dir,
    namespace: CacheNamespace,
    path: &str,
    payload: &[u8],
) -> io::Result<bool> {
    if root.exists(path) {
        return Ok(false);
    }
    root.create_dir_all(namespace.as_str())?;
    let temp = format!("{}/.{}.tmp", namespace.as_str(), Uuid::new_v4());
    root.write(&temp, payload)?;
    if let Err(err) = root.rename(&temp, root, path) {
        // Best effort; an orphaned temp file never shadows an entry.
        let _cleanup = root.remove_file(&temp);
        return Err(err);
    }
    Ok(true)
}

fn join_error(err: tokio::task::JoinError) -> ResponseCacheError {
    ResponseCacheError::backend(format!("cache worker failed: {err}"))
}

#[async_trait]
impl ResponseCache for FileResponseCache {
    async fn get(
        &self,
        namespace: CacheNamespace,
        key: &CacheKey,
    ) -> Result<Option<Vec<u8>>, ResponseCacheError> {
        let root = Arc::clone(&self.root);
        let path = entry_path(namespace, key);
        tokio::task::spawn_blocking(move || {
            read_entry(&root, &path)
                .map_err(|err| ResponseCacheError::backend(format!("read {path}: {err}")))
        })
        .await
        .map_err(join_error)?
    }

    async fn put(
        &self,
        namespace: CacheNamespace,
        key: &CacheKey,
        payload: &[u8],
    ) -> Result<(), ResponseCacheError> {
        let root = Arc::clone(&self.root);
        let path = entry_path(namespace, key);
        let payload = payload.to_vec();
        let written = tokio::task::spawn_blocking(move || {
            write_entry(&root, namespace, &path, &payload)
                .map_err(|err| ResponseCacheError::backend(format!("write {path}: {err}")))
        })
        .await
        .map_err(join_error)??;
        debug!(namespace = %namespace, key = %key, written, "response cache put");
        Ok(())
    }
}
