//! Read path for stored receipts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ImageFingerprint;
use crate::domain::ports::{
    BlobStore, ReceiptLookupError, ReceiptLookupQuery, ReceiptRepository, ReceiptView,
    StoredReceipt,
};

/// Lifetime of minted image URLs.
pub const RECEIPT_IMAGE_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Domain service implementing [`ReceiptLookupQuery`].
pub struct ReceiptLookupService<R, B> {
    repository: Arc<R>,
    blob_store: Arc<B>,
}

impl<R, B> Clone for ReceiptLookupService<R, B> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            blob_store: Arc::clone(&self.blob_store),
        }
    }
}

impl<R, B> ReceiptLookupService<R, B> {
    /// Create a new lookup service.
    pub fn new(repository: Arc<R>, blob_store: Arc<B>) -> Self {
        Self {
            repository,
            blob_store,
        }
    }
}

#[async_trait]
impl<R, B> ReceiptLookupQuery for ReceiptLookupService<R, B>
where
    R: ReceiptRepository,
    B: BlobStore,
{
    async fn get_receipt(&self, receipt_id: Uuid) -> Result<ReceiptView, ReceiptLookupError> {
        let stored = self
            .repository
            .find_by_id(receipt_id)
            .await
            .map_err(ReceiptLookupError::repository)?
            .ok_or_else(|| ReceiptLookupError::not_found(receipt_id))?;
        let image_url = self
            .blob_store
            .url_for(&stored.bucket, &stored.key, RECEIPT_IMAGE_URL_TTL)
            .await
            .map_err(ReceiptLookupError::image_url)?;
        Ok(ReceiptView { stored, image_url })
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<StoredReceipt>, ReceiptLookupError> {
        self.repository
            .find_by_hash(fingerprint)
            .await
            .map_err(ReceiptLookupError::repository)
    }
}
