//! Driving port for reading stored receipts.
use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use super::{BlobStoreError, ReceiptRepositoryError, StoredReceipt, define_port_error};
use crate::domain::ImageFingerprint;

/// A stored receipt plus a time-limited link to its image.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptView {
    /// Stored receipt.
    pub stored: StoredReceipt,
    /// Retrieval URL for the image.
    pub image_url: Url,
}

define_port_error! {
    /// Errors raised while reading receipts.
    pub enum ReceiptLookupError {
        /// No receipt has the requested id.
        NotFound { receipt_id: Uuid } => "receipt {receipt_id} not found",
        /// Repository read failed.
        Repository { source: ReceiptRepositoryError } => "receipt lookup failed: {source}",
        /// Image URL could not be minted.
        ImageUrl { source: BlobStoreError } => "receipt image url unavailable: {source}",
    }
}

/// Domain use-case port for receipt reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReceiptLookupQuery: Send + Sync {
    /// Load a receipt by header id and mint an image URL.
    async fn get_receipt(&self, receipt_id: Uuid) -> Result<ReceiptView, ReceiptLookupError>;

    /// Load the receipt stored for `fingerprint`, if any.
    async fn find_by_fingerprint(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<StoredReceipt>, ReceiptLookupError>;
}
