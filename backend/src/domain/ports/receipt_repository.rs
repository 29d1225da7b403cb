//! Port abstraction for persisting and reloading extracted receipts.
//!
//! The relational store is the dedup source of truth: the unique constraint on
//! the image fingerprint turns a concurrent second insert into
//! [`ReceiptRepositoryError::DuplicateImage`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::define_port_error;
use crate::domain::{ImageFingerprint, ParsedReceipt};

/// Entity a receipt is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptOwner {
    /// Outing the receipt belongs to.
    pub outing_id: Uuid,
}

/// Everything written by one successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReceiptRecord {
    /// Image identity; unique across the store.
    pub fingerprint: ImageFingerprint,
    /// Blob container holding the image.
    pub bucket: String,
    /// Blob key of the image.
    pub key: String,
    /// OCR text, one reconstructed line per `\n`.
    pub raw_text: String,
    /// Name the image was uploaded under.
    pub file_name: String,
    /// Owning entity.
    pub owner: ReceiptOwner,
    /// Structured receipt.
    pub receipt: ParsedReceipt,
}

/// Identifiers generated by the store for a new receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedReceiptIds {
    /// `receipt_images` row id.
    pub image_id: Uuid,
    /// `receipts` row id.
    pub receipt_id: Uuid,
}

/// A receipt reassembled from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReceipt {
    /// Generated identifiers.
    pub ids: PersistedReceiptIds,
    /// Image identity.
    pub fingerprint: ImageFingerprint,
    /// Blob container holding the image.
    pub bucket: String,
    /// Blob key of the image.
    pub key: String,
    /// OCR text.
    pub raw_text: String,
    /// Name the image was uploaded under.
    pub file_name: String,
    /// Owning entity.
    pub owner: ReceiptOwner,
    /// Structured receipt with items and fees in source order.
    pub receipt: ParsedReceipt,
    /// Insert time of the image row.
    pub created_at: DateTime<Utc>,
}

define_port_error! {
    /// Errors raised by receipt repository adapters.
    pub enum ReceiptRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "receipt repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "receipt repository query failed: {message}",
        /// Stored data could not be decoded into the domain model.
        Decode { message: String } => "receipt repository decode failed: {message}",
        /// An image with the same fingerprint is already stored.
        DuplicateImage { fingerprint: String } =>
            "receipt image {fingerprint} is already stored",
    }
}

/// Port for receipt persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    /// Load the receipt stored for `fingerprint`, if any.
    async fn find_by_hash(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<StoredReceipt>, ReceiptRepositoryError>;

    /// Load the receipt with header id `receipt_id`, if any.
    async fn find_by_id(
        &self,
        receipt_id: Uuid,
    ) -> Result<Option<StoredReceipt>, ReceiptRepositoryError>;

    /// Write the image, header, items, and fees in one transaction.
    ///
    /// Either every row is written or none is.
    async fn persist(
        &self,
        record: &NewReceiptRecord,
    ) -> Result<PersistedReceiptIds, ReceiptRepositoryError>;
}
