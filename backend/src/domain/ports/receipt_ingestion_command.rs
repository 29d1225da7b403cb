//! Driving port for ingesting one uploaded receipt image.
use async_trait::async_trait;
use uuid::Uuid;

use super::ReceiptOwner;
use crate::domain::{ImageFingerprint, ReceiptPipelineError};

/// Outcome of processing one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Identity of the uploaded image.
    pub fingerprint: ImageFingerprint,
    /// Whether the image had already been stored.
    pub already_existed: bool,
    /// Header id of the stored receipt, when known.
    ///
    /// A concurrent duplicate that loses the insert race reports
    /// `already_existed` without an id.
    pub receipt_id: Option<Uuid>,
}

/// Domain use-case port for receipt uploads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReceiptIngestionCommand: Send + Sync {
    /// Deduplicate, extract, and persist one receipt image.
    async fn process_upload(
        &self,
        image: &[u8],
        file_name: &str,
        owner: ReceiptOwner,
    ) -> Result<UploadOutcome, ReceiptPipelineError>;
}
