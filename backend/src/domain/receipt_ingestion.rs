//! Receipt ingestion: dedup, extraction, and transactional persistence.
//!
//! The dedup check runs before any provider or storage call. The database
//! unique constraint on the image fingerprint remains the source of truth, so
//! a concurrent duplicate that slips past the check is still reported as
//! already existing rather than as a failure.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::ports::{
    BlobStore, NewReceiptRecord, ReceiptIngestionCommand, ReceiptOwner, ReceiptRepository,
    ReceiptRepositoryError, ResponseCache, StructuredExtractor, TextDetector, UploadOutcome,
};
use crate::domain::{ImageFingerprint, ReceiptExtractionService, ReceiptPipelineError};

/// Domain service implementing [`ReceiptIngestionCommand`].
pub struct ReceiptIngestionService<R, B, D, E, C> {
    repository: Arc<R>,
    extraction: ReceiptExtractionService<B, D, E, C>,
}

impl<R, B, D, E, C> Clone for ReceiptIngestionService<R, B, D, E, C> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            extraction: self.extraction.clone(),
        }
    }
}

impl<R, B, D, E, C> ReceiptIngestionService<R, B, D, E, C> {
    /// Create a new ingestion service.
    pub fn new(repository: Arc<R>, extraction: ReceiptExtractionService<B, D, E, C>) -> Self {
        Self {
            repository,
            extraction,
        }
    }
}

#[async_trait]
impl<R, B, D, E, C> ReceiptIngestionCommand for ReceiptIngestionService<R, B, D, E, C>
where
    R: ReceiptRepository,
    B: BlobStore,
    D: TextDetector,
    E: StructuredExtractor,
    C: ResponseCache,
{
    async fn process_upload(
        &self,
        image: &[u8],
        file_name: &str,
        owner: ReceiptOwner,
    ) -> Result<UploadOutcome, ReceiptPipelineError> {
        let fingerprint = ImageFingerprint::of(image);

        if let Some(existing) = self
            .repository
            .find_by_hash(&fingerprint)
            .await
            .map_err(ReceiptPipelineError::DuplicateLookup)?
        {
            info!(
                fingerprint = %fingerprint,
                receipt_id = %existing.ids.receipt_id,
                "receipt image already stored; skipping extraction"
            );
            return Ok(UploadOutcome {
                fingerprint,
                already_existed: true,
                receipt_id: Some(existing.ids.receipt_id),
            });
        }

        let extracted = self
            .extraction
            .extract(image, file_name)
            .await
            .inspect_err(|err| {
                warn!(fingerprint = %fingerprint, stage = %err.stage(), error = %err, "receipt extraction failed");
            })?;

        let record = NewReceiptRecord {
            fingerprint: extracted.fingerprint,
            bucket: extracted.bucket,
            key: extracted.key,
            raw_text: extracted.raw_text,
            file_name: file_name.to_owned(),
            owner,
            receipt: extracted.receipt,
        };

        match self.repository.persist(&record).await {
            Ok(ids) => {
                info!(
                    fingerprint = %record.fingerprint,
                    receipt_id = %ids.receipt_id,
                    "receipt stored"
                );
                Ok(UploadOutcome {
                    fingerprint: record.fingerprint,
                    already_existed: false,
                    receipt_id: Some(ids.receipt_id),
                })
            }
            Err(ReceiptRepositoryError::DuplicateImage { .. }) => {
                info!(
                    fingerprint = %record.fingerprint,
                    "receipt image stored concurrently; reporting existing"
                );
                Ok(UploadOutcome {
                    fingerprint: record.fingerprint,
                    already_existed: true,
                    receipt_id: None,
                })
            }
            Err(err) => {
                warn!(fingerprint = %record.fingerprint, error = %err, "receipt persistence failed");
                Err(ReceiptPipelineError::Persistence(err))
            }
        }
    }
}

#[cfg(test)]
#[path = "receipt_ingestion_tests.rs"]
mod tests;
