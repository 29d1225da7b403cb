//! One receipt image from bytes to a structured record.
//!
//! Stages run strictly in order: upload, OCR, structuring, mapping. The first
//! failure aborts the run. An image that was already uploaded stays in blob
//! storage; orphaned blobs are not reconciled.

use std::sync::Arc;

use tracing::info;

use crate::domain::ports::{BlobStore, ResponseCache, StructuredExtractor, TextDetector};
use crate::domain::{
    ImageFingerprint, ParsedReceipt, Receipt, ReceiptPipelineError, StructuredExtractionService,
    TextExtractionService,
};

/// Container receipt images are uploaded to.
pub const RECEIPT_CONTAINER: &str = "receipts";

/// Instruction sent with every receipt structuring request.
pub const RECEIPT_PROMPT: &str = "Convert the given text of a receipt into a structured output format";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Result of a successful extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedReceipt {
    /// Identity of the source image.
    pub fingerprint: ImageFingerprint,
    /// Blob container holding the image.
    pub bucket: String,
    /// Blob key of the image.
    pub key: String,
    /// Reconstructed OCR lines joined with `\n`.
    pub raw_text: String,
    /// Structured receipt.
    pub receipt: ParsedReceipt,
}

/// Sequences upload, OCR, and structuring for one image.
pub struct ReceiptExtractionService<B, D, E, C> {
    blob_store: Arc<B>,
    text: TextExtractionService<D, C>,
    structured: StructuredExtractionService<E, C>,
}

impl<B, D, E, C> Clone for ReceiptExtractionService<B, D, E, C> {
    fn clone(&self) -> Self {
        Self {
            blob_store: Arc::clone(&self.blob_store),
            text: self.text.clone(),
            structured: self.structured.clone(),
        }
    }
}

impl<B, D, E, C> ReceiptExtractionService<B, D, E, C> {
    /// Create a new extraction orchestrator.
    pub fn new(
        blob_store: Arc<B>,
        text: TextExtractionService<D, C>,
        structured: StructuredExtractionService<E, C>,
    ) -> Self {
        Self {
            blob_store,
            text,
            structured,
        }
    }
}

impl<B, D, E, C> ReceiptExtractionService<B, D, E, C>
where
    B: BlobStore,
    D: TextDetector,
    E: StructuredExtractor,
    C: ResponseCache,
{
    /// Extract a structured receipt from `image`.
    pub async fn extract(
        &self,
        image: &[u8],
        file_name: &str,
    ) -> Result<ExtractedReceipt, ReceiptPipelineError> {
        let fingerprint = ImageFingerprint::of(image);
        let (key, content_type) = blob_naming(&fingerprint, file_name);

        let location = self
            .blob_store
            .put(RECEIPT_CONTAINER, &key, image, &content_type)
            .await
            .map_err(ReceiptPipelineError::Upload)?;
        info!(fingerprint = %fingerprint, key = %location.key, "receipt image uploaded");

        let lines = self
            .text
            .detect_text(image)
            .await
            .map_err(ReceiptPipelineError::TextExtraction)?;
        let raw_text = lines.join("\n");
        info!(fingerprint = %fingerprint, lines = lines.len(), "receipt text extracted");

        let receipt = self
            .structured
            .structure_as::<Receipt>(RECEIPT_PROMPT, &raw_text)
            .await
            .map_err(ReceiptPipelineError::StructuredExtraction)?;
        info!(
            fingerprint = %fingerprint,
            items = receipt.items.len(),
            fees = receipt.other_fees.len(),
            "receipt structured"
        );

        Ok(ExtractedReceipt {
            fingerprint,
            bucket: location.container,
            key: location.key,
            raw_text,
            receipt: ParsedReceipt::from(receipt),
        })
    }
}

/// Extension of the final path component of `file_name`: the text after its
/// last `.`, or empty.
fn file_extension(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.rsplit_once('.').map_or("", |(_, extension)| extension)
}

fn blob_naming(fingerprint: &ImageFingerprint, file_name: &str) -> (String, String) {
    match file_extension(file_name) {
        "" => (fingerprint.to_string(), FALLBACK_CONTENT_TYPE.to_owned()),
        extension => (
            format!("{fingerprint}.{extension}"),
            format!("image/{extension}"),
        ),
    }
}
