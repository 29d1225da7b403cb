//! Pipeline-level error types.
//!
//! Every surfaced failure names the stage that failed so callers can tell a
//! provider outage from a storage fault without inspecting messages.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::StructuredExtractionError;
use crate::domain::ports::{BlobStoreError, ReceiptRepositoryError, TextDetectorError};

/// Stage of the receipt pipeline that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Looking up an existing receipt by image fingerprint.
    DuplicateLookup,
    /// Uploading the image to blob storage.
    Upload,
    /// OCR.
    TextExtraction,
    /// LLM structuring.
    StructuredExtraction,
    /// Transactional write of the receipt.
    Persistence,
}

impl PipelineStage {
    /// Stable snake-case name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateLookup => "duplicate_lookup",
            Self::Upload => "upload",
            Self::TextExtraction => "text_extraction",
            Self::StructuredExtraction => "structured_extraction",
            Self::Persistence => "persistence",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one receipt pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiptPipelineError {
    /// Dedup lookup failed before any work started.
    #[error("duplicate lookup failed: {0}")]
    DuplicateLookup(#[source] ReceiptRepositoryError),
    /// Image upload failed.
    #[error("image upload failed: {0}")]
    Upload(#[source] BlobStoreError),
    /// OCR failed.
    #[error("text extraction failed: {0}")]
    TextExtraction(#[source] TextDetectorError),
    /// Structuring failed.
    #[error("structured extraction failed: {0}")]
    StructuredExtraction(#[source] StructuredExtractionError),
    /// The receipt could not be written; nothing was committed.
    #[error("receipt persistence failed: {0}")]
    Persistence(#[source] ReceiptRepositoryError),
}

impl ReceiptPipelineError {
    /// Stage that failed.
    pub const fn stage(&self) -> PipelineStage {
        match self {
            Self::DuplicateLookup(_) => PipelineStage::DuplicateLookup,
            Self::Upload(_) => PipelineStage::Upload,
            Self::TextExtraction(_) => PipelineStage::TextExtraction,
            Self::StructuredExtraction(_) => PipelineStage::StructuredExtraction,
            Self::Persistence(_) => PipelineStage::Persistence,
        }
    }
}
