//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (providers, object storage, caches, the relational store). Each trait
//! exposes strongly typed errors so adapters map their failures into
//! predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod blob_store;
mod cache_key;
mod receipt_ingestion_command;
mod receipt_lookup_query;
mod receipt_repository;
mod response_cache;
mod structured_extractor;
mod text_detector;

#[cfg(test)]
pub use blob_store::MockBlobStore;
pub use blob_store::{BlobLocation, BlobStore, BlobStoreError};
pub use cache_key::{CacheKey, CacheKeyValidationError, CacheNamespace};
#[cfg(test)]
pub use receipt_ingestion_command::MockReceiptIngestionCommand;
pub use receipt_ingestion_command::{ReceiptIngestionCommand, UploadOutcome};
#[cfg(test)]
pub use receipt_lookup_query::MockReceiptLookupQuery;
pub use receipt_lookup_query::{ReceiptLookupError, ReceiptLookupQuery, ReceiptView};
#[cfg(test)]
pub use receipt_repository::MockReceiptRepository;
pub use receipt_repository::{
    NewReceiptRecord, PersistedReceiptIds, ReceiptOwner, ReceiptRepository,
    ReceiptRepositoryError, StoredReceipt,
};
#[cfg(test)]
pub use response_cache::MockResponseCache;
pub use response_cache::{ResponseCache, ResponseCacheError};
#[cfg(test)]
pub use structured_extractor::MockStructuredExtractor;
pub use structured_extractor::{
    StructuredExtractionRequest, StructuredExtractor, StructuredExtractorError,
};
#[cfg(test)]
pub use text_detector::MockTextDetector;
pub use text_detector::{FixtureTextDetector, TextDetector, TextDetectorError};
