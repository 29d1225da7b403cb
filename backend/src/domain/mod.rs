//! Domain primitives and services for receipt extraction.
//!
//! Purpose: turn a receipt photo into a stored, structured record while
//! calling the OCR and LLM providers at most once per distinct input. Types
//! here are transport agnostic; adapters live under `crate::outbound`.
//!
//! Public surface:
//! - `ImageFingerprint`, `RequestFingerprint`: content identities.
//! - `LineReconstructor`: word boxes to reading-order lines.
//! - `TextExtractionService`, `StructuredExtractionService`: cached provider
//!   calls.
//! - `ReceiptExtractionService`: upload, OCR and structuring for one image.
//! - `ReceiptIngestionService`: dedup plus transactional persistence.
//! - `ReceiptLookupService`: reads stored receipts.

pub mod error;
pub mod fingerprint;
pub mod line_reconstruction;
pub mod ports;
pub mod receipt;
pub mod receipt_extraction;
pub mod receipt_ingestion;
pub mod receipt_lookup;
pub mod response_cache;
pub mod structured_extraction;
pub mod text_extraction;

pub use self::error::{PipelineStage, ReceiptPipelineError};
pub use self::fingerprint::{FingerprintValidationError, ImageFingerprint, RequestFingerprint};
pub use self::line_reconstruction::{
    DEFAULT_LINE_Y_THRESHOLD, LineReconstructor, Vertex, WordBox,
};
pub use self::receipt::{
    OrderItem, OtherFee, ParsedReceipt, PaymentDetails, Receipt, StructuredOutput, parse_opened,
};
pub use self::receipt_extraction::{
    ExtractedReceipt, RECEIPT_CONTAINER, RECEIPT_PROMPT, ReceiptExtractionService,
};
pub use self::receipt_ingestion::ReceiptIngestionService;
pub use self::receipt_lookup::{RECEIPT_IMAGE_URL_TTL, ReceiptLookupService};
pub use self::response_cache::BestEffortCache;
pub use self::structured_extraction::{StructuredExtractionError, StructuredExtractionService};
pub use self::text_extraction::TextExtractionService;
