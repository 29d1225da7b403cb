//! Google Cloud Vision outbound adapter.
//!
//! Implements the `TextDetector` port with the `images:annotate` endpoint and
//! the `TEXT_DETECTION` feature.

mod dto;
mod http_detector;

pub use http_detector::VisionHttpTextDetector;
