//! Driven port for OCR providers returning word-level annotations.
use async_trait::async_trait;

use super::define_port_error;
use crate::domain::line_reconstruction::WordBox;

define_port_error! {
    /// Errors surfaced while calling the OCR provider.
    pub enum TextDetectorError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "text detection transport failed: {message}",
        /// Provider call exceeded the client timeout.
        Timeout { message: String } =>
            "text detection timeout: {message}",
        /// Provider rate-limited the request.
        RateLimited { message: String } =>
            "text detection rate limited request: {message}",
        /// Provider rejected the request as malformed or unauthorised.
        InvalidRequest { message: String } =>
            "text detection request invalid: {message}",
        /// Provider answered but reported an error for the image.
        Rejected { message: String } =>
            "text detection rejected image: {message}",
        /// Provider response could not be decoded.
        Decode { message: String } =>
            "text detection response decode failed: {message}",
    }
}

/// Port for detecting text in an image.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextDetector: Send + Sync {
    /// Detect words in `image`.
    ///
    /// The first annotation is the provider's full-text summary; the rest are
    /// individual words in provider order.
    async fn detect(&self, image: &[u8]) -> Result<Vec<WordBox>, TextDetectorError>;
}

/// Fixture implementation returning no annotations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureTextDetector;

#[async_trait]
impl TextDetector for FixtureTextDetector {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<WordBox>, TextDetectorError> {
        Ok(Vec::new())
    }
}
