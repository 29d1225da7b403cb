//! OCR behind the response cache.
//!
//! Lines are cached under the image fingerprint, so the same image bytes are
//! sent to the provider at most once per cache.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::ports::{CacheNamespace, ResponseCache, TextDetector, TextDetectorError};
use crate::domain::{BestEffortCache, ImageFingerprint, LineReconstructor};

/// Detects text in receipt images and returns reconstructed lines.
pub struct TextExtractionService<D, C> {
    detector: Arc<D>,
    cache: BestEffortCache<C>,
    reconstructor: LineReconstructor,
}

impl<D, C> Clone for TextExtractionService<D, C> {
    fn clone(&self) -> Self {
        Self {
            detector: Arc::clone(&self.detector),
            cache: self.cache.clone(),
            reconstructor: self.reconstructor,
        }
    }
}

impl<D, C> TextExtractionService<D, C> {
    /// Create a new text extraction service.
    pub fn new(
        detector: Arc<D>,
        cache: BestEffortCache<C>,
        reconstructor: LineReconstructor,
    ) -> Self {
        Self {
            detector,
            cache,
            reconstructor,
        }
    }
}

impl<D, C> TextExtractionService<D, C>
where
    D: TextDetector,
    C: ResponseCache,
{
    /// Return the reading-order lines of `image`.
    ///
    /// A cached result is returned as stored, without regrouping.
    pub async fn detect_text(&self, image: &[u8]) -> Result<Vec<String>, TextDetectorError> {
        let fingerprint = ImageFingerprint::of(image);
        let key = match fingerprint.cache_key() {
            Ok(key) => Some(key),
            Err(err) => {
                warn!(fingerprint = %fingerprint, error = %err, "image fingerprint is not a cache key");
                None
            }
        };

        let cached = match key.as_ref() {
            Some(key) => {
                self.cache
                    .lookup::<Vec<String>>(CacheNamespace::TextDetection, key)
                    .await
            }
            None => None,
        };
        if let Some(lines) = cached {
            return Ok(lines);
        }

        let annotations = self.detector.detect(image).await?;
        let lines = self.reconstructor.reconstruct(&annotations);
        debug!(
            fingerprint = %fingerprint,
            annotations = annotations.len(),
            lines = lines.len(),
            "text detected"
        );

        if let Some(key) = key.as_ref() {
            self.cache
                .store(CacheNamespace::TextDetection, key, &lines)
                .await;
        }
        Ok(lines)
    }
}
