//! Reqwest-backed Google Cloud Vision text detector.
//!
//! This adapter owns transport details only: request encoding, API-key
//! authentication, timeout and HTTP error mapping, and decoding annotations
//! into domain word boxes.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use tracing::debug;
use url::Url;
use zeroize::Zeroizing;

use super::dto::{AnnotateOutcome, AnnotateRequestDto, AnnotateResponseDto};
use crate::domain::WordBox;
use crate::domain::ports::{TextDetector, TextDetectorError};
use crate::outbound::http_support::{HttpFailure, HttpFailureKind, endpoint_url};

const ANNOTATE_PATH: &str = "v1/images:annotate";

/// Vision adapter that posts one image per request.
pub struct VisionHttpTextDetector {
    client: Client,
    endpoint: Url,
    api_key: Zeroizing<String>,
}

impl VisionHttpTextDetector {
    /// Build a detector against `base_url` with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TextDetectorError::InvalidRequest`] when the endpoint cannot
    /// be derived from `base_url`, or [`TextDetectorError::Transport`] when
    /// the HTTP client cannot be constructed.
    pub fn new(
        base_url: &Url,
        api_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, TextDetectorError> {
        let endpoint = endpoint_url(base_url, ANNOTATE_PATH)
            .map_err(|err| TextDetectorError::invalid_request(format!("vision endpoint: {err}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TextDetectorError::transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl TextDetector for VisionHttpTextDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<WordBox>, TextDetectorError> {
        let body = AnnotateRequestDto::text_detection(STANDARD.encode(image));
        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| map_failure(HttpFailure::from_transport(&err)))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| map_failure(HttpFailure::from_transport(&err)))?;
        if !status.is_success() {
            return Err(map_failure(HttpFailure::from_status(status, bytes.as_ref())));
        }

        let words = parse_annotations(bytes.as_ref())?;
        debug!(annotations = words.len(), "vision annotations decoded");
        Ok(words)
    }
}

fn parse_annotations(body: &[u8]) -> Result<Vec<WordBox>, TextDetectorError> {
    let decoded: AnnotateResponseDto = serde_json::from_slice(body).map_err(|error| {
        TextDetectorError::decode(format!("invalid Vision JSON payload: {error}"))
    })?;
    match decoded.into_outcome() {
        AnnotateOutcome::Annotations(words) => Ok(words),
        AnnotateOutcome::Rejected { code, message } => {
            Err(TextDetectorError::rejected(format!("code {code}: {message}")))
        }
    }
}

fn map_failure(failure: HttpFailure) -> TextDetectorError {
    match failure.kind {
        HttpFailureKind::Transport => TextDetectorError::transport(failure.message),
        HttpFailureKind::Timeout => TextDetectorError::timeout(failure.message),
        HttpFailureKind::RateLimited => TextDetectorError::rate_limited(failure.message),
        HttpFailureKind::InvalidRequest => TextDetectorError::invalid_request(failure.message),
    }
}
