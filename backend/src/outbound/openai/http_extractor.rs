//! Reqwest-backed OpenAI structured extractor.
//!
//! Sends the input text as the single user message and constrains the answer
//! with a strict JSON schema. Decoding the message into a domain type is left
//! to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;
use zeroize::Zeroizing;

use super::dto::{ChatCompletionRequestDto, ChatCompletionResponseDto};
use crate::domain::ports::{
    StructuredExtractionRequest, StructuredExtractor, StructuredExtractorError,
};
use crate::outbound::http_support::{HttpFailure, HttpFailureKind, endpoint_url};

/// Model used when none is configured.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const COMPLETIONS_PATH: &str = "chat/completions";

/// OpenAI adapter issuing one completion per request.
pub struct OpenAiHttpStructuredExtractor {
    client: Client,
    endpoint: Url,
    api_key: Zeroizing<String>,
    model: String,
}

impl OpenAiHttpStructuredExtractor {
    /// Build an extractor against `base_url` with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StructuredExtractorError::InvalidRequest`] when the endpoint
    /// cannot be derived from `base_url`, or
    /// [`StructuredExtractorError::Transport`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        base_url: &Url,
        api_key: Zeroizing<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StructuredExtractorError> {
        let endpoint = endpoint_url(base_url, COMPLETIONS_PATH).map_err(|err| {
            StructuredExtractorError::invalid_request(format!("openai endpoint: {err}"))
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StructuredExtractorError::transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl StructuredExtractor for OpenAiHttpStructuredExtractor {
    async fn complete(
        &self,
        request: &StructuredExtractionRequest,
    ) -> Result<String, StructuredExtractorError> {
        let body = ChatCompletionRequestDto::structured(&self.model, request);
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.as_str())
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

        let content = parse_content(bytes.as_ref())?;
        debug!(
            schema_name = %request.schema_name,
            model = %self.model,
            "structured completion received"
        );
        Ok(content)
    }
}

fn parse_content(body: &[u8]) -> Result<String, StructuredExtractorError> {
    let decoded: ChatCompletionResponseDto = serde_json::from_slice(body).map_err(|error| {
        StructuredExtractorError::decode(format!("invalid OpenAI JSON payload: {error}"))
    })?;
    decoded
        .into_content()
        .map_err(StructuredExtractorError::decode)
}

fn map_failure(failure: HttpFailure) -> StructuredExtractorError {
    match failure.kind {
        HttpFailureKind::Transport => StructuredExtractorError::transport(failure.message),
        HttpFailureKind::Timeout => StructuredExtractorError::timeout(failure.message),
        HttpFailureKind::RateLimited => StructuredExtractorError::rate_limited(failure.message),
        HttpFailureKind::InvalidRequest => {
            StructuredExtractorError::invalid_request(failure.message)
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network OpenAI mapping helpers.
    use super::*;
    use reqwest::StatusCode;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn request() -> StructuredExtractionRequest {
        StructuredExtractionRequest {
            prompt: "Convert the text".to_owned(),
            input: "TOTAL 6.30".to_owned(),
            schema_name: "total".to_owned(),
            schema: json!({"type": "object", "additionalProperties": false}),
        }
    }

    #[test]
    fn request_body_uses_strict_json_schema() {
        let request = request();
        let body = ChatCompletionRequestDto::structured(DEFAULT_OPENAI_MODEL, &request);
        let encoded = serde_json::to_value(&body).expect("encode");
        assert_eq!(
            encoded,
            json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "TOTAL 6.30"}],
                "response_format": {
                    "type": "json_schema",
                    "json_schema": {
                        "name": "total",
                        "description": "Convert the text",
                        "schema": {"type": "object", "additionalProperties": false},
                        "strict": true
                    }
                }
            })
        );
    }

    #[test]
    fn returns_first_choice_content() {
        let body = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "{\"total\":6.3}", "refusal": null}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        });
        let content = parse_content(body.to_string().as_bytes()).expect("content");
        assert_eq!(content, "{\"total\":6.3}");
    }

    #[rstest]
    #[case::no_choices(json!({"choices": []}))]
    #[case::refusal(json!({"choices": [{"message": {"content": null, "refusal": "I can't help"}}]}))]
    #[case::null_content(json!({"choices": [{"message": {"content": null}}]}))]
    fn unusable_completions_map_to_decode(#[case] body: Value) {
        let err = parse_content(body.to_string().as_bytes()).expect_err("unusable");
        assert!(matches!(err, StructuredExtractorError::Decode { .. }), "got {err}");
    }

    #[rstest]
    #[case::rate_limited(StatusCode::TOO_MANY_REQUESTS)]
    #[case::timeout(StatusCode::GATEWAY_TIMEOUT)]
    #[case::unauthorised(StatusCode::UNAUTHORIZED)]
    fn status_failures_map_to_port_errors(#[case] status: StatusCode) {
        let err = map_failure(HttpFailure::from_status(status, b"{}"));
        let matched = match status {
            StatusCode::TOO_MANY_REQUESTS => {
                matches!(err, StructuredExtractorError::RateLimited { .. })
            }
            StatusCode::GATEWAY_TIMEOUT => matches!(err, StructuredExtractorError::Timeout { .. }),
            _ => matches!(err, StructuredExtractorError::InvalidRequest { .. }),
        };
        assert!(matched, "unexpected mapping for {status}: {err}");
    }

    #[test]
    fn new_resolves_completions_endpoint() {
        let base = Url::parse("https://api.openai.com/v1").expect("valid url");
        let extractor = OpenAiHttpStructuredExtractor::new(
            &base,
            Zeroizing::new("sk-test".to_owned()),
            DEFAULT_OPENAI_MODEL,
            Duration::from_secs(5),
        )
        .expect("extractor builds");
        assert_eq!(
            extractor.endpoint.as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
