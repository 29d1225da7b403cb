//! Schema-constrained LLM structuring behind the response cache.
//!
//! The cache key covers the prompt, the input text, the schema name, and the
//! schema itself, so editing any of them bypasses earlier results.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::ports::{
    CacheNamespace, ResponseCache, StructuredExtractionRequest, StructuredExtractor,
    StructuredExtractorError,
};
use crate::domain::{
    BestEffortCache, FingerprintValidationError, RequestFingerprint, StructuredOutput,
};

/// Errors raised while structuring text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuredExtractionError {
    /// Provider call failed.
    #[error(transparent)]
    Provider(#[from] StructuredExtractorError),
    /// Provider answered with content that does not match the target type.
    #[error("structured response did not match {schema_name}: {message}")]
    Decode {
        /// Schema the response was decoded against.
        schema_name: String,
        /// Decoder message.
        message: String,
    },
    /// Request could not be fingerprinted.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintValidationError),
}

/// Converts free text into typed values through a structured extractor.
pub struct StructuredExtractionService<E, C> {
    extractor: Arc<E>,
    cache: BestEffortCache<C>,
}

impl<E, C> Clone for StructuredExtractionService<E, C> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            cache: self.cache.clone(),
        }
    }
}

impl<E, C> StructuredExtractionService<E, C> {
    /// Create a new structured extraction service.
    pub fn new(extractor: Arc<E>, cache: BestEffortCache<C>) -> Self {
        Self { extractor, cache }
    }
}

impl<E, C> StructuredExtractionService<E, C>
where
    E: StructuredExtractor,
    C: ResponseCache,
{
    /// Structure `input` as `T` using `T`'s registered schema.
    ///
    /// # Examples
    /// ```rust,ignore
    /// let receipt: Receipt = service
    ///     .structure_as::<Receipt>("Convert the given text", &ocr_text)
    ///     .await?;
    /// ```
    pub async fn structure_as<T>(&self, prompt: &str, input: &str) -> Result<T, StructuredExtractionError>
    where
        T: StructuredOutput + Sync,
    {
        self.structure(prompt, input, T::SCHEMA_NAME, T::json_schema())
            .await
    }

    /// Structure `input` as `T` against an explicit schema.
    ///
    /// A cached value that no longer decodes as `T` counts as a miss.
    pub async fn structure<T>(
        &self,
        prompt: &str,
        input: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<T, StructuredExtractionError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let fingerprint =
            RequestFingerprint::for_structured_request(prompt, input, schema_name, &schema)?;
        let key = match fingerprint.cache_key() {
            Ok(key) => Some(key),
            Err(err) => {
                warn!(fingerprint = %fingerprint, error = %err, "request fingerprint is not a cache key");
                None
            }
        };

        let cached = match key.as_ref() {
            Some(key) => {
                self.cache
                    .lookup::<T>(CacheNamespace::StructuredExtraction, key)
                    .await
            }
            None => None,
        };
        if let Some(value) = cached {
            return Ok(value);
        }

        let request = StructuredExtractionRequest {
            prompt: prompt.to_owned(),
            input: input.to_owned(),
            schema_name: schema_name.to_owned(),
            schema,
        };
        let message = self.extractor.complete(&request).await?;
        let value: T =
            serde_json::from_str(&message).map_err(|err| StructuredExtractionError::Decode {
                schema_name: schema_name.to_owned(),
                message: err.to_string(),
            })?;
        debug!(fingerprint = %fingerprint, schema_name, "structured response decoded");

        if let Some(key) = key.as_ref() {
            self.cache
                .store(CacheNamespace::StructuredExtraction, key, &value)
                .await;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    //! Cache keying and decode behaviour of structured extraction.
    use super::*;
    use crate::domain::ports::MockStructuredExtractor;
    use crate::outbound::cache::InMemoryResponseCache;
    use rstest::{fixture, rstest};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Total {
        total: f64,
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {"total": {"type": "number"}},
            "required": ["total"],
            "additionalProperties": false,
        })
    }

    #[fixture]
    fn cache() -> Arc<InMemoryResponseCache> {
        Arc::new(InMemoryResponseCache::default())
    }

    fn service(
        extractor: MockStructuredExtractor,
        cache: &Arc<InMemoryResponseCache>,
    ) -> StructuredExtractionService<MockStructuredExtractor, InMemoryResponseCache> {
        StructuredExtractionService::new(
            Arc::new(extractor),
            BestEffortCache::new(Arc::clone(cache)),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn second_identical_request_is_served_from_cache(cache: Arc<InMemoryResponseCache>) {
        let mut extractor = MockStructuredExtractor::new();
        extractor
            .expect_complete()
            .withf(|request| {
                request.prompt == "p" && request.input == "TOTAL 6.30" && request.schema_name == "total"
            })
            .times(1)
            .return_once(|_| Ok(r#"{"total": 6.3}"#.to_owned()));
        let svc = service(extractor, &cache);

        let first: Total = svc
            .structure("p", "TOTAL 6.30", "total", schema())
            .await
            .expect("structured");
        let second: Total = svc
            .structure("p", "TOTAL 6.30", "total", schema())
            .await
            .expect("cached");
        assert_eq!(first, Total { total: 6.3 });
        assert_eq!(second, first);
    }

    #[rstest]
    #[case::prompt("other prompt", "total", schema())]
    #[case::schema_name("p", "other_total", schema())]
    #[case::schema("p", "total", json!({"type": "object", "properties": {"total": {"type": "integer"}}}))]
    #[tokio::test]
    async fn changed_request_inputs_bypass_stale_results(
        cache: Arc<InMemoryResponseCache>,
        #[case] prompt: &'static str,
        #[case] schema_name: &'static str,
        #[case] changed_schema: Value,
    ) {
        let mut extractor = MockStructuredExtractor::new();
        let mut responses = vec![
            Ok(r#"{"total": 1.0}"#.to_owned()),
            Ok(r#"{"total": 2.0}"#.to_owned()),
        ]
        .into_iter();
        extractor
            .expect_complete()
            .times(2)
            .returning(move |_| responses.next().unwrap_or_else(|| Ok("{}".to_owned())));
        let svc = service(extractor, &cache);

        let original: Total = svc
            .structure("p", "TOTAL", "total", schema())
            .await
            .expect("original");
        let changed: Total = svc
            .structure(prompt, "TOTAL", schema_name, changed_schema)
            .await
            .expect("changed");
        assert_eq!(original, Total { total: 1.0 });
        assert_eq!(changed, Total { total: 2.0 });
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_fields_in_response_are_rejected(cache: Arc<InMemoryResponseCache>) {
        let mut extractor = MockStructuredExtractor::new();
        extractor
            .expect_complete()
            .times(1)
            .return_once(|_| Ok(r#"{"total": 6.3, "currency": "USD"}"#.to_owned()));

        let err = service(extractor, &cache)
            .structure::<Total>("p", "TOTAL", "total", schema())
            .await
            .expect_err("strict decode");
        assert!(matches!(
            err,
            StructuredExtractionError::Decode { ref schema_name, .. } if schema_name == "total"
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn decode_failures_are_not_cached(cache: Arc<InMemoryResponseCache>) {
        let mut extractor = MockStructuredExtractor::new();
        let mut responses = vec![
            Ok("not json".to_owned()),
            Ok(r#"{"total": 4.0}"#.to_owned()),
        ]
        .into_iter();
        extractor
            .expect_complete()
            .times(2)
            .returning(move |_| responses.next().unwrap_or_else(|| Ok("{}".to_owned())));
        let svc = service(extractor, &cache);

        let first = svc.structure::<Total>("p", "TOTAL", "total", schema()).await;
        assert!(first.is_err());
        let second: Total = svc
            .structure("p", "TOTAL", "total", schema())
            .await
            .expect("retry succeeds");
        assert_eq!(second, Total { total: 4.0 });
    }

    #[rstest]
    #[tokio::test]
    async fn provider_errors_propagate(cache: Arc<InMemoryResponseCache>) {
        let mut extractor = MockStructuredExtractor::new();
        extractor
            .expect_complete()
            .times(1)
            .return_once(|_| Err(StructuredExtractorError::timeout("60s elapsed")));

        let err = service(extractor, &cache)
            .structure::<Total>("p", "TOTAL", "total", schema())
            .await
            .expect_err("provider failure");
        assert_eq!(
            err,
            StructuredExtractionError::Provider(StructuredExtractorError::timeout("60s elapsed"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn structure_as_uses_registered_schema(cache: Arc<InMemoryResponseCache>) {
        use crate::domain::Receipt;

        let mut extractor = MockStructuredExtractor::new();
        extractor
            .expect_complete()
            .withf(|request| {
                request.schema_name == "receipt_info" && request.schema == Receipt::json_schema()
            })
            .times(1)
            .return_once(|_| Err(StructuredExtractorError::invalid_request("bad key")));

        let err = service(extractor, &cache)
            .structure_as::<Receipt>("p", "text")
            .await
            .expect_err("provider failure");
        assert!(matches!(err, StructuredExtractionError::Provider(_)));
    }
}
