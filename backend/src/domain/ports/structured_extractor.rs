//! Driven port for schema-constrained LLM completions.
use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;

/// One schema-constrained completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredExtractionRequest {
    /// Instruction describing the transformation.
    pub prompt: String,
    /// Free text the model should structure.
    pub input: String,
    /// Name the schema is registered under with the provider.
    pub schema_name: String,
    /// JSON schema the response must satisfy.
    pub schema: Value,
}

define_port_error! {
    /// Errors surfaced while calling the LLM provider.
    pub enum StructuredExtractorError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "structured extraction transport failed: {message}",
        /// Provider call exceeded the client timeout.
        Timeout { message: String } =>
            "structured extraction timeout: {message}",
        /// Provider rate-limited the request.
        RateLimited { message: String } =>
            "structured extraction rate limited request: {message}",
        /// Provider rejected the request as malformed or unauthorised.
        InvalidRequest { message: String } =>
            "structured extraction request invalid: {message}",
        /// Provider response could not be decoded or carried no message.
        Decode { message: String } =>
            "structured extraction response decode failed: {message}",
    }
}

/// Port for issuing one strict structured-output completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Return the raw message text of the single completion choice.
    async fn complete(
        &self,
        request: &StructuredExtractionRequest,
    ) -> Result<String, StructuredExtractorError>;
}
