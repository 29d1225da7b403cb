//! DTOs for the chat completions request and response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ports::StructuredExtractionRequest;

#[derive(Debug, Serialize)]
pub(super) struct ChatCompletionRequestDto<'a> {
    pub(super) model: &'a str,
    pub(super) messages: [ChatMessageDto<'a>; 1],
    pub(super) response_format: ResponseFormatDto<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatMessageDto<'a> {
    pub(super) role: &'a str,
    pub(super) content: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct ResponseFormatDto<'a> {
    #[serde(rename = "type")]
    pub(super) format_type: &'a str,
    pub(super) json_schema: JsonSchemaDto<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct JsonSchemaDto<'a> {
    pub(super) name: &'a str,
    pub(super) description: &'a str,
    pub(super) schema: &'a Value,
    pub(super) strict: bool,
}

impl<'a> ChatCompletionRequestDto<'a> {
    pub(super) fn structured(model: &'a str, request: &'a StructuredExtractionRequest) -> Self {
        Self {
            model,
            messages: [ChatMessageDto {
                role: "user",
                content: request.input.as_str(),
            }],
            response_format: ResponseFormatDto {
                format_type: "json_schema",
                json_schema: JsonSchemaDto {
                    name: request.schema_name.as_str(),
                    description: request.prompt.as_str(),
                    schema: &request.schema,
                    strict: true,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatCompletionResponseDto {
    #[serde(default)]
    pub(super) choices: Vec<ChoiceDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChoiceDto {
    pub(super) message: AssistantMessageDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct AssistantMessageDto {
    pub(super) content: Option<String>,
    pub(super) refusal: Option<String>,
}

impl ChatCompletionResponseDto {
    /// Content of the first choice, or a reason it is unusable.
    pub(super) fn into_content(self) -> Result<String, String> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| "completion returned no choices".to_owned())?;
        if let Some(refusal) = choice.message.refusal {
            return Err(format!("model refused: {refusal}"));
        }
        choice
            .message
            .content
            .ok_or_else(|| "completion message has no content".to_owned())
    }
}
