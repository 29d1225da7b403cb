//! OpenAI outbound adapter.
//!
//! Implements the `StructuredExtractor` port with chat completions and a
//! strict `json_schema` response format.

mod dto;
mod http_extractor;

pub use http_extractor::{DEFAULT_OPENAI_MODEL, OpenAiHttpStructuredExtractor};
