//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **cache**: filesystem and in-memory response caches
//! - **vision**: Google Cloud Vision text detection over HTTP
//! - **openai**: OpenAI chat completions with JSON-schema responses
//! - **storage**: filesystem-backed blob store
//! - **persistence**: PostgreSQL receipt repository using Diesel ORM
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod cache;
pub(crate) mod http_support;
pub mod openai;
pub mod persistence;
pub mod storage;
pub mod vision;
