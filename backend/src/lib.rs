//! Receipt extraction pipeline.
//!
//! Turns a photographed receipt into structured, persisted data: the image is
//! fingerprinted and deduplicated, stored as a blob, run through text
//! detection and schema-constrained structured extraction (both cached by
//! request fingerprint), and written transactionally to PostgreSQL.
//!
//! - [`domain`] holds the pipeline services and the ports they depend on.
//! - [`outbound`] holds adapters for providers, caches, storage and the
//!   database.
//! - [`settings`] loads runtime configuration.

pub mod domain;
pub mod outbound;
pub mod settings;
