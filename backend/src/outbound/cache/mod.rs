//! Response cache adapters.
//!
//! - [`FileResponseCache`]: one directory per namespace and one JSON file per
//!   entry; survives restarts.
//! - [`InMemoryResponseCache`]: process-local map for tests and one-off runs.
//!
//! Neither adapter evicts. Writing an existing key keeps the first payload.

mod file;
mod memory;

pub use file::FileResponseCache;
pub use memory::InMemoryResponseCache;
