//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Provides the receipt repository backed by PostgreSQL via `diesel-async`
//! and a `bb8` connection pool, plus the embedded schema migrations.
//!
//! # Architecture
//!
//! - **Thin adapters**: the repository only translates between Diesel rows
//!   and domain types. Deduplication decisions live in the domain.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: database failures map onto
//!   `ReceiptRepositoryError`, with unique violations reported as duplicates.
//!
//! # Example
//!
//! ```ignore
//! use civet_backend::outbound::persistence::{DbPool, DieselReceiptRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/civet")).await?;
//! let repo = DieselReceiptRepository::new(pool);
//! ```

mod diesel_receipt_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_receipt_repository::DieselReceiptRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
