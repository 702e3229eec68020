//! # adrules-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `RuleStore` port defined in `adrules-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain rules and database rows
//!
//! ## Dependency rule
//! Depends on `adrules-app` (for port traits) and `adrules-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod pool;
pub mod rule_store;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use rule_store::SqliteRuleStore;
