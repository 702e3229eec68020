//! # adrules-adapter-storage-json
//!
//! Rule persistence in a single versioned JSON document on disk.
//!
//! ## Responsibilities
//! - Implement the `RuleStore` port defined in `adrules-app::ports`
//! - Read both the current document format and the legacy bare-array format
//! - Replace the file atomically on every save
//!
//! ## Dependency rule
//! Depends on `adrules-app` (for port traits) and `adrules-domain` (for domain types).

pub mod error;
pub mod rule_store;

pub use error::JsonStoreError;
pub use rule_store::JsonFileRuleStore;
