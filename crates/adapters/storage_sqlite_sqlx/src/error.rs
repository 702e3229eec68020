//! Storage-specific error type wrapping sqlx errors.

use adrules_domain::error::RulesError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize or deserialize a stored JSON value.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A row was written by a newer version of the schema.
    #[error("rule {rule_id} uses schema version {found}, newest supported is {supported}")]
    UnsupportedSchemaVersion {
        rule_id: String,
        found: i64,
        supported: u32,
    },
}

impl From<StorageError> for RulesError {
    fn from(err: StorageError) -> Self {
        Self::persistence(err)
    }
}
