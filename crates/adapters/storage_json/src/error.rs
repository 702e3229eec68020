//! Errors raised while reading or writing the rules file.

use std::path::PathBuf;

use adrules_domain::error::RulesError;

#[derive(Debug, thiserror::Error)]
pub enum JsonStoreError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid rules document")]
    Json(#[from] serde_json::Error),

    /// The document was written by a newer release.
    #[error("rules document uses schema version {found}, newest supported is {supported}")]
    UnsupportedSchemaVersion { found: u64, supported: u32 },
}

impl From<JsonStoreError> for RulesError {
    fn from(err: JsonStoreError) -> Self {
        Self::persistence(err)
    }
}
