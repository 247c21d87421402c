//! Error taxonomy for the store and the ingestion run.

use thiserror::Error;

/// Errors raised by [`crate::store::Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be opened or created. Fatal for a run.
    #[error("storage unavailable at {path}: {reason}")]
    StorageUnavailable {
        /// Location that was requested.
        path: String,
        /// Underlying cause.
        reason: String,
    },

    /// Schema fix-up aborted; the store is left in its pre-migration state.
    #[error("schema migration failed: {0}")]
    MigrationFailed(String),

    /// A batch was rejected; nothing from it was committed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Any other database error (reads, schema inspection).
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Result alias used by the store.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// True for errors that must abort an ingestion run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::StorageUnavailable { .. } | StoreError::MigrationFailed(_)
        )
    }
}
