/// Errors raised by the repository façade (C4) and checkpoint store (C5).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {message}")]
    Sqlite { message: String },

    #[error("migration v{version:03} failed: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("page not found: {page_id}")]
    PageNotFound { page_id: i64 },

    #[error("checkpoint io error: {0}")]
    CheckpointIo(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Sqlite {
            message: e.to_string(),
        }
    }
}

pub fn sqe(e: impl std::fmt::Display) -> StorageError {
    StorageError::Sqlite {
        message: e.to_string(),
    }
}
