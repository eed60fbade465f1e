use async_trait::async_trait;
use thiserror::Error;

use crate::model::SnapshotKey;

/// Common result alias for snapshot store operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("failed to write snapshot `{key}`: {reason}")]
    Write { key: String, reason: String },
    #[error("snapshot `{key}` not found")]
    NotFound { key: String },
    #[error("failed to read snapshot `{key}`: {reason}")]
    Read { key: String, reason: String },
    #[error("storage configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub fn write(key: &SnapshotKey, err: impl std::fmt::Display) -> Self {
        Self::Write {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn read(key: &SnapshotKey, err: impl std::fmt::Display) -> Self {
        Self::Read {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn not_found(key: &SnapshotKey) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Durable home of dated snapshots. Writes to an existing key overwrite it.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn put(&self, key: &SnapshotKey, body: Vec<u8>) -> StorageResult<()>;
    async fn get(&self, key: &SnapshotKey) -> StorageResult<Vec<u8>>;
}
