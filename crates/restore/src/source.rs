use std::path::{Path, PathBuf};

use dcos_backup_domain::config::RestoreSource;
use dcos_backup_domain::model::SnapshotKey;
use dcos_backup_domain::storage::SnapshotStore;
use dcos_backup_storage::open_store;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::pipeline::RestoreError;

/// A restore file that is missing or is not JSON.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{origin}` is not valid JSON: {reason}")]
    InvalidJson { origin: String, reason: String },
}

pub async fn load_from_file(path: &Path) -> Result<Value, LoadError> {
    info!(path = %path.display(), "loading file");
    let body = tokio::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&path.display().to_string(), &body)
}

pub async fn load_from_store(
    store: &dyn SnapshotStore,
    key: &SnapshotKey,
) -> Result<Value, RestoreError> {
    info!(key = %key, "loading stored snapshot");
    let body = store.get(key).await?;
    Ok(parse_document(&key.to_string(), &body)?)
}

/// Loads the snapshot document named by the restore configuration.
pub async fn load_document(source: &RestoreSource) -> Result<Value, RestoreError> {
    match source {
        RestoreSource::File(path) => Ok(load_from_file(path).await?),
        RestoreSource::Stored { store, key } => {
            let store = open_store(store).await?;
            load_from_store(store.as_ref(), key).await
        }
    }
}

fn parse_document(origin: &str, body: &[u8]) -> Result<Value, LoadError> {
    serde_json::from_slice(body).map_err(|err| LoadError::InvalidJson {
        origin: origin.to_string(),
        reason: err.to_string(),
    })
}
