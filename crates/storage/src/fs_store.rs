use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use dcos_backup_domain::model::{SnapshotKey, SNAPSHOT_DATE_FORMAT};
use dcos_backup_domain::storage::{SnapshotStore, StorageError, StorageResult};
use metrics::counter;
use tokio::fs;
use tracing::info;

/// Snapshot store rooted at a local directory, one file per key:
/// `<root>/<environment>/<service>/<YYYY-MM-DD>`.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    root: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &SnapshotKey) -> PathBuf {
        self.root
            .join(key.environment().as_str())
            .join(key.service().name())
            .join(key.date().format(SNAPSHOT_DATE_FORMAT).to_string())
    }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn put(&self, key: &SnapshotKey, body: Vec<u8>) -> StorageResult<()> {
        let path = self.path_for(key);
        let size = body.len();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| StorageError::write(key, err))?;
        }

        // Readers never observe a half-written snapshot.
        let staging = path.with_extension("partial");
        let written = async {
            fs::write(&staging, &body).await?;
            fs::rename(&staging, &path).await
        }
        .await;

        if let Err(err) = written {
            counter!("snapshot_store_writes_total", "backend" => "fs", "result" => "error")
                .increment(1);
            let _ = fs::remove_file(&staging).await;
            return Err(StorageError::write(key, err));
        }

        counter!("snapshot_store_writes_total", "backend" => "fs", "result" => "ok").increment(1);
        info!(path = %path.display(), bytes = size, "snapshot written");
        Ok(())
    }

    async fn get(&self, key: &SnapshotKey) -> StorageResult<Vec<u8>> {
        match fs::read(self.path_for(key)).await {
            Ok(body) => Ok(body),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StorageError::not_found(key)),
            Err(err) => Err(StorageError::read(key, err)),
        }
    }
}
