//! Snapshot stores that satisfy the domain `SnapshotStore` trait: an S3
//! bucket for production runs and a local directory that mirrors the bucket
//! layout for development and offline restores.

mod builder;
mod fs_store;
mod s3_store;

use std::sync::Arc;

use dcos_backup_domain::config::StoreTarget;
use dcos_backup_domain::storage::{SnapshotStore, StorageResult};

pub use builder::S3StoreBuilder;
pub use fs_store::FsSnapshotStore;
pub use s3_store::S3SnapshotStore;

/// Opens the store described by the configuration.
pub async fn open_store(target: &StoreTarget) -> StorageResult<Arc<dyn SnapshotStore>> {
    let store: Arc<dyn SnapshotStore> = match target {
        StoreTarget::Bucket(settings) => Arc::new(S3SnapshotStore::connect(settings).await?),
        StoreTarget::Directory(root) => Arc::new(FsSnapshotStore::new(root.clone())),
    };
    Ok(store)
}
