use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use dcos_backup_domain::config::BucketSettings;
use dcos_backup_domain::model::SnapshotKey;
use dcos_backup_domain::storage::{SnapshotStore, StorageError, StorageResult};
use metrics::counter;
use tracing::info;

use crate::builder::S3StoreBuilder;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Snapshot store backed by one S3 bucket. Keys are used verbatim as object
/// keys, so a same-day rerun replaces the earlier object.
#[derive(Clone)]
pub struct S3SnapshotStore {
    client: Client,
    bucket: String,
}

impl S3SnapshotStore {
    pub async fn connect(settings: &BucketSettings) -> StorageResult<Self> {
        Self::builder().settings(settings).build().await
    }

    pub fn builder() -> S3StoreBuilder {
        S3StoreBuilder::new()
    }

    pub(crate) fn from_client(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl SnapshotStore for S3SnapshotStore {
    async fn put(&self, key: &SnapshotKey, body: Vec<u8>) -> StorageResult<()> {
        let object_key = key.to_string();
        let size = body.len();

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .content_type(JSON_CONTENT_TYPE)
            .body(ByteStream::from(body))
            .send()
            .await;

        if let Err(err) = result {
            counter!("snapshot_store_writes_total", "backend" => "s3", "result" => "error")
                .increment(1);
            return Err(StorageError::write(key, DisplayErrorContext(&err)));
        }

        counter!("snapshot_store_writes_total", "backend" => "s3", "result" => "ok").increment(1);
        info!(bucket = %self.bucket, key = %object_key, bytes = size, "snapshot uploaded");
        Ok(())
    }

    async fn get(&self, key: &SnapshotKey) -> StorageResult<Vec<u8>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.to_string())
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|service_err| service_err.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    return Err(StorageError::not_found(key));
                }
                return Err(StorageError::read(key, DisplayErrorContext(&err)));
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|err| StorageError::read(key, err))?
            .into_bytes();
        Ok(bytes.to_vec())
    }
}
