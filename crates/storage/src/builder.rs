use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use dcos_backup_domain::config::BucketSettings;
use dcos_backup_domain::storage::{StorageError, StorageResult};

use crate::S3SnapshotStore;

#[derive(Default)]
pub struct S3StoreBuilder {
    bucket: Option<String>,
    region: Option<String>,
    endpoint_url: Option<String>,
    force_path_style: bool,
}

impl S3StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(self, settings: &BucketSettings) -> Self {
        let mut builder = self.bucket(settings.bucket.clone());
        builder.region = settings.region.clone();
        builder.endpoint_url = settings.endpoint_url.clone();
        builder.force_path_style = settings.force_path_style;
        builder
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Points the client at an S3-compatible endpoint such as MinIO.
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    pub fn force_path_style(mut self, enabled: bool) -> Self {
        self.force_path_style = enabled;
        self
    }

    /// Credentials and, unless overridden, the region come from the default
    /// AWS provider chain.
    pub async fn build(self) -> StorageResult<S3SnapshotStore> {
        let bucket = self
            .bucket
            .filter(|bucket| !bucket.trim().is_empty())
            .ok_or_else(|| StorageError::Config("missing bucket name".into()))?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = self.region {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint) = self.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&shared);
        if self.force_path_style {
            s3_config = s3_config.force_path_style(true);
        }

        Ok(S3SnapshotStore::from_client(
            Client::from_conf(s3_config.build()),
            bucket,
        ))
    }
}
