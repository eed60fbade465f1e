use std::path::PathBuf;

use clap::Parser;
use dcos_backup_domain::config::{
    BucketSettings, ConfigError, RestoreConfig, RestoreSource, StoreTarget, DEFAULT_RESTORE_FILE,
    DEFAULT_RESTORE_URL,
};
use dcos_backup_domain::model::{SnapshotKey, TrackedService};

/// Restore DC/OS marathon apps or metronome jobs from a snapshot.
///
/// Reads the snapshot from a local file by default, or from the bucket (or a
/// local snapshot directory) when `--snapshot-key` is given.
#[derive(Debug, Parser)]
#[command(name = "dcos-restore", author, version, about, long_about = None)]
pub struct RestoreArgs {
    /// Service the snapshot belongs to: `marathon` or `metronome`.
    #[arg(value_parser = parse_service)]
    pub service: TrackedService,

    /// Base URL of the service receiving the items.
    #[arg(long, env = "RESTORE_URL", default_value = DEFAULT_RESTORE_URL)]
    pub url: String,

    /// Snapshot file to replay.
    #[arg(long, alias = "filePath", default_value = DEFAULT_RESTORE_FILE)]
    pub file_path: PathBuf,

    /// Stored snapshot to replay, as `environment/service/YYYY-MM-DD`.
    #[arg(long)]
    pub snapshot_key: Option<String>,

    /// Bucket holding `--snapshot-key`.
    #[arg(long, env = "AWS_BUCKET", default_value = "test")]
    pub bucket: String,

    /// Bucket region; defaults to the AWS provider chain.
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint.
    #[arg(long, env = "S3_ENDPOINT_URL")]
    pub s3_endpoint_url: Option<String>,

    /// Use path-style bucket addressing.
    #[arg(long)]
    pub s3_force_path_style: bool,

    /// Read `--snapshot-key` from this local snapshot directory instead of
    /// the bucket.
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Overrides the service's submission path, e.g. `/v1/jobs`.
    #[arg(long)]
    pub submission_path: Option<String>,
}

fn parse_service(raw: &str) -> Result<TrackedService, String> {
    raw.trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| format!("unknown service `{raw}`, expected `marathon` or `metronome`"))
}

impl RestoreArgs {
    fn store_target(&self) -> Result<StoreTarget, ConfigError> {
        if let Some(dir) = &self.input_dir {
            return Ok(StoreTarget::Directory(dir.clone()));
        }
        let mut settings = BucketSettings::new(&self.bucket)?;
        settings.region = self.region.clone();
        settings.endpoint_url = self.s3_endpoint_url.clone();
        settings.force_path_style = self.s3_force_path_style;
        Ok(StoreTarget::Bucket(settings))
    }

    pub fn source(&self) -> Result<RestoreSource, ConfigError> {
        match &self.snapshot_key {
            Some(raw) => Ok(RestoreSource::Stored {
                store: self.store_target()?,
                key: SnapshotKey::parse(raw)?,
            }),
            None => Ok(RestoreSource::File(self.file_path.clone())),
        }
    }

    pub fn into_config(self) -> Result<RestoreConfig, ConfigError> {
        let source = self.source()?;
        RestoreConfig::new(self.service, &self.url, source)?
            .with_submission_path(self.submission_path.as_deref())
    }
}
