use std::path::PathBuf;

use clap::Parser;
use dcos_backup_domain::config::{
    BackupConfig, BucketSettings, ConfigError, FetchFailurePolicy, StoreTarget,
    DEFAULT_MARATHON_URL, DEFAULT_METRONOME_URL,
};
use dcos_backup_domain::services::signal::{DEFAULT_ALARM_PREFIX, DEFAULT_METRIC_NAMESPACE};

/// Backup DC/OS marathon apps and metronome jobs.
///
/// Runs one backup cycle and exits, or, with `--scheduled-hour`, runs daily
/// at that hour (UTC) until interrupted.
#[derive(Debug, Parser)]
#[command(name = "dcos-backup", author, version, about, long_about = None)]
pub struct BackupArgs {
    /// Marathon API base URL.
    #[arg(long, alias = "marathonUrl", env = "MARATHON_URL", default_value = DEFAULT_MARATHON_URL)]
    pub marathon_url: String,

    /// Metronome API base URL.
    #[arg(long, alias = "metronomeUrl", env = "METRONOME_URL", default_value = DEFAULT_METRONOME_URL)]
    pub metronome_url: String,

    /// Environment label prefixing snapshot keys and tagging metrics.
    #[arg(long, env = "BKP_ENVIRONMENT", default_value = "test")]
    pub environment: String,

    /// Destination bucket.
    #[arg(long, env = "AWS_BUCKET", default_value = "test")]
    pub bucket: String,

    /// AWS region for the bucket and CloudWatch; defaults to the provider
    /// chain.
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint.
    #[arg(long, env = "S3_ENDPOINT_URL")]
    pub s3_endpoint_url: Option<String>,

    /// Use path-style bucket addressing.
    #[arg(long)]
    pub s3_force_path_style: bool,

    /// Write snapshots to this local directory instead of the bucket.
    #[arg(long, env = "BKP_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// CloudWatch namespace of the success metrics.
    #[arg(long, alias = "metricNameSpace", env = "AWS_METRIC_NAMESPACE", default_value = DEFAULT_METRIC_NAMESPACE)]
    pub metric_namespace: String,

    /// SNS topic notified by the missing-backup alarms; alarms are only
    /// provisioned when set.
    #[arg(long, alias = "topicAlarm", env = "AWS_ALARM_TOPIC")]
    pub alarm_topic: Option<String>,

    /// Prefix of the alarm names.
    #[arg(long, env = "AWS_ALARM_PREFIX", default_value = DEFAULT_ALARM_PREFIX)]
    pub alarm_prefix: String,

    /// Hour of the day (0-23, UTC) for the recurring backup.
    #[arg(long, alias = "scheduledBkpHour", env = "SCHEDULED_BKP_HOUR")]
    pub scheduled_hour: Option<String>,

    /// What to do with a service whose fetch failed: `placeholder` or `skip`.
    #[arg(long, env = "BKP_ON_FETCH_FAILURE", default_value = "placeholder")]
    pub on_fetch_failure: FetchFailurePolicy,
}

impl BackupArgs {
    pub fn store_target(&self) -> Result<StoreTarget, ConfigError> {
        if let Some(dir) = &self.output_dir {
            return Ok(StoreTarget::Directory(dir.clone()));
        }
        let mut settings = BucketSettings::new(&self.bucket)?;
        settings.region = self.region.clone();
        settings.endpoint_url = self.s3_endpoint_url.clone();
        settings.force_path_style = self.s3_force_path_style;
        Ok(StoreTarget::Bucket(settings))
    }

    pub fn into_config(self) -> Result<BackupConfig, ConfigError> {
        let store = self.store_target()?;
        Ok(BackupConfig::new(
            &self.environment,
            store,
            &self.marathon_url,
            &self.metronome_url,
        )?
        .with_metric_namespace(&self.metric_namespace)?
        .with_alarm_topic(self.alarm_topic.as_deref())
        .with_alarm_prefix(&self.alarm_prefix)
        .with_scheduled_hour(self.scheduled_hour.as_deref())?
        .with_fetch_failure_policy(self.on_fetch_failure)
        .with_aws_region(self.region.as_deref()))
    }
}
