//! Validated configuration shared by the backup and restore binaries.
//!
//! The binaries parse flags and environment variables with `clap` and hand
//! the raw values to the constructors here, which own every validation rule.

use std::{env, path::PathBuf};

use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::model::{Environment, SnapshotKey, SnapshotKeyError, TrackedService};
use crate::services::signal::{SignalSettings, DEFAULT_ALARM_PREFIX, DEFAULT_METRIC_NAMESPACE};

pub const DEFAULT_MARATHON_URL: &str = "http://master.mesos:8080";
pub const DEFAULT_METRONOME_URL: &str = "http://master.mesos:9000";
pub const DEFAULT_RESTORE_URL: &str = "http://localhost:8080";
pub const DEFAULT_RESTORE_FILE: &str = "backup.json";

/// What a backup cycle does for a service whose fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Store the `null` placeholder under the day's key and still signal.
    #[default]
    Placeholder,
    /// Store and signal nothing so the missing-backup alarm fires.
    Skip,
}

/// Object-store connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSettings {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl BucketSettings {
    pub fn new(bucket: &str) -> Result<Self, ConfigError> {
        let bucket = bucket.trim();
        if bucket.is_empty() {
            return Err(ConfigError::MissingValue { key: "bucket" });
        }
        Ok(Self {
            bucket: bucket.to_string(),
            region: None,
            endpoint_url: None,
            force_path_style: false,
        })
    }
}

/// Where snapshots are written to and read back from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    Bucket(BucketSettings),
    /// Local directory using the same `{env}/{service}/{date}` layout.
    Directory(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    environment: Environment,
    store: StoreTarget,
    marathon_url: String,
    metronome_url: String,
    metric_namespace: String,
    alarm_topic: Option<String>,
    alarm_prefix: String,
    scheduled_hour: Option<u8>,
    fetch_failure_policy: FetchFailurePolicy,
    aws_region: Option<String>,
}

impl BackupConfig {
    pub fn new(
        environment: &str,
        store: StoreTarget,
        marathon_url: &str,
        metronome_url: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::parse(environment)?,
            store,
            marathon_url: normalize_url("marathon_url", marathon_url)?,
            metronome_url: normalize_url("metronome_url", metronome_url)?,
            metric_namespace: DEFAULT_METRIC_NAMESPACE.to_string(),
            alarm_topic: None,
            alarm_prefix: DEFAULT_ALARM_PREFIX.to_string(),
            scheduled_hour: None,
            fetch_failure_policy: FetchFailurePolicy::default(),
            aws_region: None,
        })
    }

    pub fn with_metric_namespace(mut self, namespace: &str) -> Result<Self, ConfigError> {
        let namespace = namespace.trim();
        if namespace.is_empty() {
            return Err(ConfigError::MissingValue {
                key: "metric_namespace",
            });
        }
        self.metric_namespace = namespace.to_string();
        Ok(self)
    }

    pub fn with_alarm_topic(mut self, topic: Option<&str>) -> Self {
        self.alarm_topic = non_empty(topic);
        self
    }

    pub fn with_alarm_prefix(mut self, prefix: &str) -> Self {
        if let Some(prefix) = non_empty(Some(prefix)) {
            self.alarm_prefix = prefix;
        }
        self
    }

    pub fn with_scheduled_hour(mut self, hour: Option<&str>) -> Result<Self, ConfigError> {
        self.scheduled_hour = match non_empty(hour) {
            Some(raw) => Some(parse_scheduled_hour(&raw)?),
            None => None,
        };
        Ok(self)
    }

    pub fn with_fetch_failure_policy(mut self, policy: FetchFailurePolicy) -> Self {
        self.fetch_failure_policy = policy;
        self
    }

    /// Region for every AWS client; `None` defers to the provider chain.
    pub fn with_aws_region(mut self, region: Option<&str>) -> Self {
        self.aws_region = non_empty(region);
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn store(&self) -> &StoreTarget {
        &self.store
    }

    /// Base URL of the given service's API.
    pub fn service_url(&self, service: TrackedService) -> &str {
        match service {
            TrackedService::Marathon => &self.marathon_url,
            TrackedService::Metronome => &self.metronome_url,
        }
    }

    pub fn metric_namespace(&self) -> &str {
        &self.metric_namespace
    }

    pub fn alarm_topic(&self) -> Option<&str> {
        self.alarm_topic.as_deref()
    }

    /// `None` means run a single cycle and exit.
    pub fn scheduled_hour(&self) -> Option<u8> {
        self.scheduled_hour
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.aws_region.as_deref()
    }

    pub fn fetch_failure_policy(&self) -> FetchFailurePolicy {
        self.fetch_failure_policy
    }

    pub fn signal_settings(&self) -> SignalSettings {
        SignalSettings::new(self.environment.clone(), self.metric_namespace.clone())
            .with_alarm_topic(self.alarm_topic.clone())
            .with_alarm_prefix(self.alarm_prefix.clone())
    }
}

/// Where a restore reads its snapshot from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreSource {
    File(PathBuf),
    Stored { store: StoreTarget, key: SnapshotKey },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreConfig {
    service: TrackedService,
    target_url: String,
    submission_path: String,
    source: RestoreSource,
}

impl RestoreConfig {
    pub fn new(
        service: TrackedService,
        target_url: &str,
        source: RestoreSource,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            service,
            target_url: normalize_url("url", target_url)?,
            submission_path: service.submission_path().to_string(),
            source,
        })
    }

    /// Replaces the service's default submission path.
    pub fn with_submission_path(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(path) = non_empty(path) {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidSubmissionPath(path));
            }
            self.submission_path = path;
        }
        Ok(self)
    }

    pub fn service(&self) -> TrackedService {
        self.service
    }

    pub fn source(&self) -> &RestoreSource {
        &self.source
    }

    pub fn submission_path(&self) -> &str {
        &self.submission_path
    }

    pub fn submission_url(&self) -> String {
        format!("{}{}", self.target_url, self.submission_path)
    }
}

/// Parses the daily trigger hour (0-23, UTC).
pub fn parse_scheduled_hour(raw: &str) -> Result<u8, ConfigError> {
    let trimmed = raw.trim();
    let hour: u8 = trimmed
        .parse()
        .map_err(|source| ConfigError::InvalidNumber {
            key: "scheduled_hour",
            source,
        })?;
    if hour > 23 {
        return Err(ConfigError::HourOutOfRange(hour));
    }
    Ok(hour)
}

fn normalize_url(key: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::MissingValue { key });
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl {
            key,
            value: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Loads `.env` into the process environment unless
/// `DCOS_BACKUP_SKIP_DOTENV` is set. A missing file is not an error.
pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("DCOS_BACKUP_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or option validation fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required value `{key}`")]
    MissingValue { key: &'static str },
    #[error("`{key}` must be an http(s) URL, got `{value}`")]
    InvalidUrl { key: &'static str, value: String },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("scheduled hour must be between 0 and 23, got {0}")]
    HourOutOfRange(u8),
    #[error("submission path `{0}` must start with `/`")]
    InvalidSubmissionPath(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotKeyError),
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir_store() -> StoreTarget {
        StoreTarget::Directory(PathBuf::from("/tmp/snapshots"))
    }

    #[test]
    fn backup_config_uses_defaults() {
        let config =
            BackupConfig::new("test", dir_store(), DEFAULT_MARATHON_URL, DEFAULT_METRONOME_URL)
                .expect("config builds");
        assert_eq!(config.environment().as_str(), "test");
        assert_eq!(config.metric_namespace(), "DCOSServices");
        assert_eq!(config.alarm_topic(), None);
        assert_eq!(config.scheduled_hour(), None);
        assert_eq!(config.fetch_failure_policy(), FetchFailurePolicy::Placeholder);
        assert_eq!(
            config.service_url(TrackedService::Metronome),
            "http://master.mesos:9000"
        );
    }

    #[test]
    fn urls_are_trimmed_and_validated() {
        let config = BackupConfig::new(
            "prod",
            dir_store(),
            " http://marathon.local:8080/ ",
            "https://metronome.local",
        )
        .unwrap();
        assert_eq!(
            config.service_url(TrackedService::Marathon),
            "http://marathon.local:8080"
        );

        let err = BackupConfig::new("prod", dir_store(), "marathon:8080", DEFAULT_METRONOME_URL)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                key: "marathon_url",
                ..
            }
        ));
    }

    #[test]
    fn scheduled_hour_is_bounded() {
        assert_eq!(parse_scheduled_hour("0").unwrap(), 0);
        assert_eq!(parse_scheduled_hour(" 23 ").unwrap(), 23);
        assert!(matches!(
            parse_scheduled_hour("24"),
            Err(ConfigError::HourOutOfRange(24))
        ));
        assert!(matches!(
            parse_scheduled_hour("noon"),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn blank_optional_values_are_treated_as_absent() {
        let config =
            BackupConfig::new("prod", dir_store(), DEFAULT_MARATHON_URL, DEFAULT_METRONOME_URL)
                .unwrap()
                .with_alarm_topic(Some("  "))
                .with_scheduled_hour(Some(""))
                .unwrap();
        assert_eq!(config.alarm_topic(), None);
        assert_eq!(config.scheduled_hour(), None);
    }

    #[test]
    fn signal_settings_carry_topic_and_namespace() {
        let settings =
            BackupConfig::new("prod", dir_store(), DEFAULT_MARATHON_URL, DEFAULT_METRONOME_URL)
                .unwrap()
                .with_metric_namespace("Backups")
                .unwrap()
                .with_alarm_topic(Some("arn:topic"))
                .with_alarm_prefix("OPS")
                .signal_settings();
        assert_eq!(settings.namespace, "Backups");
        assert_eq!(settings.alarm_topic.as_deref(), Some("arn:topic"));
        assert_eq!(settings.alarm_prefix, "OPS");
    }

    #[test]
    fn fetch_failure_policy_parses_lowercase() {
        assert_eq!(
            "skip".parse::<FetchFailurePolicy>().unwrap(),
            FetchFailurePolicy::Skip
        );
        assert_eq!(FetchFailurePolicy::Placeholder.to_string(), "placeholder");
    }

    #[test]
    fn restore_config_resolves_submission_url() {
        let config = RestoreConfig::new(
            TrackedService::Metronome,
            "http://metronome.local:9000/",
            RestoreSource::File(PathBuf::from(DEFAULT_RESTORE_FILE)),
        )
        .unwrap();
        assert_eq!(
            config.submission_url(),
            "http://metronome.local:9000/v0/scheduled-jobs"
        );

        let overridden = config.with_submission_path(Some("/v1/jobs")).unwrap();
        assert_eq!(
            overridden.submission_url(),
            "http://metronome.local:9000/v1/jobs"
        );
    }

    #[test]
    fn submission_path_must_be_absolute() {
        let config = RestoreConfig::new(
            TrackedService::Marathon,
            DEFAULT_RESTORE_URL,
            RestoreSource::File(PathBuf::from(DEFAULT_RESTORE_FILE)),
        )
        .unwrap();
        assert!(matches!(
            config.with_submission_path(Some("v2/apps")),
            Err(ConfigError::InvalidSubmissionPath(_))
        ));
    }

    #[test]
    fn bucket_name_is_required() {
        assert!(matches!(
            BucketSettings::new(" "),
            Err(ConfigError::MissingValue { key: "bucket" })
        ));
    }
}
