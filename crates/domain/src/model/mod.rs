//! Data structures shared by the backup and restore binaries.

mod outcome;
mod service;

use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use outcome::*;
pub use service::*;

/// Date layout used in snapshot keys.
pub const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors emitted when an environment label or a snapshot key is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotKeyError {
    #[error("environment must not be empty")]
    EmptyEnvironment,
    #[error("environment `{0}` must not contain `/`")]
    InvalidEnvironment(String),
    #[error("snapshot key `{0}` must look like `<environment>/<service>/<YYYY-MM-DD>`")]
    Layout(String),
    #[error("unknown service `{0}` in snapshot key")]
    UnknownService(String),
    #[error("invalid date `{0}` in snapshot key")]
    InvalidDate(String),
}

/// Cluster label that prefixes every snapshot key and tags every metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Environment(String);

impl Environment {
    pub fn parse(value: &str) -> Result<Self, SnapshotKeyError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SnapshotKeyError::EmptyEnvironment);
        }
        if trimmed.contains('/') {
            return Err(SnapshotKeyError::InvalidEnvironment(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Object-store key of one snapshot: `{environment}/{service}/{YYYY-MM-DD}`.
///
/// There is exactly one key per environment, service and day, so re-running
/// a backup on the same day overwrites the earlier snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    environment: Environment,
    service: TrackedService,
    date: NaiveDate,
}

impl SnapshotKey {
    pub fn new(environment: Environment, service: TrackedService, date: NaiveDate) -> Self {
        Self {
            environment,
            service,
            date,
        }
    }

    /// Key for the current UTC calendar day.
    pub fn for_today(environment: Environment, service: TrackedService) -> Self {
        Self::new(environment, service, Utc::now().date_naive())
    }

    pub fn parse(raw: &str) -> Result<Self, SnapshotKeyError> {
        let mut parts = raw.trim().split('/');
        let (Some(environment), Some(service), Some(date), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SnapshotKeyError::Layout(raw.to_string()));
        };

        let environment = Environment::parse(environment)?;
        let service = service
            .parse::<TrackedService>()
            .map_err(|_| SnapshotKeyError::UnknownService(service.to_string()))?;
        let date = NaiveDate::parse_from_str(date, SNAPSHOT_DATE_FORMAT)
            .map_err(|_| SnapshotKeyError::InvalidDate(date.to_string()))?;

        Ok(Self::new(environment, service, date))
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn service(&self) -> TrackedService {
        self.service
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.environment,
            self.service,
            self.date.format(SNAPSHOT_DATE_FORMAT)
        )
    }
}

/// Body stored when a service could not be fetched.
pub const PLACEHOLDER_BODY: &[u8] = b"null";

/// Raw bytes written under a [`SnapshotKey`].
///
/// The fetched body is kept byte for byte. A failed fetch is recorded as the
/// JSON `null` placeholder so the key still exists for that day.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    key: SnapshotKey,
    body: Vec<u8>,
}

impl Snapshot {
    pub fn capture(key: SnapshotKey, document: Option<Vec<u8>>) -> Self {
        let body = document.unwrap_or_else(|| PLACEHOLDER_BODY.to_vec());
        Self { key, body }
    }

    pub fn key(&self) -> &SnapshotKey {
        &self.key
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_placeholder(&self) -> bool {
        self.body == PLACEHOLDER_BODY
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Errors emitted when a restore payload entry cannot be submitted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigItemError {
    #[error("item is not a JSON object")]
    NotAnObject,
    #[error("item has no string `id` field")]
    MissingId,
}

/// One declared application or job inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigItem(Map<String, Value>);

impl ConfigItem {
    pub fn from_value(value: Value) -> Result<Self, ConfigItemError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            _ => Err(ConfigItemError::NotAnObject),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Returns the item id, which every submitted item must carry.
    pub fn require_id(&self) -> Result<&str, ConfigItemError> {
        self.id().ok_or(ConfigItemError::MissingId)
    }

    /// Removes `name`, keeping the remaining fields in their original order.
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env() -> Environment {
        Environment::parse("prod").unwrap()
    }

    #[test]
    fn snapshot_key_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let first = SnapshotKey::new(env(), TrackedService::Marathon, date);
        let second = SnapshotKey::new(env(), TrackedService::Marathon, date);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), "prod/marathon/2024-03-07");
        assert_eq!(
            SnapshotKey::new(env(), TrackedService::Metronome, date).to_string(),
            "prod/metronome/2024-03-07"
        );
    }

    #[test]
    fn same_day_keys_collide() {
        let a = SnapshotKey::for_today(env(), TrackedService::Metronome);
        let b = SnapshotKey::for_today(env(), TrackedService::Metronome);
        // Only differs if the test straddles UTC midnight.
        if a.date() == b.date() {
            assert_eq!(a.to_string(), b.to_string());
        }
    }

    #[test]
    fn snapshot_key_parses_its_own_output() {
        let key = SnapshotKey::parse("staging/metronome/2023-12-31").expect("key parses");
        assert_eq!(key.environment().as_str(), "staging");
        assert_eq!(key.service(), TrackedService::Metronome);
        assert_eq!(key.to_string(), "staging/metronome/2023-12-31");
    }

    #[test]
    fn snapshot_key_rejects_bad_layouts() {
        assert!(matches!(
            SnapshotKey::parse("prod/marathon"),
            Err(SnapshotKeyError::Layout(_))
        ));
        assert!(matches!(
            SnapshotKey::parse("prod/marathon/2024-01-01/extra"),
            Err(SnapshotKeyError::Layout(_))
        ));
        assert_eq!(
            SnapshotKey::parse("prod/chronos/2024-01-01").unwrap_err(),
            SnapshotKeyError::UnknownService("chronos".into())
        );
        assert_eq!(
            SnapshotKey::parse("prod/marathon/yesterday").unwrap_err(),
            SnapshotKeyError::InvalidDate("yesterday".into())
        );
    }

    #[test]
    fn environment_rejects_empty_and_slashes() {
        assert_eq!(
            Environment::parse("  ").unwrap_err(),
            SnapshotKeyError::EmptyEnvironment
        );
        assert!(matches!(
            Environment::parse("a/b"),
            Err(SnapshotKeyError::InvalidEnvironment(_))
        ));
        assert_eq!(Environment::parse(" qa ").unwrap().as_str(), "qa");
    }

    #[test]
    fn failed_fetch_is_captured_as_null() {
        let key = SnapshotKey::for_today(env(), TrackedService::Marathon);
        let snapshot = Snapshot::capture(key, None);
        assert!(snapshot.is_placeholder());
        assert_eq!(snapshot.body(), b"null");
    }

    #[test]
    fn captured_document_keeps_upstream_bytes() {
        let key = SnapshotKey::for_today(env(), TrackedService::Marathon);
        let raw = br#"{"apps":[{"id":"/a","z":1,"cpus":0.10,"big":123456789012345678901234}]}"#;
        let snapshot = Snapshot::capture(key, Some(raw.to_vec()));
        assert!(!snapshot.is_placeholder());
        assert_eq!(snapshot.body(), raw);
    }

    #[test]
    fn config_item_requires_object_and_id() {
        assert_eq!(
            ConfigItem::from_value(json!("x")).unwrap_err(),
            ConfigItemError::NotAnObject
        );
        let item = ConfigItem::from_value(json!({"cmd": "true"})).unwrap();
        assert_eq!(item.require_id().unwrap_err(), ConfigItemError::MissingId);
        let numeric = ConfigItem::from_value(json!({"id": 7})).unwrap();
        assert_eq!(numeric.id(), None);
        let item = ConfigItem::from_value(json!({"id": "/a"})).unwrap();
        assert_eq!(item.require_id().unwrap(), "/a");
    }
}
