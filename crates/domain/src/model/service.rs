use serde_json::Value;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

use super::ConfigItem;

/// Field label used in errors about the document root itself.
const DOCUMENT_ROOT: &str = "document";

/// The orchestration services whose declared state is snapshotted.
///
/// Each variant carries its own listing path (used by backup), submission
/// path (used by restore), the rule for locating items inside a stored
/// document, and the sanitization applied before an item is resubmitted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum TrackedService {
    Marathon,
    Metronome,
}

impl TrackedService {
    /// Order in which a backup cycle visits the services.
    pub const BACKUP_ORDER: [TrackedService; 2] =
        [TrackedService::Metronome, TrackedService::Marathon];

    /// Lowercase service name, used in snapshot keys and metric labels.
    pub fn name(&self) -> &'static str {
        (*self).into()
    }

    /// Path queried to enumerate the currently declared items.
    pub fn listing_path(&self) -> &'static str {
        match self {
            TrackedService::Marathon => "/v2/apps",
            TrackedService::Metronome => "/v1/jobs",
        }
    }

    /// Path each item is POSTed to when replaying a snapshot.
    ///
    /// Metronome accepts creation requests on its scheduled-jobs endpoint,
    /// which is not the path its jobs are listed from.
    pub fn submission_path(&self) -> &'static str {
        match self {
            TrackedService::Marathon => "/v2/apps",
            TrackedService::Metronome => "/v0/scheduled-jobs",
        }
    }

    /// Locates the item list inside a stored document.
    pub fn unwrap_items(&self, document: Value) -> Result<Vec<Value>, SnapshotShapeError> {
        let items = match (self, document) {
            (TrackedService::Marathon, Value::Object(mut root)) => match root.remove("apps") {
                Some(Value::Array(apps)) => apps,
                Some(_) => return Err(SnapshotShapeError::NotAList { field: "apps" }),
                None => return Err(SnapshotShapeError::MissingField { field: "apps" }),
            },
            (TrackedService::Marathon, Value::Null) | (TrackedService::Metronome, Value::Null) => {
                return Err(SnapshotShapeError::Placeholder)
            }
            (TrackedService::Marathon, _) => {
                return Err(SnapshotShapeError::MissingField { field: "apps" })
            }
            (TrackedService::Metronome, Value::Array(jobs)) => jobs,
            (TrackedService::Metronome, _) => {
                return Err(SnapshotShapeError::NotAList { field: DOCUMENT_ROOT })
            }
        };
        Ok(items)
    }

    /// Restore-time sanitization applied to every item before submission.
    pub fn prepare_for_restore(&self, item: &mut ConfigItem) {
        match self {
            // marathon rejects `uris` on create.
            TrackedService::Marathon => {
                item.remove_field("uris");
            }
            TrackedService::Metronome => {}
        }
    }
}

/// Raised when a stored document does not have the layout its service uses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotShapeError {
    #[error("snapshot is missing the `{field}` field")]
    MissingField { field: &'static str },
    #[error("`{field}` is not a list")]
    NotAList { field: &'static str },
    #[error("snapshot is an empty placeholder written after a failed fetch")]
    Placeholder,
}
