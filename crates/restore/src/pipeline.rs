use std::sync::Arc;

use dcos_backup_domain::{
    config::{ConfigError, RestoreConfig, RestoreSource},
    model::{
        ConfigItem, RestoreOutcome, RestoreReport, RestoreStatus, SnapshotShapeError,
        TrackedService,
    },
    services::telemetry::TelemetryError,
    storage::StorageError,
};
use metrics::counter;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    source::{load_document, LoadError},
    submit::{HttpItemSubmitter, ItemSubmitter},
};

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to load snapshot: {0}")]
    Load(#[from] LoadError),
    #[error("failed to read stored snapshot: {0}")]
    StoreRead(#[from] StorageError),
    #[error("snapshot has an unexpected layout: {0}")]
    Shape(#[from] SnapshotShapeError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("http client error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for RestoreError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}

/// Replays a snapshot into one service, one item at a time.
///
/// Loading and unwrapping the snapshot are all-or-nothing. Past that point
/// every item stands alone: a rejected or malformed item is recorded and the
/// remaining items are still submitted. Nothing is rolled back.
pub struct RestoreOrchestrator {
    service: TrackedService,
    submitter: Arc<dyn ItemSubmitter>,
}

impl RestoreOrchestrator {
    pub fn new(service: TrackedService, submitter: Arc<dyn ItemSubmitter>) -> Self {
        Self { service, submitter }
    }

    pub async fn restore(&self, source: &RestoreSource) -> Result<RestoreReport, RestoreError> {
        let document = load_document(source).await?;
        self.restore_document(document).await
    }

    pub async fn restore_document(&self, document: Value) -> Result<RestoreReport, RestoreError> {
        let items = self.service.unwrap_items(document)?;
        info!(service = %self.service, items = items.len(), "restoring snapshot");

        let mut report = RestoreReport::new(self.service);
        for (index, raw) in items.into_iter().enumerate() {
            let outcome = self.restore_item(index, raw).await;
            let result = if outcome.is_success() { "ok" } else { "error" };
            counter!("restore_items_total", "service" => self.service.name(), "result" => result)
                .increment(1);
            report.outcomes.push(outcome);
        }

        if report.is_clean() {
            info!(
                service = %self.service,
                submitted = report.submitted(),
                "restore finished"
            );
        } else {
            warn!(
                service = %self.service,
                submitted = report.submitted(),
                failed = report.failed(),
                "restore finished with failures"
            );
        }
        Ok(report)
    }

    async fn restore_item(&self, index: usize, raw: Value) -> RestoreOutcome {
        let mut item = match ConfigItem::from_value(raw) {
            Ok(item) => item,
            Err(err) => {
                warn!(index, error = %err, "skipping item");
                return RestoreOutcome {
                    index,
                    id: None,
                    status: RestoreStatus::Invalid {
                        reason: err.to_string(),
                    },
                };
            }
        };

        let id = match item.require_id() {
            Ok(id) => id.to_string(),
            Err(err) => {
                warn!(index, error = %err, "skipping item");
                return RestoreOutcome {
                    index,
                    id: None,
                    status: RestoreStatus::Invalid {
                        reason: err.to_string(),
                    },
                };
            }
        };

        info!(id, "restoring");
        self.service.prepare_for_restore(&mut item);

        let status = match self.submitter.submit(&item).await {
            Ok(response) if response.is_success() => {
                info!(id, status = response.status, body = %response.body, "item submitted");
                RestoreStatus::Submitted {
                    status: response.status,
                }
            }
            Ok(response) => {
                warn!(id, status = response.status, body = %response.body, "item rejected");
                RestoreStatus::Rejected {
                    status: response.status,
                    body: response.body,
                }
            }
            Err(err) => {
                warn!(id, error = %err, "item submission failed");
                RestoreStatus::Transport {
                    reason: err.to_string(),
                }
            }
        };

        RestoreOutcome {
            index,
            id: Some(id),
            status,
        }
    }
}

/// Restores the configured snapshot into the configured target.
pub async fn run_restore(
    config: &RestoreConfig,
    client: reqwest::Client,
) -> Result<RestoreReport, RestoreError> {
    let submitter = HttpItemSubmitter::new(client, config.submission_url());
    info!(service = %config.service(), target = submitter.url(), "starting restore");
    RestoreOrchestrator::new(config.service(), Arc::new(submitter))
        .restore(config.source())
        .await
}
