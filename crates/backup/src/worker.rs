use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use dcos_backup_domain::{
    config::{BackupConfig, ConfigError, FetchFailurePolicy},
    model::{
        BackupOutcome, BackupReport, BackupStatus, Environment, Snapshot, SnapshotKey,
        TrackedService,
    },
    services::{signal::HealthSignal, telemetry::TelemetryError},
    storage::{SnapshotStore, StorageError},
};
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    fetcher::ConfigFetcher,
    schedule::{CronScheduler, DailySchedule, Job, ScheduleError},
};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("http client error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for BackupError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}

/// Drives fetch → store → signal for every tracked service.
pub struct BackupOrchestrator {
    environment: Environment,
    fetcher: Arc<dyn ConfigFetcher>,
    store: Arc<dyn SnapshotStore>,
    signal: Arc<dyn HealthSignal>,
    policy: FetchFailurePolicy,
}

impl BackupOrchestrator {
    pub fn new(
        environment: Environment,
        fetcher: Arc<dyn ConfigFetcher>,
        store: Arc<dyn SnapshotStore>,
        signal: Arc<dyn HealthSignal>,
    ) -> Self {
        Self {
            environment,
            fetcher,
            store,
            signal,
            policy: FetchFailurePolicy::default(),
        }
    }

    pub fn with_fetch_failure_policy(mut self, policy: FetchFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Provisions the missing-backup alarm for every service. Failures are
    /// logged; monitoring problems never block backups.
    pub async fn ensure_alarms(&self) -> usize {
        let mut provisioned = 0;
        for service in TrackedService::BACKUP_ORDER {
            match self.signal.ensure_alarm(service).await {
                Ok(()) => provisioned += 1,
                Err(err) => error!(%service, error = %err, "failed to provision alarm"),
            }
        }
        provisioned
    }

    /// Runs one backup cycle. A store failure aborts the cycle immediately;
    /// fetch and signal failures only degrade the affected service.
    pub async fn run_cycle(&self) -> Result<BackupReport, BackupError> {
        let mut report = BackupReport::default();
        for service in TrackedService::BACKUP_ORDER {
            match self.backup_service(service).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(err) => {
                    counter!("backup_cycles_total", "result" => "error").increment(1);
                    error!(%service, error = %err, "backup cycle aborted");
                    return Err(err);
                }
            }
        }

        counter!("backup_cycles_total", "result" => "ok").increment(1);
        info!(
            environment = %self.environment,
            degraded = report.degraded(),
            "backup cycle finished"
        );
        Ok(report)
    }

    async fn backup_service(&self, service: TrackedService) -> Result<BackupOutcome, BackupError> {
        let key = SnapshotKey::for_today(self.environment.clone(), service);

        let (document, failure) = match self.fetcher.fetch(service).await {
            Ok(document) => (Some(document), None),
            Err(err) => {
                warn!(%service, error = %err, policy = %self.policy, "fetch failed");
                (None, Some(err.to_string()))
            }
        };

        if let (Some(reason), FetchFailurePolicy::Skip) = (&failure, self.policy) {
            counter!("backup_services_total", "service" => service.name(), "result" => "skipped")
                .increment(1);
            return Ok(BackupOutcome {
                service,
                key,
                status: BackupStatus::Skipped {
                    reason: reason.clone(),
                },
                signalled: false,
            });
        }

        let snapshot = Snapshot::capture(key.clone(), document);
        let bytes = snapshot.body().len();

        info!(key = %key, bytes, "saving snapshot");
        self.store.put(&key, snapshot.into_body()).await?;
        histogram!("backup_snapshot_bytes", "service" => service.name()).record(bytes as f64);

        let signalled = match self.signal.report_success(service).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%service, error = %err, "failed to report backup success");
                false
            }
        };

        let status = match failure {
            Some(reason) => BackupStatus::Placeholder { reason },
            None => BackupStatus::Stored { bytes },
        };
        let label = if matches!(status, BackupStatus::Stored { .. }) {
            "stored"
        } else {
            "placeholder"
        };
        counter!("backup_services_total", "service" => service.name(), "result" => label)
            .increment(1);

        Ok(BackupOutcome {
            service,
            key,
            status,
            signalled,
        })
    }
}

#[async_trait]
impl Job for BackupOrchestrator {
    type Error = BackupError;

    fn name(&self) -> &str {
        "dcos-backup"
    }

    async fn run(&self) -> Result<(), BackupError> {
        self.run_cycle().await.map(|_| ())
    }
}

/// Provisions alarms when a topic is configured, then either runs a single
/// cycle or blocks on the daily schedule until `shutdown` resolves.
pub async fn run_backup<F>(
    config: &BackupConfig,
    orchestrator: BackupOrchestrator,
    shutdown: F,
) -> Result<(), BackupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if config.alarm_topic().is_some() {
        orchestrator.ensure_alarms().await;
    }

    let Some(hour) = config.scheduled_hour() else {
        orchestrator.run_cycle().await?;
        return Ok(());
    };

    let scheduler = CronScheduler::new(DailySchedule::at_hour(hour)?);
    let handle = scheduler.handle();
    tokio::spawn(async move {
        shutdown.await;
        info!("shutdown requested");
        handle.stop();
    });
    scheduler.start(&orchestrator).await?;
    Ok(())
}
