use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Environment, TrackedService};

/// Dimension attached to every backup datapoint and alarm.
pub const BACKUP_DIMENSION: &str = "EnvironmentBackup";
/// Rolling window the missing-backup alarm evaluates, in seconds.
pub const BACKUP_ALARM_PERIOD_SECS: i32 = 86_400;
pub const DEFAULT_METRIC_NAMESPACE: &str = "DCOSServices";
/// Prefix of the alarm names already provisioned by existing deployments.
pub const DEFAULT_ALARM_PREFIX: &str = "_QuintoAndar_Monitor_DCOS_BACKUP";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("failed to publish metric for {service}: {reason}")]
    Publish {
        service: TrackedService,
        reason: String,
    },
    #[error("failed to provision alarm `{alarm}`: {reason}")]
    Alarm { alarm: String, reason: String },
    #[error("no alarm topic configured")]
    NoTopic,
}

/// Where success datapoints go and who is told when they stop arriving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSettings {
    pub environment: Environment,
    pub namespace: String,
    pub alarm_topic: Option<String>,
    pub alarm_prefix: String,
}

impl SignalSettings {
    pub fn new(environment: Environment, namespace: impl Into<String>) -> Self {
        Self {
            environment,
            namespace: namespace.into(),
            alarm_topic: None,
            alarm_prefix: DEFAULT_ALARM_PREFIX.to_string(),
        }
    }

    pub fn with_alarm_topic(mut self, topic: Option<String>) -> Self {
        self.alarm_topic = topic;
        self
    }

    pub fn with_alarm_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.alarm_prefix = prefix.into();
        self
    }
}

/// Declarative description of the missing-backup alarm for one service.
///
/// The alarm compares the daily average of the success metric against 1 and
/// treats missing data as breaching, so a day without any backup fires it.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSpec {
    pub name: String,
    pub namespace: String,
    pub metric_name: String,
    pub environment: String,
    pub topic: String,
    pub threshold: f64,
    pub period_secs: i32,
    pub evaluation_periods: i32,
}

impl AlarmSpec {
    pub fn missing_backup(
        settings: &SignalSettings,
        service: TrackedService,
    ) -> Result<Self, SignalError> {
        let topic = settings.alarm_topic.clone().ok_or(SignalError::NoTopic)?;
        Ok(Self {
            name: alarm_name(&settings.alarm_prefix, &settings.environment, service),
            namespace: settings.namespace.clone(),
            metric_name: service.name().to_string(),
            environment: settings.environment.to_string(),
            topic,
            threshold: 1.0,
            period_secs: BACKUP_ALARM_PERIOD_SECS,
            evaluation_periods: 1,
        })
    }

    pub fn description(&self) -> String {
        format!(
            "Alarm when {} LessThanThreshold {}",
            self.metric_name, self.threshold
        )
    }
}

/// Alarm names are derived only from the prefix, environment and service so
/// re-provisioning targets the same resource.
pub fn alarm_name(prefix: &str, environment: &Environment, service: TrackedService) -> String {
    format!("{prefix}_{environment}_{service}")
}

/// Monitoring collaborator told about completed backups.
#[async_trait]
pub trait HealthSignal: Send + Sync {
    /// Emits one count=1 datapoint for the service.
    async fn report_success(&self, service: TrackedService) -> Result<(), SignalError>;

    /// Creates or updates the missing-backup alarm for the service.
    async fn ensure_alarm(&self, service: TrackedService) -> Result<(), SignalError>;
}

/// Keeps datapoints and alarms in memory, keyed the same way the real
/// monitoring backend keys them.
pub struct InMemoryHealthSignal {
    settings: SignalSettings,
    datapoints: Mutex<Vec<TrackedService>>,
    alarms: Mutex<HashMap<String, AlarmSpec>>,
    failing: AtomicBool,
}

impl InMemoryHealthSignal {
    pub fn new(settings: SignalSettings) -> Self {
        Self {
            settings,
            datapoints: Mutex::new(Vec::new()),
            alarms: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent publish fail, mimicking an unreachable backend.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn datapoints(&self) -> Vec<TrackedService> {
        self.datapoints.lock().expect("mutex poisoned").clone()
    }

    pub fn alarms(&self) -> Vec<AlarmSpec> {
        let guard = self.alarms.lock().expect("mutex poisoned");
        let mut alarms: Vec<_> = guard.values().cloned().collect();
        alarms.sort_by(|a, b| a.name.cmp(&b.name));
        alarms
    }
}

#[async_trait]
impl HealthSignal for InMemoryHealthSignal {
    async fn report_success(&self, service: TrackedService) -> Result<(), SignalError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SignalError::Publish {
                service,
                reason: "backend unavailable".into(),
            });
        }
        self.datapoints
            .lock()
            .expect("mutex poisoned")
            .push(service);
        Ok(())
    }

    async fn ensure_alarm(&self, service: TrackedService) -> Result<(), SignalError> {
        let spec = AlarmSpec::missing_backup(&self.settings, service)?;
        if self.failing.load(Ordering::SeqCst) {
            return Err(SignalError::Alarm {
                alarm: spec.name,
                reason: "backend unavailable".into(),
            });
        }
        self.alarms
            .lock()
            .expect("mutex poisoned")
            .insert(spec.name.clone(), spec);
        Ok(())
    }
}
