use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::operation::put_metric_alarm::builders::PutMetricAlarmFluentBuilder;
use aws_sdk_cloudwatch::operation::put_metric_data::builders::PutMetricDataFluentBuilder;
use aws_sdk_cloudwatch::types::{
    ComparisonOperator, Dimension, MetricDatum, StandardUnit, Statistic,
};
use aws_sdk_cloudwatch::Client;
use dcos_backup_domain::model::TrackedService;
use dcos_backup_domain::services::signal::{
    AlarmSpec, HealthSignal, SignalError, SignalSettings, BACKUP_DIMENSION,
};
use tracing::info;

const TREAT_MISSING_AS_BREACHING: &str = "breaching";

/// Publishes backup datapoints and alarms to CloudWatch.
pub struct CloudWatchSignal {
    client: Client,
    settings: SignalSettings,
}

impl CloudWatchSignal {
    pub fn new(client: Client, settings: SignalSettings) -> Self {
        Self { client, settings }
    }

    /// Builds a client from the default AWS provider chain, pinned to
    /// `region` when one is given.
    pub async fn from_env(settings: SignalSettings, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let shared = loader.load().await;
        Self::new(Client::new(&shared), settings)
    }

    fn environment_dimension(&self) -> Dimension {
        Dimension::builder()
            .name(BACKUP_DIMENSION)
            .value(self.settings.environment.as_str())
            .build()
    }

    fn success_request(&self, service: TrackedService) -> PutMetricDataFluentBuilder {
        self.client
            .put_metric_data()
            .namespace(&self.settings.namespace)
            .metric_data(success_datum(self.environment_dimension(), service))
    }

    fn alarm_request(&self, spec: &AlarmSpec) -> PutMetricAlarmFluentBuilder {
        self.client
            .put_metric_alarm()
            .alarm_name(&spec.name)
            .alarm_description(spec.description())
            .comparison_operator(ComparisonOperator::LessThanThreshold)
            .evaluation_periods(spec.evaluation_periods)
            .metric_name(&spec.metric_name)
            .namespace(&spec.namespace)
            .period(spec.period_secs)
            .statistic(Statistic::Average)
            .threshold(spec.threshold)
            .actions_enabled(true)
            .alarm_actions(&spec.topic)
            .ok_actions(&spec.topic)
            .dimensions(self.environment_dimension())
            .treat_missing_data(TREAT_MISSING_AS_BREACHING)
            .unit(StandardUnit::Count)
    }
}

/// The single count=1 datapoint recorded after a service's backup.
pub fn success_datum(environment: Dimension, service: TrackedService) -> MetricDatum {
    MetricDatum::builder()
        .metric_name(service.name())
        .value(1.0)
        .unit(StandardUnit::Count)
        .dimensions(environment)
        .build()
}

#[async_trait]
impl HealthSignal for CloudWatchSignal {
    async fn report_success(&self, service: TrackedService) -> Result<(), SignalError> {
        self.success_request(service)
            .send()
            .await
            .map_err(|err| SignalError::Publish {
                service,
                reason: DisplayErrorContext(&err).to_string(),
            })?;
        info!(%service, namespace = %self.settings.namespace, "backup success reported");
        Ok(())
    }

    async fn ensure_alarm(&self, service: TrackedService) -> Result<(), SignalError> {
        let spec = AlarmSpec::missing_backup(&self.settings, service)?;
        self.alarm_request(&spec)
            .send()
            .await
            .map_err(|err| SignalError::Alarm {
                alarm: spec.name.clone(),
                reason: DisplayErrorContext(&err).to_string(),
            })?;
        info!(alarm = %spec.name, topic = %spec.topic, "missing-backup alarm provisioned");
        Ok(())
    }
}
