use std::{env, net::SocketAddr};

use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static SUBSCRIBER_INSTALLED: OnceCell<()> = OnceCell::new();
static METRICS_INSTALLED: OnceCell<()> = OnceCell::new();

/// Shared observability options for binaries.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    log_filter: String,
    metrics_address: Option<String>,
}

impl TelemetryConfig {
    /// Reads `<PREFIX>_LOG_FILTER` (default `info`) and
    /// `<PREFIX>_METRICS_ADDRESS`. Callers hydrate `.env` first.
    pub fn from_env(prefix: &str) -> Self {
        let upper = prefix.trim().to_ascii_uppercase();
        let log_key = format!("{}_LOG_FILTER", upper);
        let metrics_key = format!("{}_METRICS_ADDRESS", upper);

        let log_filter = env::var(log_key).unwrap_or_else(|_| "info".to_string());
        let metrics_address = env::var(metrics_key).ok().and_then(|value| {
            if value.trim().is_empty() {
                None
            } else {
                Some(value)
            }
        });

        Self {
            log_filter,
            metrics_address,
        }
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn metrics_address(&self) -> Option<&str> {
        self.metrics_address.as_deref()
    }
}

/// Installs the tracing subscriber and the metrics recorder once per process.
///
/// With a metrics address the Prometheus exporter also serves `/metrics` on
/// it, which needs a running tokio runtime.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    install_tracing(config)?;
    install_metrics(config)
}

fn install_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if SUBSCRIBER_INSTALLED.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_new(config.log_filter())
        .map_err(|err| TelemetryError::InvalidLogFilter(err.to_string()))?;

    if SUBSCRIBER_INSTALLED.set(()).is_ok() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .try_init()
            .map_err(|err| TelemetryError::Tracing(err.to_string()))?;
    }

    Ok(())
}

fn install_metrics(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    METRICS_INSTALLED
        .get_or_try_init(|| {
            let builder = PrometheusBuilder::new();
            let installed = match metrics_socket(config)? {
                Some(socket) => builder.with_http_listener(socket).install(),
                None => builder.install_recorder().map(|_| ()),
            };
            installed.map_err(|err| TelemetryError::Metrics(err.to_string()))
        })
        .map(|_| ())
}

fn metrics_socket(config: &TelemetryConfig) -> Result<Option<SocketAddr>, TelemetryError> {
    config
        .metrics_address()
        .map(|addr| {
            addr.trim().parse().map_err(|err: std::net::AddrParseError| {
                TelemetryError::InvalidMetricsAddress(addr.to_string(), err.to_string())
            })
        })
        .transpose()
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
    #[error("invalid metrics address `{0}`: {1}")]
    InvalidMetricsAddress(String, String),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}
