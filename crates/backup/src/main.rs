//! Backup binary that snapshots marathon and metronome into the object store.

use std::{io, sync::Arc};

use clap::Parser;
use dcos_backup_domain::config::hydrate_env_file;
use dcos_backup_domain::services::telemetry::{init_telemetry, TelemetryConfig};
use dcos_backup_storage::open_store;
use dcos_backup_worker::{
    cli::BackupArgs, run_backup, BackupError, BackupOrchestrator, CloudWatchSignal,
    HttpConfigFetcher,
};
use tracing::warn;

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(err) = bootstrap().await {
        eprintln!("[backup] bootstrap failed: {err}");
        return Err(io::Error::other(err.to_string()));
    }

    Ok(())
}

async fn bootstrap() -> Result<(), BackupError> {
    hydrate_env_file()?;
    let config = BackupArgs::parse().into_config()?;
    let telemetry_config = TelemetryConfig::from_env("BACKUP");
    init_telemetry(&telemetry_config)?;

    let store = open_store(config.store()).await?;
    let client = reqwest::Client::builder()
        .user_agent(concat!("dcos-backup/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let fetcher = HttpConfigFetcher::from_config(client, &config);
    let signal = CloudWatchSignal::from_env(config.signal_settings(), config.aws_region()).await;

    let orchestrator = BackupOrchestrator::new(
        config.environment().clone(),
        Arc::new(fetcher),
        store,
        Arc::new(signal),
    )
    .with_fetch_failure_policy(config.fetch_failure_policy());

    run_backup(&config, orchestrator, shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
