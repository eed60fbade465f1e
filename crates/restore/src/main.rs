//! Restore binary that replays one snapshot into marathon or metronome.

use std::io;

use clap::Parser;
use dcos_backup_domain::config::hydrate_env_file;
use dcos_backup_domain::services::telemetry::{init_telemetry, TelemetryConfig};
use dcos_backup_restore::{cli::RestoreArgs, run_restore, RestoreError};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(err) = bootstrap().await {
        eprintln!("[restore] bootstrap failed: {err}");
        return Err(io::Error::other(err.to_string()));
    }

    Ok(())
}

async fn bootstrap() -> Result<(), RestoreError> {
    hydrate_env_file()?;
    let config = RestoreArgs::parse().into_config()?;
    let telemetry_config = TelemetryConfig::from_env("RESTORE");
    init_telemetry(&telemetry_config)?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("dcos-restore/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let report = run_restore(&config, client).await?;

    for outcome in report.outcomes.iter().filter(|outcome| !outcome.is_success()) {
        warn!(
            index = outcome.index,
            id = outcome.id.as_deref().unwrap_or("-"),
            status = ?outcome.status,
            "item not restored"
        );
    }
    info!(
        service = %report.service,
        submitted = report.submitted(),
        failed = report.failed(),
        "restore summary"
    );
    Ok(())
}
