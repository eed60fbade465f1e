//! Library entrypoint for the backup worker. The `dcos-backup` binary wires
//! these pieces together; tests and other binaries can embed the
//! orchestrator with their own fetcher, store and signal implementations.

pub mod cli;
pub mod fetcher;
pub mod schedule;
pub mod signal;
pub mod worker;

pub use fetcher::{ConfigFetcher, FetchError, HttpConfigFetcher};
pub use schedule::{CronScheduler, DailySchedule, Job, ScheduleError, SchedulerHandle};
pub use signal::CloudWatchSignal;
pub use worker::{run_backup, BackupError, BackupOrchestrator};
