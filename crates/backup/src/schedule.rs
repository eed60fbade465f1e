//! Recurring execution of a job at a fixed hour of the day (UTC).
//!
//! The scheduler runs one job on one task: the next fire time is computed
//! only after the previous run returns, so runs never overlap and a run that
//! outlasts its slot simply coalesces the fires it missed.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use metrics::counter;
use thiserror::Error;
use tokio::{sync::watch, time::sleep};
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("scheduled hour must be between 0 and 23, got {0}")]
    InvalidHour(u8),
    #[error("invalid cron expression `{expression}`: {reason}")]
    Expression { expression: String, reason: String },
    #[error("schedule has no upcoming fire time")]
    Exhausted,
}

/// Work the scheduler can drive.
#[async_trait]
pub trait Job: Send + Sync {
    type Error: fmt::Display + Send;

    fn name(&self) -> &str;

    async fn run(&self) -> Result<(), Self::Error>;
}

/// Fires once a day at `hour:00:00` UTC.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    hour: u8,
    schedule: Schedule,
}

impl DailySchedule {
    pub fn at_hour(hour: u8) -> Result<Self, ScheduleError> {
        if hour > 23 {
            return Err(ScheduleError::InvalidHour(hour));
        }
        // sec min hour day-of-month month day-of-week
        let expression = format!("0 0 {hour} * * *");
        let schedule =
            Schedule::from_str(&expression).map_err(|err| ScheduleError::Expression {
                expression: expression.clone(),
                reason: err.to_string(),
            })?;
        Ok(Self { hour, schedule })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// First fire time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&now).next()
    }

    /// Next fire time given the previous one. A wall clock that reads
    /// earlier than `last_fire` never yields `last_fire` again.
    pub fn next_fire(
        &self,
        now: DateTime<Utc>,
        last_fire: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        let base = last_fire.map_or(now, |last| now.max(last));
        self.next_after(base)
    }
}

/// Stops a running [`CronScheduler`] from another task.
#[derive(Clone)]
pub struct SchedulerHandle {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }
}

/// Explicitly constructed scheduler with a start/stop lifecycle.
pub struct CronScheduler {
    schedule: DailySchedule,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl CronScheduler {
    pub fn new(schedule: DailySchedule) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            schedule,
            stop_tx: Arc::new(stop_tx),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            stop_tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Blocks until [`SchedulerHandle::stop`] is called and returns the
    /// number of runs performed. Failed runs are logged and the scheduler
    /// waits for the next slot.
    pub async fn start<J>(&self, job: &J) -> Result<usize, ScheduleError>
    where
        J: Job + ?Sized,
    {
        let mut stop_rx = self.stop_tx.subscribe();
        let mut runs = 0;
        let mut last_fire = None;

        info!(job = job.name(), hour = self.schedule.hour(), "scheduler started");
        loop {
            if *stop_rx.borrow() {
                break;
            }

            let now = Utc::now();
            let next = self
                .schedule
                .next_fire(now, last_fire)
                .ok_or(ScheduleError::Exhausted)?;
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(job = job.name(), next_run = %next, "waiting for next run");

            tokio::select! {
                _ = sleep(wait) => {}
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }

            last_fire = Some(next);
            runs += 1;
            match job.run().await {
                Ok(()) => {
                    counter!("scheduled_runs_total", "result" => "ok").increment(1);
                    info!(job = job.name(), "scheduled run finished");
                }
                Err(err) => {
                    counter!("scheduled_runs_total", "result" => "error").increment(1);
                    error!(job = job.name(), error = %err, "scheduled run failed");
                }
            }
        }

        info!(job = job.name(), runs, "scheduler stopped");
        Ok(runs)
    }
}
