//! Daily trigger for the alert sweep

use chrono::{DateTime, Duration, Local, LocalResult, NaiveTime, TimeZone};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{AlertDispatcher, AlertError, ScheduleConfig};

/// First instant strictly after `now` whose local wall-clock time is `at`.
///
/// If `at` falls in a DST gap on that day the earliest valid instant after
/// the gap is used.
pub fn next_fire_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut day = now.date_naive();
    loop {
        let wall = day.and_time(at);
        let candidate = match tz.from_local_datetime(&wall) {
            LocalResult::Single(t) => Some(t),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => {
                // Skipped by a forward shift; an hour later is always past it.
                tz.from_local_datetime(&(wall + Duration::hours(1))).earliest()
            }
        };
        if let Some(candidate) = candidate {
            if candidate > *now {
                return candidate;
            }
        }
        day = day.succ_opt().unwrap_or(day);
    }
}

/// Fires one sweep per day at the configured local time
pub struct AlertScheduler {
    dispatcher: Arc<AlertDispatcher>,
    schedule: ScheduleConfig,
}

impl AlertScheduler {
    pub fn new(dispatcher: Arc<AlertDispatcher>, schedule: ScheduleConfig) -> Self {
        Self { dispatcher, schedule }
    }

    /// Run on a background task until `shutdown` flips to `true`
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            daily_at = %self.schedule.daily_at,
            run_on_startup = self.schedule.run_on_startup,
            "Alert scheduler started"
        );

        if self.schedule.run_on_startup {
            self.tick(shutdown.clone()).await;
        }

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = Local::now();
            let next = next_fire_after(&now, self.schedule.daily_at);
            let wait = (next.clone() - now).to_std().unwrap_or_default();
            tracing::debug!(next = %next, "Next alert sweep scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => self.tick(shutdown.clone()).await,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Alert scheduler stopped");
    }

    /// Run one sweep and log how it went. Never fails the scheduler.
    pub async fn tick(&self, shutdown: watch::Receiver<bool>) {
        match self.dispatcher.run_sweep(shutdown).await {
            Ok(summary) => tracing::info!(
                open_cases = summary.open_cases,
                succeeded = summary.succeeded,
                failed = summary.failed,
                skipped = summary.skipped,
                "Scheduled alert sweep complete"
            ),
            Err(AlertError::SweepInProgress) => {
                tracing::warn!("Scheduled alert sweep skipped, previous sweep still running")
            }
            Err(e) => tracing::error!(error = %e, "Scheduled alert sweep failed"),
        }
    }
}
