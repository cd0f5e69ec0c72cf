// mongobackup/src/scheduler.rs
use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::backup::BackupPipeline;
use crate::errors::BackupError;

/// Wall-clock time of the daily run, host local timezone.
pub const DAILY_RUN_AT: NaiveTime = NaiveTime::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed,
    Skipped,
    Failed,
}

/// Next occurrence of `at` strictly after `now`, in `now`'s timezone.
///
/// A time that falls in a DST gap resolves to the first valid instant after it;
/// an ambiguous time resolves to its earlier instant.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut day = now.date_naive();
    loop {
        let candidate = resolve_local(&tz, day.and_time(at));
        if candidate > *now {
            return candidate;
        }
        day = day + Days::new(1);
    }
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    let mut local = naive;
    loop {
        if let Some(dt) = tz.from_local_datetime(&local).earliest() {
            return dt;
        }
        local += TimeDelta::minutes(1);
    }
}

/// Runs the pipeline once for `date` and logs how it ended.
pub async fn trigger(pipeline: &BackupPipeline, date: NaiveDate) -> TriggerOutcome {
    match pipeline.run(date).await {
        Ok(report) => {
            info!(
                %date,
                key = %report.upload.key,
                failed_dumps = report.failed_databases().len(),
                "Scheduled backup finished"
            );
            TriggerOutcome::Completed
        }
        Err(BackupError::AlreadyRunning) => {
            warn!(%date, "Previous backup still running, skipping this trigger");
            TriggerOutcome::Skipped
        }
        Err(e) => {
            error!(%date, stage = e.stage(), error = %e, "Scheduled backup failed");
            TriggerOutcome::Failed
        }
    }
}

/// Fires the pipeline every day at `at` local time.
///
/// Each run is spawned as its own task, so a run that outlasts a day makes the
/// next trigger observe it and skip.
pub fn spawn_daily(pipeline: Arc<BackupPipeline>, at: NaiveTime) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let next = next_run_after(&now, at);
            let wait = (next.clone() - now).to_std().unwrap_or(Duration::ZERO);
            info!(next_run = %next, "Next backup scheduled");
            tokio::time::sleep(wait).await;

            let pipeline = pipeline.clone();
            let date = next.date_naive();
            tokio::spawn(async move {
                trigger(&pipeline, date).await;
            });
        }
    })
}
