//! Monthly scheduling for `watch` mode.

use std::{sync::Arc, time::Duration};

use chrono::{Datelike, Local, Months, NaiveDate, NaiveDateTime};

use crate::{
    archive::Archiver,
    config::{DocumentConfig, ScheduleConfig},
};

/// Next time strictly after `after` that matches the schedule.
///
/// Returns `None` only if the result would fall outside chrono's date range.
pub fn next_run(after: NaiveDateTime, schedule: &ScheduleConfig) -> Option<NaiveDateTime> {
    let this_month = NaiveDate::from_ymd_opt(after.year(), after.month(), schedule.day_of_month)?
        .and_hms_opt(schedule.hour, 0, 0)?;

    if this_month > after {
        Some(this_month)
    } else {
        this_month.checked_add_months(Months::new(1))
    }
}

/// Runs the archiver once a month, forever.
///
/// Each iteration sleeps until the next scheduled local time, then runs
/// every configured document. Run failures are logged by the archiver and
/// never stop the loop.
pub async fn start_schedule_worker(
    archiver: Arc<Archiver>,
    documents: Vec<DocumentConfig>,
    schedule: ScheduleConfig,
) {
    tracing::info!(
        day_of_month = schedule.day_of_month,
        hour = schedule.hour,
        documents = documents.len(),
        dry_run = archiver.retention().dry_run,
        "Starting schedule worker"
    );

    loop {
        let now = Local::now().naive_local();
        let Some(next) = next_run(now, &schedule) else {
            tracing::error!(now = %now, "Cannot compute next scheduled run, stopping");
            return;
        };

        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::info!(next_run = %next, wait_secs = wait.as_secs(), "Next archive run scheduled");
        tokio::time::sleep(wait).await;

        let report = archiver.run(&documents, Local::now().naive_local()).await;
        if report.has_failures() {
            tracing::warn!(
                failed = report.failed_documents(),
                "Scheduled run finished with failures"
            );
        }
    }
}
