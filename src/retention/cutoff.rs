use chrono::{Months, NaiveDateTime};

/// The earliest timestamp to retain for a run at `now`.
///
/// Subtracts whole calendar months. When the target month is shorter than
/// the current day of month, the result clamps to that month's last day
/// (May 31 minus three months is February 28 or 29).
pub fn cutoff_for(now: NaiveDateTime, months: u32) -> NaiveDateTime {
    now.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDateTime::MIN)
}
