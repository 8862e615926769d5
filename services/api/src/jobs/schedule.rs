//! services/api/src/jobs/schedule.rs
//!
//! Wall-clock arithmetic for the report jobs. Times are interpreted in the
//! business calendar's offset and returned as UTC instants.

use attendance_core::BusinessCalendar;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};

fn to_utc(calendar: &BusinessCalendar, local: NaiveDateTime) -> DateTime<Utc> {
    (local - Duration::seconds(i64::from(calendar.offset().local_minus_utc()))).and_utc()
}

/// The first instant strictly after `now` at which the local clock reads `at`.
pub fn next_daily_run(
    now: DateTime<Utc>,
    calendar: &BusinessCalendar,
    at: NaiveTime,
) -> DateTime<Utc> {
    let local_now = calendar.local(now).naive_local();
    let mut candidate = local_now.date().and_time(at);
    if candidate <= local_now {
        candidate += Duration::days(1);
    }
    to_utc(calendar, candidate)
}

/// The first instant strictly after `now` that falls on `day` of a month at `at`.
/// Returns `None` only for days the month cannot hold.
pub fn next_monthly_run(
    now: DateTime<Utc>,
    calendar: &BusinessCalendar,
    day: u32,
    at: NaiveTime,
) -> Option<DateTime<Utc>> {
    let local_now = calendar.local(now).naive_local();
    let this_month = NaiveDate::from_ymd_opt(local_now.year(), local_now.month(), day)?;
    let mut candidate = this_month.and_time(at);
    if candidate <= local_now {
        candidate = this_month.checked_add_months(Months::new(1))?.and_time(at);
    }
    Some(to_utc(calendar, candidate))
}
