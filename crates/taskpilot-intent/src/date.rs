//! Natural-language due date inference.
//!
//! Turns phrases like "tomorrow", "by friday" or "in 3 days" into an
//! end-of-day instant in the time zone of the supplied `now`.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone};
use regex::Regex;
use std::sync::LazyLock;

static IN_DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"in ([0-9]+) days?").expect("Invalid in-days regex"));

/// Weekday names in the order they are checked. Index is days from Sunday.
const WEEKDAYS: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

/// Infer a due date from free text.
///
/// Rules are checked in a fixed order and the first match wins:
/// "today", "tomorrow", a weekday name (sunday first), "next week",
/// then "in N day(s)". A weekday equal to today's resolves to a week out.
/// Returns `None` when nothing matches or the date is not representable.
pub fn infer_due_date<Tz: TimeZone>(text: &str, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let lower = text.to_lowercase();

    if lower.contains("today") {
        return end_of_day(now, 0);
    }

    if lower.contains("tomorrow") {
        return end_of_day(now, 1);
    }

    let current = now.weekday().num_days_from_sunday();
    for (target, name) in WEEKDAYS.iter().enumerate() {
        if lower.contains(name) {
            let offset = (target as u32 + 7 - current) % 7;
            let offset = if offset == 0 { 7 } else { offset };
            return end_of_day(now, u64::from(offset));
        }
    }

    if lower.contains("next week") {
        return end_of_day(now, 7);
    }

    if let Some(caps) = IN_DAYS.captures(&lower) {
        // Digits that overflow u64 have no representable date either.
        let days = caps[1].parse::<u64>().ok()?;
        return end_of_day(now, days);
    }

    None
}

/// 23:59:59.999 on the local calendar day `days` after `now`.
pub fn end_of_day<Tz: TimeZone>(now: &DateTime<Tz>, days: u64) -> Option<DateTime<Tz>> {
    let date: NaiveDate = now.date_naive().checked_add_days(Days::new(days))?;
    let naive = date.and_hms_milli_opt(23, 59, 59, 999)?;
    now.timezone().from_local_datetime(&naive).earliest()
}
