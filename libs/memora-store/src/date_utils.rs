//! Date utilities for daily reset hour handling.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

/// Get adjusted "today" based on daily_reset_hour.
///
/// If the current hour is before the reset hour, "today" is actually "yesterday"
/// from a study perspective. This allows users to study late at night and have
/// it count towards the previous day.
///
/// # Arguments
/// * `now` - Current time in the user's time zone
/// * `daily_reset_hour` - Hour of day (0-23) when a new "study day" begins
pub fn get_adjusted_today<Tz: TimeZone>(now: &DateTime<Tz>, daily_reset_hour: u32) -> NaiveDate {
    if now.hour() < daily_reset_hour {
        (now.clone() - Duration::days(1)).date_naive()
    } else {
        now.date_naive()
    }
}

/// Half-open `[start, end)` range of a study day, in UTC.
pub fn study_day_bounds<Tz: TimeZone>(
    tz: &Tz,
    day: NaiveDate,
    daily_reset_hour: u32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = day.succ_opt().unwrap_or(day);
    (
        day_start(tz, day, daily_reset_hour),
        day_start(tz, next, daily_reset_hour),
    )
}

fn day_start<Tz: TimeZone>(tz: &Tz, day: NaiveDate, daily_reset_hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(daily_reset_hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let naive = day.and_time(time);
    // Skipped local times (DST gaps) fall back to reading the wall clock as UTC
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_midnight_reset() {
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 0, 30, 0).unwrap();
        let result = get_adjusted_today(&now, 0);
        assert_eq!(result, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
    }

    #[test]
    fn test_before_reset_hour_counts_as_yesterday() {
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 3, 0, 0).unwrap();
        let result = get_adjusted_today(&now, 4);
        assert_eq!(result, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn test_bounds_follow_the_local_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let (start, end) = study_day_bounds(&tz, day, 4);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 6, 2, 2, 0, 0).unwrap());
    }
}
