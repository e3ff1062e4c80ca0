//! UTC time helpers shared by the fetch pipeline.

use chrono::Utc;

/// Seconds in one hour.
pub const HOUR_SECONDS: u64 = 3_600;
/// Seconds in one day.
pub const DAY_SECONDS: u64 = 86_400;
/// Seconds in one week.
pub const WEEK_SECONDS: u64 = 7 * DAY_SECONDS;

/// Current UTC time as non-negative unix seconds.
pub fn now_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// The three historical reference timestamps used for derived metrics:
/// one day, two days and one week before `now`, floored to the minute.
pub const fn change_timestamps(now: u64) -> (u64, u64, u64) {
    let minute = now - now % 60;
    (
        minute.saturating_sub(DAY_SECONDS),
        minute.saturating_sub(2 * DAY_SECONDS),
        minute.saturating_sub(WEEK_SECONDS),
    )
}

/// Interval-spaced timestamps from `start` up to the last full interval
/// before `end`.
///
/// The trailing partial interval is excluded: the last grid point satisfies
/// `t <= end - interval`, matching the candle construction which needs a
/// close sample one step ahead of every open.
pub fn interval_timestamps(start: u64, end: u64, interval: u64) -> Vec<u64> {
    let interval = interval.max(1);
    let Some(last) = end.checked_sub(interval) else {
        return Vec::new();
    };
    let mut timestamps = Vec::new();
    let mut time = start;
    while time <= last {
        timestamps.push(time);
        time += interval;
    }
    timestamps
}

/// [`interval_timestamps`] with a one-hour step.
pub fn hourly_timestamps(start: u64, end: u64) -> Vec<u64> {
    interval_timestamps(start, end, HOUR_SECONDS)
}

/// Day-bucket index of a unix timestamp.
pub const fn day_bucket(timestamp: u64) -> u64 {
    timestamp / DAY_SECONDS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_timestamps_are_minute_aligned() {
        let now = 1_700_000_042; // :42 past the minute
        let (one_day, two_days, one_week) = change_timestamps(now);
        assert_eq!(one_day % 60, 0);
        assert_eq!(now - now % 60 - one_day, DAY_SECONDS);
        assert_eq!(one_day - two_days, DAY_SECONDS);
        assert_eq!(now - now % 60 - one_week, WEEK_SECONDS);
    }

    #[test]
    fn hourly_timestamps_cover_a_day() {
        let start = 1_700_000_000 - 1_700_000_000 % HOUR_SECONDS - DAY_SECONDS;
        let end = start + DAY_SECONDS + HOUR_SECONDS / 2;
        let grid = hourly_timestamps(start, end);
        // 24 full hours plus the current hour's start.
        assert_eq!(grid.len(), 24);
        assert!(grid.windows(2).all(|w| w[1] - w[0] == HOUR_SECONDS));
    }

    #[test]
    fn hourly_timestamps_empty_when_start_in_future() {
        let grid = hourly_timestamps(2_000_000_000, 1_700_000_000);
        assert!(grid.is_empty());
    }

    #[test]
    fn hourly_timestamps_excludes_trailing_partial_hour() {
        let start = 7_200;
        let grid = hourly_timestamps(start, start + HOUR_SECONDS + 1);
        assert_eq!(grid, vec![start, start + HOUR_SECONDS]);
        let grid = hourly_timestamps(start, start + HOUR_SECONDS - 1);
        assert_eq!(grid, vec![start]);
    }

    #[test]
    fn day_bucket_boundaries() {
        assert_eq!(day_bucket(0), 0);
        assert_eq!(day_bucket(DAY_SECONDS - 1), 0);
        assert_eq!(day_bucket(DAY_SECONDS), 1);
    }
}
