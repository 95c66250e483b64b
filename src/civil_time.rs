//! UTC to local civil time conversion with the EU daylight-saving rule.
//!
//! The board runs in a single fixed timezone (Central European Time). Instead
//! of carrying a timezone database, the offset is derived from the EU rule:
//!
//! | Period | Offset |
//! |--------|--------|
//! | last Sunday of March 01:00 UTC (inclusive) → last Sunday of October 01:00 UTC (exclusive) | UTC+2 |
//! | otherwise | UTC+1 |
//!
//! All calendar arithmetic is done on the proleptic Gregorian calendar using
//! day counts relative to the Unix epoch, so it works for any year without
//! tables and without `std`.
//!
//! # Example
//!
//! ```rust
//! use rs_departures::civil_time::{to_local, unix_from_civil};
//!
//! // Winter: UTC+1
//! let utc = unix_from_civil(2026, 1, 11, 12, 9, 20);
//! assert_eq!(to_local(utc).hhmm().as_str(), "13:09");
//!
//! // Summer: UTC+2
//! let utc = unix_from_civil(2026, 7, 1, 10, 0, 0);
//! assert_eq!(to_local(utc).hhmm().as_str(), "12:00");
//! ```

use core::fmt::Write;
use heapless::String as HString;

/// Seconds since the Unix epoch, UTC.
pub type UtcSeconds = i64;

/// Seconds in one civil day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Offset outside the daylight-saving window (CET).
pub const STANDARD_OFFSET_SECONDS: i32 = 3_600;

/// Offset inside the daylight-saving window (CEST).
pub const SUMMER_OFFSET_SECONDS: i32 = 7_200;

/// UTC hour at which both transitions happen.
pub const DST_SWITCH_HOUR_UTC: u8 = 1;

/// Day of the week.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Weekday {
    /// Monday.
    Monday,
    /// Tuesday.
    Tuesday,
    /// Wednesday.
    Wednesday,
    /// Thursday.
    Thursday,
    /// Friday.
    Friday,
    /// Saturday.
    Saturday,
    /// Sunday.
    Sunday,
}

impl Weekday {
    const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];
}

/// A calendar date and wall-clock time without offset information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CivilTime {
    /// Proleptic Gregorian year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u8,
    /// Day of month, 1-31.
    pub day: u8,
    /// Hour, 0-23.
    pub hour: u8,
    /// Minute, 0-59.
    pub minute: u8,
    /// Second, 0-59.
    pub second: u8,
}

impl CivilTime {
    /// Formats the time of day as zero-padded `HH:MM`.
    pub fn hhmm(&self) -> HString<5> {
        let mut out = HString::new();
        // 5 bytes always fit two 2-digit fields and a colon
        let _ = write!(out, "{:02}:{:02}", self.hour, self.minute);
        out
    }

    /// Returns the weekday of this date.
    pub fn weekday(&self) -> Weekday {
        weekday_from_days(days_from_civil(self.year, self.month, self.day))
    }
}

/// Returns true if `year` is a Gregorian leap year.
#[inline]
pub const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`. Returns 0 for invalid months.
pub const fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
///
/// The year is shifted to start in March so the leap day is the last day of
/// the shifted year, which makes the day-of-year formula branch-free.
pub fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let y = if month <= 2 { year as i64 - 1 } else { year as i64 };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month as i64 + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Inverse of [`days_from_civil`]: `(year, month, day)` for a day count.
pub fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year as i32, month, day)
}

/// Weekday of a day count since 1970-01-01 (which was a Thursday).
pub fn weekday_from_days(days: i64) -> Weekday {
    Weekday::ALL[(days + 3).rem_euclid(7) as usize]
}

/// Seconds since the epoch for a UTC calendar date and time.
pub fn unix_from_civil(
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
) -> UtcSeconds {
    days_from_civil(year, month, day) * SECONDS_PER_DAY
        + hour as i64 * 3_600
        + minute as i64 * 60
        + second as i64
}

/// Decomposes seconds since the epoch into calendar fields, no offset applied.
pub fn civil_from_unix(secs: UtcSeconds) -> CivilTime {
    let days = secs.div_euclid(SECONDS_PER_DAY);
    let rem = secs.rem_euclid(SECONDS_PER_DAY);
    let (year, month, day) = civil_from_days(days);
    CivilTime {
        year,
        month,
        day,
        hour: (rem / 3_600) as u8,
        minute: (rem % 3_600 / 60) as u8,
        second: (rem % 60) as u8,
    }
}

/// Day of month of the last Sunday in `month` of `year`.
///
/// Searches backward over the final seven days of the month. Every run of
/// seven consecutive days contains exactly one Sunday, so the search always
/// ends on a real Sunday; for March and October that is a day in 25..=31.
pub fn last_sunday(year: i32, month: u8) -> u8 {
    let last = days_in_month(year, month);
    let mut day = last;
    while day > last.saturating_sub(7) && day > 0 {
        if weekday_from_days(days_from_civil(year, month, day)) == Weekday::Sunday {
            return day;
        }
        day -= 1;
    }
    last
}

/// Half-open daylight-saving window `[start, end)` for `year`, in UTC seconds.
pub fn dst_window(year: i32) -> (UtcSeconds, UtcSeconds) {
    let start = unix_from_civil(year, 3, last_sunday(year, 3), DST_SWITCH_HOUR_UTC, 0, 0);
    let end = unix_from_civil(year, 10, last_sunday(year, 10), DST_SWITCH_HOUR_UTC, 0, 0);
    (start, end)
}

/// Offset from UTC to local civil time at the given instant.
///
/// The window is recomputed for the instant's UTC year on every call.
pub fn utc_offset_seconds(utc: UtcSeconds) -> i32 {
    let year = civil_from_unix(utc).year;
    let (start, end) = dst_window(year);
    if (start..end).contains(&utc) {
        SUMMER_OFFSET_SECONDS
    } else {
        STANDARD_OFFSET_SECONDS
    }
}

/// Converts a UTC instant to local civil time.
pub fn to_local(utc: UtcSeconds) -> CivilTime {
    civil_from_unix(utc + utc_offset_seconds(utc) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Day arithmetic
    // =========================================================================

    #[test]
    fn epoch_is_day_zero() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(civil_from_days(0), (1970, 1, 1));
    }

    #[test]
    fn known_day_counts() {
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
        assert_eq!(days_from_civil(1969, 12, 31), -1);
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn leap_day_round_trip() {
        let days = days_from_civil(2024, 2, 29);
        assert_eq!(civil_from_days(days), (2024, 2, 29));
        assert_eq!(civil_from_days(days + 1), (2024, 3, 1));
    }

    #[test]
    fn leap_year_rules() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2026));
    }

    #[test]
    fn days_in_month_table() {
        assert_eq!(days_in_month(2026, 2), 28);
        assert_eq!(days_in_month(2028, 2), 29);
        assert_eq!(days_in_month(2026, 4), 30);
        assert_eq!(days_in_month(2026, 10), 31);
        assert_eq!(days_in_month(2026, 13), 0);
    }

    #[test]
    fn epoch_was_thursday() {
        assert_eq!(weekday_from_days(0), Weekday::Thursday);
        assert_eq!(weekday_from_days(-1), Weekday::Wednesday);
    }

    // =========================================================================
    // Last Sunday / DST window
    // =========================================================================

    #[test]
    fn last_sundays_of_known_years() {
        assert_eq!(last_sunday(2024, 3), 31);
        assert_eq!(last_sunday(2024, 10), 27);
        assert_eq!(last_sunday(2025, 3), 30);
        assert_eq!(last_sunday(2025, 10), 26);
        assert_eq!(last_sunday(2026, 3), 29);
        assert_eq!(last_sunday(2026, 10), 25);
    }

    #[test]
    fn last_sunday_in_short_month_is_real_sunday() {
        let day = last_sunday(2026, 2);
        assert!(day >= 22 && day <= 28);
        let civil = CivilTime {
            year: 2026,
            month: 2,
            day,
            hour: 0,
            minute: 0,
            second: 0,
        };
        assert_eq!(civil.weekday(), Weekday::Sunday);
    }

    #[test]
    fn dst_window_2026() {
        let (start, end) = dst_window(2026);
        assert_eq!(start, unix_from_civil(2026, 3, 29, 1, 0, 0));
        assert_eq!(end, unix_from_civil(2026, 10, 25, 1, 0, 0));
    }

    #[test]
    fn offset_at_spring_boundary() {
        let start = unix_from_civil(2026, 3, 29, 1, 0, 0);
        assert_eq!(utc_offset_seconds(start - 1), STANDARD_OFFSET_SECONDS);
        assert_eq!(utc_offset_seconds(start), SUMMER_OFFSET_SECONDS);
    }

    #[test]
    fn offset_at_autumn_boundary() {
        let end = unix_from_civil(2026, 10, 25, 1, 0, 0);
        assert_eq!(utc_offset_seconds(end - 1), SUMMER_OFFSET_SECONDS);
        assert_eq!(utc_offset_seconds(end), STANDARD_OFFSET_SECONDS);
    }

    // =========================================================================
    // Local conversion
    // =========================================================================

    #[test]
    fn winter_instant_is_utc_plus_one() {
        let local = to_local(unix_from_civil(2026, 1, 11, 12, 9, 20));
        assert_eq!(local.hhmm().as_str(), "13:09");
        assert_eq!(local.second, 20);
    }

    #[test]
    fn summer_instant_is_utc_plus_two() {
        let local = to_local(unix_from_civil(2026, 7, 1, 10, 0, 0));
        assert_eq!(local.hhmm().as_str(), "12:00");
    }

    #[test]
    fn local_time_rolls_over_midnight_and_year() {
        let local = to_local(unix_from_civil(2025, 12, 31, 23, 30, 0));
        assert_eq!(
            (local.year, local.month, local.day),
            (2026, 1, 1)
        );
        assert_eq!(local.hhmm().as_str(), "00:30");
    }

    #[test]
    fn spring_forward_skips_an_hour() {
        let before = to_local(unix_from_civil(2026, 3, 29, 0, 59, 0));
        let after = to_local(unix_from_civil(2026, 3, 29, 1, 0, 0));
        assert_eq!(before.hhmm().as_str(), "01:59");
        assert_eq!(after.hhmm().as_str(), "03:00");
    }

    #[test]
    fn fall_back_repeats_an_hour() {
        let before = to_local(unix_from_civil(2026, 10, 25, 0, 59, 0));
        let after = to_local(unix_from_civil(2026, 10, 25, 1, 0, 0));
        assert_eq!(before.hhmm().as_str(), "02:59");
        assert_eq!(after.hhmm().as_str(), "02:00");
    }

    #[test]
    fn hhmm_is_zero_padded() {
        let civil = civil_from_unix(unix_from_civil(2026, 5, 4, 3, 7, 0));
        assert_eq!(civil.hhmm().as_str(), "03:07");
    }
}
