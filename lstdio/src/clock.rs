// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Lock-free calendar time.
//!
//! `localtime_r` takes the timezone lock and may load zone files, neither of which is acceptable
//! from a signal handler.  This module converts epoch seconds plus a cached UTC offset into
//! calendar fields with nothing but integer arithmetic, and renders them in the fixed width
//! `asctime` layout.
//!
//! The leap year rule is deliberately the simple one: every year divisible by four is a leap
//! year.  This is exact from 1901 through 2099.  Outside that window dates drift by a day per
//! skipped century leap year, and consumers of the timestamps depend on that exact behavior, so it
//! must not be "fixed" here.

use core::fmt;

/// Width of the rendered calendar text, e.g. `Thu Jan  1 00:00:00 1970`.
pub const TIMESTAMP_LEN: usize = 24;

/// Substituted for the calendar text when the clock can't be read or rendered.
pub const EPOCH_PLACEHOLDER: &[u8; TIMESTAMP_LEN] = b"Thu Jan 01 00:00:00 1970";

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

const MONTH_ABBREV: [&[u8; 3]; 12] = [
    b"Jan", b"Feb", b"Mar", b"Apr", b"May", b"Jun", b"Jul", b"Aug", b"Sep", b"Oct", b"Nov", b"Dec",
];

const HOURS_PER_YEAR: i64 = 365 * 24;
const HOURS_PER_LEAP_CYCLE: i64 = 1461 * 24;

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weekday {
    /// Sunday, day 0.
    Sunday,
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
}

impl Weekday {
    /// Days since Sunday, 0..=6.
    pub const fn from_days_since_sunday(n: u32) -> Weekday {
        match n % 7 {
            0 => Weekday::Sunday,
            1 => Weekday::Monday,
            2 => Weekday::Tuesday,
            3 => Weekday::Wednesday,
            4 => Weekday::Thursday,
            5 => Weekday::Friday,
            _ => Weekday::Saturday,
        }
    }

    /// Three letter English abbreviation.
    pub const fn abbrev(self) -> &'static [u8; 3] {
        match self {
            Weekday::Sunday => b"Sun",
            Weekday::Monday => b"Mon",
            Weekday::Tuesday => b"Tue",
            Weekday::Wednesday => b"Wed",
            Weekday::Thursday => b"Thu",
            Weekday::Friday => b"Fri",
            Weekday::Saturday => b"Sat",
        }
    }
}

/// Broken down calendar time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    /// Seconds, 0..=59.
    pub second: u32,
    /// Minutes, 0..=59.
    pub minute: u32,
    /// Hours, 0..=23.
    pub hour: u32,
    /// Day of the month, 1..=31.
    pub day: u32,
    /// Month, 1..=12.
    pub month: u32,
    /// Full year, e.g. 1970.
    pub year: i64,
    /// Day of the week.
    pub weekday: Weekday,
    /// Days since January 1st, 0..=365.
    pub yearday: u32,
}

/// The calendar fields can't be rendered in the fixed width layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarError;

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("calendar time out of range")
    }
}

impl core::error::Error for CalendarError {}

fn is_leap(year: i64) -> bool {
    year & 3 == 0
}

impl CalendarTime {
    /// Thursday, January 1st 1970, midnight.
    pub const EPOCH: CalendarTime = CalendarTime {
        second: 0,
        minute: 0,
        hour: 0,
        day: 1,
        month: 1,
        year: 1970,
        weekday: Weekday::Thursday,
        yearday: 0,
    };

    /// Convert seconds since the epoch, shifted by `offset` seconds, into calendar fields.
    ///
    /// A shifted time before the epoch is clamped to the epoch.  The result is written to `out`.
    pub fn from_epoch(epoch: i64, offset: i32, out: &mut CalendarTime) {
        let mut time = epoch.saturating_add(offset as i64).max(0);

        out.second = (time % 60) as u32;
        time /= 60;
        out.minute = (time % 60) as u32;
        time /= 60;

        // `time` is now in hours.  Skip whole four year cycles, then walk at most four years.
        out.year = 1970 + (time / HOURS_PER_LEAP_CYCLE) * 4;
        time %= HOURS_PER_LEAP_CYCLE;
        loop {
            let hours_in_year = if is_leap(out.year) {
                HOURS_PER_YEAR + 24
            } else {
                HOURS_PER_YEAR
            };
            if time < hours_in_year {
                break;
            }
            out.year += 1;
            time -= hours_in_year;
        }

        out.hour = (time % 24) as u32;
        // One based day of the year.
        let mut day = (time / 24) as u32 + 1;
        out.yearday = day - 1;

        if is_leap(out.year) {
            if day == 60 {
                out.month = 2;
                out.day = 29;
                out.weekday = day_of_week(out.year, out.month, out.day);
                return;
            }
            if day > 60 {
                day -= 1;
            }
        }

        let mut month = 0;
        while month < 11 && DAYS_IN_MONTH[month] < day {
            day -= DAYS_IN_MONTH[month];
            month += 1;
        }
        out.month = month as u32 + 1;
        out.day = day;
        out.weekday = day_of_week(out.year, out.month, out.day);
    }

    /// Render as `Www Mmm dd hh:mm:ss yyyy`, the `asctime` layout without the newline.
    ///
    /// Fails if any field is out of range, including years that aren't four digits.
    pub fn render(&self, out: &mut [u8; TIMESTAMP_LEN]) -> Result<(), CalendarError> {
        if !(1000..=9999).contains(&self.year)
            || !(1..=12).contains(&self.month)
            || !(1..=31).contains(&self.day)
            || self.hour > 23
            || self.minute > 59
            || self.second > 60
        {
            return Err(CalendarError);
        }

        out[0..3].copy_from_slice(self.weekday.abbrev());
        out[3] = b' ';
        out[4..7].copy_from_slice(MONTH_ABBREV[self.month as usize - 1]);
        out[7] = b' ';
        // Day of the month is space padded, like "%3d" after the month.
        out[8] = if self.day < 10 { b' ' } else { b'0' + (self.day / 10) as u8 };
        out[9] = b'0' + (self.day % 10) as u8;
        out[10] = b' ';
        two_digits(&mut out[11..13], self.hour);
        out[13] = b':';
        two_digits(&mut out[14..16], self.minute);
        out[16] = b':';
        two_digits(&mut out[17..19], self.second);
        out[19] = b' ';
        let year = self.year as u32;
        two_digits(&mut out[20..22], year / 100);
        two_digits(&mut out[22..24], year % 100);
        Ok(())
    }
}

impl Default for CalendarTime {
    fn default() -> Self {
        Self::EPOCH
    }
}

fn two_digits(out: &mut [u8], value: u32) {
    out[0] = b'0' + (value / 10 % 10) as u8;
    out[1] = b'0' + (value % 10) as u8;
}

/// Zeller's congruence, Gregorian form.
///
/// January and February count as months 13 and 14 of the previous year.
fn day_of_week(year: i64, month: u32, day: u32) -> Weekday {
    let (m, y) = if month < 3 {
        (month as i64 + 12, year - 1)
    } else {
        (month as i64, year)
    };
    let k = y.rem_euclid(100);
    let j = y.div_euclid(100);
    // 0 = Saturday, 1 = Sunday, ...
    let h = (day as i64 + (13 * (m + 1)) / 5 + k + k / 4 + j / 4 + 5 * j).rem_euclid(7);
    Weekday::from_days_since_sunday(((h + 6) % 7) as u32)
}

/// Fill `out` with the calendar text for `epoch`, or the placeholder.
///
/// Never fails; a missing clock or an unrenderable date produce [`EPOCH_PLACEHOLDER`].
pub fn timestamp(epoch: Option<i64>, offset: i32, out: &mut [u8; TIMESTAMP_LEN]) {
    let mut tm = CalendarTime::EPOCH;
    let rendered = match epoch {
        Some(epoch) => {
            CalendarTime::from_epoch(epoch, offset, &mut tm);
            tm.render(out)
        }
        None => Err(CalendarError),
    };
    if rendered.is_err() {
        out.copy_from_slice(EPOCH_PLACEHOLDER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(epoch: i64, offset: i32) -> CalendarTime {
        let mut tm = CalendarTime::default();
        CalendarTime::from_epoch(epoch, offset, &mut tm);
        tm
    }

    fn text(epoch: Option<i64>, offset: i32) -> [u8; TIMESTAMP_LEN] {
        let mut out = [0; TIMESTAMP_LEN];
        timestamp(epoch, offset, &mut out);
        out
    }

    #[test]
    fn epoch_is_thursday() {
        assert_eq!(at(0, 0), CalendarTime::EPOCH);
        assert_eq!(&text(Some(0), 0), b"Thu Jan  1 00:00:00 1970");
    }

    #[test]
    fn negative_is_clamped() {
        assert_eq!(at(-1, 0), CalendarTime::EPOCH);
        assert_eq!(at(100, -3600), CalendarTime::EPOCH);
        assert_eq!(at(i64::MIN, 0), CalendarTime::EPOCH);
    }

    #[test]
    fn leap_day_2024() {
        // 2024-02-29 12:34:56 UTC
        let tm = at(1_709_210_096, 0);
        assert_eq!((tm.year, tm.month, tm.day), (2024, 2, 29));
        assert_eq!((tm.hour, tm.minute, tm.second), (12, 34, 56));
        assert_eq!(tm.weekday, Weekday::Thursday);
        assert_eq!(tm.yearday, 59);
        assert_eq!(&text(Some(1_709_210_096), 0), b"Thu Feb 29 12:34:56 2024");
    }

    #[test]
    fn days_around_leap_day() {
        // 2024-02-28 00:00:00 and 2024-03-01 00:00:00 UTC.
        let tm = at(1_709_078_400, 0);
        assert_eq!((tm.month, tm.day, tm.yearday), (2, 28, 58));
        assert_eq!(tm.weekday, Weekday::Wednesday);
        let tm = at(1_709_251_200, 0);
        assert_eq!((tm.month, tm.day, tm.yearday), (3, 1, 60));
        assert_eq!(tm.weekday, Weekday::Friday);
    }

    #[test]
    fn end_of_year() {
        // 2023-12-31 23:59:59 UTC, then one second later.
        let tm = at(1_704_067_199, 0);
        assert_eq!((tm.year, tm.month, tm.day), (2023, 12, 31));
        assert_eq!((tm.hour, tm.minute, tm.second), (23, 59, 59));
        assert_eq!(tm.weekday, Weekday::Sunday);
        assert_eq!(tm.yearday, 364);
        let tm = at(1_704_067_200, 0);
        assert_eq!((tm.year, tm.month, tm.day, tm.yearday), (2024, 1, 1, 0));
        assert_eq!(tm.weekday, Weekday::Monday);
        // Last day of a leap year.
        let tm = at(1_735_603_200, 0);
        assert_eq!((tm.year, tm.month, tm.day, tm.yearday), (2024, 12, 31, 365));
    }

    #[test]
    fn offset_shifts_fields() {
        // Midnight UTC is 02:00 at +2h, and the previous evening at -5h.
        let tm = at(1_700_006_400, 7200);
        assert_eq!((tm.month, tm.day, tm.hour), (11, 15, 2));
        let tm = at(1_700_006_400, -5 * 3600);
        assert_eq!((tm.month, tm.day, tm.hour), (11, 14, 19));
        assert_eq!(tm.weekday, Weekday::Tuesday);
    }

    #[test]
    fn century_is_treated_as_leap() {
        // 2100 has no leap day in the Gregorian calendar, but does under the simple rule: the
        // second that is really 2100-03-01 00:00:00 UTC comes out as February 29th.
        let tm = at(4_107_542_400, 0);
        assert_eq!((tm.year, tm.month, tm.day), (2100, 2, 29));
    }

    #[test]
    fn two_digit_days_are_not_padded() {
        // 2001-09-09 01:46:40 UTC
        assert_eq!(&text(Some(1_000_000_000), 0), b"Sun Sep  9 01:46:40 2001");
        // 2009-02-13 23:31:30 UTC
        assert_eq!(&text(Some(1_234_567_890), 0), b"Fri Feb 13 23:31:30 2009");
    }

    #[test]
    fn failures_use_placeholder() {
        assert_eq!(&text(None, 0), EPOCH_PLACEHOLDER);
        // Year 10000 and later don't fit in four digits.
        assert_eq!(&text(Some(253_402_300_800 + 366 * 86_400), 0), EPOCH_PLACEHOLDER);

        let mut out = [0; TIMESTAMP_LEN];
        let bad = CalendarTime { month: 13, ..CalendarTime::EPOCH };
        assert_eq!(bad.render(&mut out), Err(CalendarError));
    }
}
