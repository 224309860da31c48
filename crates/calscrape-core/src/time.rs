//! Time types for calendar scraping.
//!
//! This module provides [`TargetMonth`] for the month a caller asks for,
//! [`EventTime`] for representing event start/end times (which may be either
//! a specific datetime or an all-day date), and [`TimeWindow`] for the UTC
//! range sent upstream.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time (stored as UTC)
/// - **AllDay**: A date without a specific time (all-day events)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// For all-day events, returns midnight UTC on that date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }

    /// The instant this time starts at when read in `tz`.
    ///
    /// All-day dates resolve to local midnight in `tz`, so they order
    /// correctly against timed events of the same zone.
    pub fn instant_in(&self, tz: &Tz) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => {
                local_midnight(*date, tz).unwrap_or_else(|| self.to_utc_datetime())
            }
        }
    }

    /// Returns the calendar date of this event time as seen in `tz`.
    ///
    /// All-day dates are returned unchanged.
    pub fn date_in(&self, tz: &Tz) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.with_timezone(tz).date_naive(),
            Self::AllDay(date) => *date,
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Errors raised when building a [`TargetMonth`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetMonthError {
    /// The month number is not in `1..=12`.
    #[error("month must be between 1 and 12, got {0}")]
    MonthOutOfRange(u32),

    /// The year cannot be represented.
    #[error("year {0} is out of range")]
    YearOutOfRange(i32),

    /// The first instant of the month does not exist in the reference timezone.
    #[error("start of {month} does not exist in timezone {tz}")]
    Unrepresentable { month: String, tz: String },
}

/// The calendar month a caller wants data for.
///
/// Always normalized to day 1, midnight, in a fixed reference timezone.
/// The UTC window covers the whole month: `[first instant, first instant of
/// the following month)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMonth {
    year: i32,
    month: u32,
    tz: Tz,
    window: TimeWindow,
}

impl TargetMonth {
    /// Creates a target month in the given reference timezone.
    pub fn new(year: i32, month: u32, tz: Tz) -> Result<Self, TargetMonthError> {
        if !(1..=12).contains(&month) {
            return Err(TargetMonthError::MonthOutOfRange(month));
        }

        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(TargetMonthError::YearOutOfRange(year))?;
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .ok_or(TargetMonthError::YearOutOfRange(next_year))?;

        let start = local_midnight(first, &tz).ok_or_else(|| TargetMonthError::Unrepresentable {
            month: month_label(year, month),
            tz: tz.name().to_string(),
        })?;
        let end =
            local_midnight(next_first, &tz).ok_or_else(|| TargetMonthError::Unrepresentable {
                month: month_label(next_year, next_month),
                tz: tz.name().to_string(),
            })?;

        Ok(Self {
            year,
            month,
            tz,
            window: TimeWindow::new(start, end),
        })
    }

    /// Creates a target month in UTC.
    pub fn utc(year: i32, month: u32) -> Result<Self, TargetMonthError> {
        Self::new(year, month, Tz::UTC)
    }

    /// Returns the month containing `now` in the given timezone.
    pub fn containing(now: DateTime<Utc>, tz: Tz) -> Result<Self, TargetMonthError> {
        let local = now.with_timezone(&tz);
        Self::new(local.year(), local.month(), tz)
    }

    /// The calendar year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The calendar month, `1..=12`.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The reference timezone.
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// The first day of the month.
    pub fn first_day(&self) -> NaiveDate {
        self.window.start.with_timezone(&self.tz).date_naive()
    }

    /// The first instant of the month in the reference timezone.
    pub fn start(&self) -> DateTime<Tz> {
        self.window.start.with_timezone(&self.tz)
    }

    /// The UTC window covering this month.
    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Returns `true` if the date belongs to this month.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Number of months from `other` to `self` (negative if `self` is earlier).
    pub fn months_since(&self, other: &TargetMonth) -> i64 {
        self.ordinal() - other.ordinal()
    }

    /// Human-readable label such as `"October 2025"`.
    pub fn label(&self) -> String {
        month_label(self.year, self.month)
    }

    fn ordinal(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }
}

impl fmt::Display for TargetMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Resolves local midnight on `date`, stepping past a DST gap if midnight
/// does not exist in `tz`.
fn local_midnight(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    (0..=2)
        .find_map(|h| {
            tz.from_local_datetime(&(midnight + Duration::hours(h)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
}

fn month_label(year: i32, month: u32) -> String {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    let name = NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("Unknown");
    format!("{} {}", name, year)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod event_time {
        use super::*;

        #[test]
        fn all_day_compares_at_midnight_utc() {
            let all_day = EventTime::from_date(date(2025, 10, 3));
            let morning = EventTime::from_utc(utc(2025, 10, 3, 9, 0, 0));
            assert!(all_day < morning);
            assert_eq!(all_day.to_utc_datetime(), utc(2025, 10, 3, 0, 0, 0));
        }

        #[test]
        fn date_in_uses_reference_zone() {
            let late = EventTime::from_utc(utc(2025, 10, 31, 23, 30, 0));
            assert_eq!(late.date_in(&Tz::UTC), date(2025, 10, 31));
            assert_eq!(late.date_in(&chrono_tz::Asia::Kolkata), date(2025, 11, 1));
        }

        #[test]
        fn instant_in_resolves_all_day_to_local_midnight() {
            let ny = chrono_tz::America::New_York;
            let holiday = EventTime::from_date(date(2025, 10, 3));
            let evening = EventTime::from_utc(utc(2025, 10, 3, 2, 0, 0));

            assert_eq!(holiday.instant_in(&ny), utc(2025, 10, 3, 4, 0, 0));
            assert_eq!(evening.instant_in(&ny), utc(2025, 10, 3, 2, 0, 0));
            assert!(evening.instant_in(&ny) < holiday.instant_in(&ny));
            assert_eq!(holiday.instant_in(&Tz::UTC), utc(2025, 10, 3, 0, 0, 0));
        }

        #[test]
        fn serializes_tagged() {
            let et = EventTime::from_date(date(2025, 10, 1));
            let json = serde_json::to_string(&et).unwrap();
            assert_eq!(json, r#"{"type":"AllDay","value":"2025-10-01"}"#);
        }
    }

    mod target_month {
        use super::*;

        #[test]
        fn utc_window_covers_whole_month() {
            let month = TargetMonth::utc(2025, 10).unwrap();
            assert_eq!(month.window().start, utc(2025, 10, 1, 0, 0, 0));
            assert_eq!(month.window().end, utc(2025, 11, 1, 0, 0, 0));
            assert_eq!(month.first_day(), date(2025, 10, 1));
            assert_eq!(month.window().duration(), Duration::days(31));
        }

        #[test]
        fn december_rolls_into_next_year() {
            let month = TargetMonth::utc(2025, 12).unwrap();
            assert_eq!(month.window().end, utc(2026, 1, 1, 0, 0, 0));
        }

        #[test]
        fn window_is_shifted_by_reference_zone() {
            let month = TargetMonth::new(2025, 10, chrono_tz::Asia::Kolkata).unwrap();
            assert_eq!(month.window().start, utc(2025, 9, 30, 18, 30, 0));
            assert_eq!(month.start().format("%d %H:%M").to_string(), "01 00:00");
        }

        #[test]
        fn rejects_month_out_of_range() {
            assert_eq!(
                TargetMonth::utc(2025, 13),
                Err(TargetMonthError::MonthOutOfRange(13))
            );
            assert_eq!(
                TargetMonth::utc(2025, 0),
                Err(TargetMonthError::MonthOutOfRange(0))
            );
        }

        #[test]
        fn contains_date_checks_year_and_month() {
            let month = TargetMonth::utc(2025, 10).unwrap();
            assert!(month.contains_date(date(2025, 10, 31)));
            assert!(!month.contains_date(date(2025, 11, 1)));
            assert!(!month.contains_date(date(2024, 10, 15)));
        }

        #[test]
        fn months_since_spans_years() {
            let a = TargetMonth::utc(2025, 2).unwrap();
            let b = TargetMonth::utc(2024, 11).unwrap();
            assert_eq!(a.months_since(&b), 3);
            assert_eq!(b.months_since(&a), -3);
        }

        #[test]
        fn containing_uses_local_month() {
            let now = utc(2025, 10, 31, 20, 0, 0);
            let month = TargetMonth::containing(now, chrono_tz::Asia::Tokyo).unwrap();
            assert_eq!((month.year(), month.month()), (2025, 11));
        }

        #[test]
        fn label_and_display() {
            let month = TargetMonth::utc(2025, 10).unwrap();
            assert_eq!(month.label(), "October 2025");
            assert_eq!(month.to_string(), "2025-10");
        }
    }
}
