//! Calendar system: the locale-dependent inputs of date arithmetic.
//!
//! The calculator never asks the host for locale data; callers pass a
//! [`Calendar`] explicitly.  [`Gregorian`] covers real use; tests can supply
//! calendars with a fixed first weekday or calendars that refuse to
//! materialize certain dates.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use rc_domain::config::CalendarConfig;

/// Month lengths, leap years, first weekday and date materialization.
pub trait Calendar {
    /// First day of the week for the active locale.
    fn first_weekday(&self) -> Weekday;

    /// Number of days in `month` (1-based) of `year`, leap years included.
    fn days_in_month(&self, year: i32, month: u32) -> Option<u32>;

    /// Materialize a date from components. `None` means the calendar cannot
    /// represent it.
    fn date(&self, year: i32, month: u32, day: u32) -> Option<NaiveDate>;

    /// Position of `weekday` within the locale's week (0 = first weekday).
    fn weekday_index(&self, weekday: Weekday) -> u32 {
        (weekday.num_days_from_monday() + 7 - self.first_weekday().num_days_from_monday()) % 7
    }

    /// `date + days`, materialized through this calendar.
    fn add_days(&self, date: NaiveDate, days: u64) -> Option<NaiveDate> {
        let shifted = date.checked_add_days(Days::new(days))?;
        self.date(shifted.year(), shifted.month(), shifted.day())
    }

    /// Day `day` of the given month, clipped to the month's length.
    fn clipped(&self, year: i32, month: u32, day: u32) -> Option<NaiveDate> {
        let len = self.days_in_month(year, month)?;
        self.date(year, month, day.min(len))
    }
}

/// Shift a (year, month) pair by `months`, carrying into the year.
pub fn shift_month(year: i32, month: u32, months: i64) -> Option<(i32, u32)> {
    let index = i64::from(year) * 12 + i64::from(month) - 1 + months;
    let y = i32::try_from(index.div_euclid(12)).ok()?;
    let m = u32::try_from(index.rem_euclid(12) + 1).ok()?;
    Some((y, m))
}

/// Proleptic Gregorian calendar with a configurable first weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gregorian {
    first_weekday: Weekday,
}

impl Gregorian {
    pub fn new(first_weekday: Weekday) -> Self {
        Self { first_weekday }
    }

    /// Build from the `[calendar]` config section. Unknown weekday names
    /// fall back to Sunday; `Config::validate` reports them.
    pub fn from_config(config: &CalendarConfig) -> Self {
        Self::new(config.first_weekday().unwrap_or(Weekday::Sun))
    }
}

impl Default for Gregorian {
    fn default() -> Self {
        Self::new(Weekday::Sun)
    }
}

impl Calendar for Gregorian {
    fn first_weekday(&self) -> Weekday {
        self.first_weekday
    }

    fn days_in_month(&self, year: i32, month: u32) -> Option<u32> {
        if !(1..=12).contains(&month) {
            return None;
        }
        let (next_year, next_month) = if month == 12 {
            (year.checked_add(1)?, 1)
        } else {
            (year, month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)?
            .pred_opt()
            .map(|d| d.day())
    }

    fn date(&self, year: i32, month: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, month, day)
    }
}
