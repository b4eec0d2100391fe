//! Next-occurrence calculator.
//!
//! [`next_occurrence`] is a pure function of (rule, date, calendar).  It
//! returns the earliest date strictly later than `after` that satisfies the
//! rule, or `after` itself when the calendar cannot materialize a candidate.
//! That "no progress" result is the stall signal the resolver and the
//! lifecycle turn into [`ScheduleError::Stalled`](crate::ScheduleError).

use chrono::{Datelike, NaiveDate, Weekday};

use crate::calendar::{shift_month, Calendar};
use crate::rule::{
    MonthlyPattern, OrdinalWeekday, Pattern, RecurrenceRule, WeeklyPattern, Weekdays,
    YearlyPattern,
};

/// Upper bound on interval steps taken while looking for a month that
/// contains one of the selected days (e.g. day 30 never exists in February).
const MAX_MONTH_STEPS: i64 = 120;

/// Earliest date strictly later than `after` satisfying `rule`.
///
/// Returns `after` unchanged when no later date can be materialized.
pub fn next_occurrence<C: Calendar + ?Sized>(
    rule: &RecurrenceRule,
    after: NaiveDate,
    calendar: &C,
) -> NaiveDate {
    match candidate(rule, after, calendar) {
        Some(next) if next > after => next,
        _ => after,
    }
}

fn candidate<C: Calendar + ?Sized>(
    rule: &RecurrenceRule,
    after: NaiveDate,
    cal: &C,
) -> Option<NaiveDate> {
    let interval = rule.interval();
    match rule.pattern() {
        Pattern::Daily => cal.add_days(after, u64::from(interval)),
        Pattern::Weekly(WeeklyPattern::EveryNWeeks) => cal.add_days(after, 7 * u64::from(interval)),
        Pattern::Weekly(WeeklyPattern::OnDays(days)) => weekly_on_days(after, *days, interval, cal),
        Pattern::Monthly(MonthlyPattern::SameDay) => {
            let (y, m) = shift_month(after.year(), after.month(), i64::from(interval))?;
            cal.clipped(y, m, after.day())
        }
        Pattern::Monthly(MonthlyPattern::OnDays(days)) => {
            let len = cal.days_in_month(after.year(), after.month())?;
            if let Some(&day) = days.iter().find(|&&d| d > after.day() && d <= len) {
                return cal.date(after.year(), after.month(), day);
            }
            for step in 1..=MAX_MONTH_STEPS {
                let (y, m) = shift_month(after.year(), after.month(), i64::from(interval) * step)?;
                let len = cal.days_in_month(y, m)?;
                if let Some(&day) = days.iter().find(|&&d| d <= len) {
                    return cal.date(y, m, day);
                }
            }
            None
        }
        Pattern::Monthly(MonthlyPattern::OnThe(selector)) => {
            // The current month may still hold a later match.
            if let Some(date) = ordinal_weekday_in(cal, after.year(), after.month(), *selector) {
                if date > after {
                    return Some(date);
                }
            }
            let (y, m) = shift_month(after.year(), after.month(), i64::from(interval))?;
            ordinal_weekday_in(cal, y, m, *selector)
        }
        Pattern::Yearly(YearlyPattern::SameDate) => {
            let y = after.year().checked_add(i32::try_from(interval).ok()?)?;
            cal.clipped(y, after.month(), after.day())
        }
        Pattern::Yearly(YearlyPattern::InMonths(months)) => {
            if let Some(&m) = months.range(after.month() + 1..).next() {
                return cal.date(after.year(), m, 1);
            }
            let y = after.year().checked_add(i32::try_from(interval).ok()?)?;
            let first = *months.iter().next()?;
            cal.date(y, first, 1)
        }
        Pattern::Yearly(YearlyPattern::OnThe { months, selector }) => {
            // Selected months of the current year, starting with `after`'s own.
            for &m in months.range(after.month()..) {
                if let Some(date) = ordinal_weekday_in(cal, after.year(), m, *selector) {
                    if date > after {
                        return Some(date);
                    }
                }
            }
            let y = after.year().checked_add(i32::try_from(interval).ok()?)?;
            let first = *months.iter().next()?;
            ordinal_weekday_in(cal, y, first, *selector)
        }
    }
}

fn weekly_on_days<C: Calendar + ?Sized>(
    after: NaiveDate,
    days: Weekdays,
    interval: u32,
    cal: &C,
) -> Option<NaiveDate> {
    let w = cal.weekday_index(after.weekday());
    let mut selected: Vec<u32> = days.iter().map(|d| cal.weekday_index(d)).collect();
    selected.sort_unstable();

    // Same-week lookahead does not consult `interval`.
    if let Some(&s) = selected.iter().find(|&&s| s > w) {
        return cal.add_days(after, u64::from(s - w));
    }
    let first = *selected.first()?;
    let days_to_add = u64::from(7 - w + first) + u64::from(interval - 1) * 7;
    cal.add_days(after, days_to_add)
}

/// The date of `selector` ("third Monday", "last Friday") in the given month.
pub fn ordinal_weekday_in<C: Calendar + ?Sized>(
    cal: &C,
    year: i32,
    month: u32,
    selector: OrdinalWeekday,
) -> Option<NaiveDate> {
    let len = cal.days_in_month(year, month)?;
    match selector.ordinal.week_offset() {
        Some(week) => {
            let first = cal.date(year, month, 1)?;
            let offset = days_between(first.weekday(), selector.weekday);
            let day = 1 + offset + 7 * week;
            if day > len {
                return None;
            }
            cal.date(year, month, day)
        }
        None => {
            let last = cal.date(year, month, len)?;
            let back = days_between(selector.weekday, last.weekday());
            cal.date(year, month, len - back)
        }
    }
}

/// Days from `from` forward to the next `to` (0 when equal).
fn days_between(from: Weekday, to: Weekday) -> u32 {
    (7 + to.num_days_from_monday() - from.num_days_from_monday()) % 7
}

/// Whether `date` satisfies the rule's selectors.
///
/// Patterns that repeat relative to the previous occurrence (daily, every N
/// weeks, same day of month, same date each year) match any date, since the
/// first occurrence anchors them.
pub fn occurs_on<C: Calendar + ?Sized>(rule: &RecurrenceRule, date: NaiveDate, cal: &C) -> bool {
    match rule.pattern() {
        Pattern::Daily
        | Pattern::Weekly(WeeklyPattern::EveryNWeeks)
        | Pattern::Monthly(MonthlyPattern::SameDay)
        | Pattern::Yearly(YearlyPattern::SameDate) => true,
        Pattern::Weekly(WeeklyPattern::OnDays(days)) => days.contains(date.weekday()),
        Pattern::Monthly(MonthlyPattern::OnDays(days)) => days.contains(&date.day()),
        Pattern::Monthly(MonthlyPattern::OnThe(selector)) => {
            ordinal_weekday_in(cal, date.year(), date.month(), *selector) == Some(date)
        }
        Pattern::Yearly(YearlyPattern::InMonths(months)) => {
            months.contains(&date.month()) && date.day() == 1
        }
        Pattern::Yearly(YearlyPattern::OnThe { months, selector }) => {
            months.contains(&date.month())
                && ordinal_weekday_in(cal, date.year(), date.month(), *selector) == Some(date)
        }
    }
}

/// Successive occurrences strictly after a starting date.
///
/// Unbounded unless the rule stalls; pair with `take`.  End conditions are
/// not applied here because they depend on schedule state.
pub struct Occurrences<'a, C: ?Sized> {
    rule: &'a RecurrenceRule,
    calendar: &'a C,
    cursor: Option<NaiveDate>,
}

impl<'a, C: Calendar + ?Sized> Occurrences<'a, C> {
    pub fn after(rule: &'a RecurrenceRule, after: NaiveDate, calendar: &'a C) -> Self {
        Self {
            rule,
            calendar,
            cursor: Some(after),
        }
    }
}

impl<C: Calendar + ?Sized> Iterator for Occurrences<'_, C> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.cursor?;
        let next = next_occurrence(self.rule, current, self.calendar);
        if next <= current {
            self.cursor = None;
            return None;
        }
        self.cursor = Some(next);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Gregorian;
    use crate::rule::Ordinal;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Gregorian, except February cannot be materialized.
    struct NoFebruary;

    impl Calendar for NoFebruary {
        fn first_weekday(&self) -> Weekday {
            Weekday::Sun
        }
        fn days_in_month(&self, year: i32, month: u32) -> Option<u32> {
            Gregorian::default().days_in_month(year, month)
        }
        fn date(&self, year: i32, month: u32, day: u32) -> Option<NaiveDate> {
            if month == 2 {
                None
            } else {
                NaiveDate::from_ymd_opt(year, month, day)
            }
        }
    }

    #[test]
    fn daily_interval_three() {
        let rule = RecurrenceRule::daily(3).unwrap();
        assert_eq!(next_occurrence(&rule, d(2025, 2, 27), &Gregorian::default()), d(2025, 3, 2));
    }

    #[test]
    fn weekly_with_days_skips_interval_weeks_after_boundary() {
        let cal = Gregorian::default();
        let rule = RecurrenceRule::weekly_on(2, [Weekday::Mon, Weekday::Wed]).unwrap();
        // Wed Jan 15 → later in week: none (Thu..Sat unselected) → Mon Jan 27.
        assert_eq!(next_occurrence(&rule, d(2025, 1, 15), &cal), d(2025, 1, 27));
        // Mon Jan 13 → Wed Jan 15 in the same week.
        assert_eq!(next_occurrence(&rule, d(2025, 1, 13), &cal), d(2025, 1, 15));
    }

    #[test]
    fn weekly_same_week_lookahead_ignores_interval() {
        let rule = RecurrenceRule::weekly_on(3, [Weekday::Tue, Weekday::Sat]).unwrap();
        assert_eq!(
            next_occurrence(&rule, d(2025, 1, 14), &Gregorian::default()),
            d(2025, 1, 18)
        );
    }

    #[test]
    fn weekly_week_boundary_depends_on_first_weekday() {
        let rule = RecurrenceRule::weekly_on(2, [Weekday::Sun]).unwrap();
        let friday = d(2025, 1, 17);
        // Sunday-first: Sunday starts the next week, so one extra week is skipped.
        assert_eq!(
            next_occurrence(&rule, friday, &Gregorian::new(Weekday::Sun)),
            d(2025, 1, 26)
        );
        // Monday-first: Sunday is later in the current week.
        assert_eq!(
            next_occurrence(&rule, friday, &Gregorian::new(Weekday::Mon)),
            d(2025, 1, 19)
        );
    }

    #[test]
    fn monthly_same_day_clips_to_month_length() {
        let cal = Gregorian::default();
        let rule = RecurrenceRule::monthly(1).unwrap();
        assert_eq!(next_occurrence(&rule, d(2025, 1, 31), &cal), d(2025, 2, 28));
        assert_eq!(next_occurrence(&rule, d(2024, 1, 31), &cal), d(2024, 2, 29));
        let quarterly = RecurrenceRule::monthly(3).unwrap();
        assert_eq!(next_occurrence(&quarterly, d(2025, 11, 30), &cal), d(2026, 2, 28));
    }

    #[test]
    fn monthly_days_prefers_later_day_this_month() {
        let cal = Gregorian::default();
        let rule = RecurrenceRule::monthly_on_days(1, [1, 15]).unwrap();
        assert_eq!(next_occurrence(&rule, d(2025, 1, 10), &cal), d(2025, 1, 15));
        assert_eq!(next_occurrence(&rule, d(2025, 1, 15), &cal), d(2025, 2, 1));
    }

    #[test]
    fn monthly_days_passes_over_months_without_the_day() {
        let cal = Gregorian::default();
        let rule = RecurrenceRule::monthly_on_days(1, [31]).unwrap();
        assert_eq!(next_occurrence(&rule, d(2025, 3, 31), &cal), d(2025, 5, 31));
        let leap = RecurrenceRule::monthly_on_days(12, [29]).unwrap();
        assert_eq!(next_occurrence(&leap, d(2024, 2, 29), &cal), d(2028, 2, 29));
    }

    #[test]
    fn monthly_days_that_never_exist_stall() {
        let rule = RecurrenceRule::monthly_on_days(12, [30]).unwrap();
        let after = d(2025, 2, 1);
        assert_eq!(next_occurrence(&rule, after, &Gregorian::default()), after);
    }

    #[test]
    fn monthly_on_the_advances_when_this_months_match_has_passed() {
        let cal = Gregorian::default();
        let third_monday = RecurrenceRule::monthly_on_the(1, Ordinal::Third, Weekday::Mon).unwrap();
        assert_eq!(next_occurrence(&third_monday, d(2025, 1, 20), &cal), d(2025, 2, 17));

        let every_other = RecurrenceRule::monthly_on_the(2, Ordinal::Third, Weekday::Mon).unwrap();
        assert_eq!(next_occurrence(&every_other, d(2025, 1, 25), &cal), d(2025, 3, 17));
    }

    #[test]
    fn monthly_last_friday() {
        let cal = Gregorian::default();
        let rule = RecurrenceRule::monthly_on_the(1, Ordinal::Last, Weekday::Fri).unwrap();
        assert_eq!(next_occurrence(&rule, d(2025, 1, 1), &cal), d(2025, 1, 31));
        assert_eq!(next_occurrence(&rule, d(2025, 1, 31), &cal), d(2025, 2, 28));
    }

    #[test]
    fn ordinal_weekday_resolution() {
        let cal = Gregorian::default();
        let first_sat = OrdinalWeekday::new(Ordinal::First, Weekday::Sat);
        assert_eq!(ordinal_weekday_in(&cal, 2025, 2, first_sat), Some(d(2025, 2, 1)));
        let fourth_thu = OrdinalWeekday::new(Ordinal::Fourth, Weekday::Thu);
        assert_eq!(ordinal_weekday_in(&cal, 2025, 11, fourth_thu), Some(d(2025, 11, 27)));
        let last_sun = OrdinalWeekday::new(Ordinal::Last, Weekday::Sun);
        assert_eq!(ordinal_weekday_in(&cal, 2025, 3, last_sun), Some(d(2025, 3, 30)));
    }

    #[test]
    fn yearly_in_months_uses_first_of_month() {
        let cal = Gregorian::default();
        let rule = RecurrenceRule::yearly_in_months(1, [3, 9]).unwrap();
        assert_eq!(next_occurrence(&rule, d(2025, 1, 15), &cal), d(2025, 3, 1));
        assert_eq!(next_occurrence(&rule, d(2025, 3, 1), &cal), d(2025, 9, 1));
        assert_eq!(next_occurrence(&rule, d(2025, 9, 1), &cal), d(2026, 3, 1));

        let biennial = RecurrenceRule::yearly_in_months(2, [3, 9]).unwrap();
        assert_eq!(next_occurrence(&biennial, d(2025, 9, 1), &cal), d(2027, 3, 1));
    }

    #[test]
    fn yearly_on_the_scans_remaining_months_then_next_cycle() {
        let cal = Gregorian::default();
        let rule = RecurrenceRule::yearly_on_the(1, [1, 3], Ordinal::Third, Weekday::Sun).unwrap();
        assert_eq!(next_occurrence(&rule, d(2025, 1, 19), &cal), d(2025, 3, 16));
        assert_eq!(next_occurrence(&rule, d(2025, 3, 20), &cal), d(2026, 1, 18));
    }

    #[test]
    fn yearly_same_date_every_two_years() {
        let rule = RecurrenceRule::yearly(2).unwrap();
        assert_eq!(
            next_occurrence(&rule, d(2025, 7, 4), &Gregorian::default()),
            d(2027, 7, 4)
        );
    }

    #[test]
    fn unmaterializable_dates_return_after() {
        let rule = RecurrenceRule::daily(1).unwrap();
        assert_eq!(next_occurrence(&rule, d(2025, 1, 31), &NoFebruary), d(2025, 1, 31));
        assert_eq!(next_occurrence(&rule, NaiveDate::MAX, &Gregorian::default()), NaiveDate::MAX);
    }

    #[test]
    fn occurs_on_matches_selectors() {
        let cal = Gregorian::default();
        let weekly = RecurrenceRule::weekly_on(1, [Weekday::Mon]).unwrap();
        assert!(occurs_on(&weekly, d(2025, 1, 20), &cal));
        assert!(!occurs_on(&weekly, d(2025, 1, 21), &cal));

        let monthly = RecurrenceRule::monthly_on_the(1, Ordinal::Last, Weekday::Fri).unwrap();
        assert!(occurs_on(&monthly, d(2025, 1, 31), &cal));
        assert!(!occurs_on(&monthly, d(2025, 1, 24), &cal));

        let yearly = RecurrenceRule::yearly_in_months(1, [6]).unwrap();
        assert!(occurs_on(&yearly, d(2025, 6, 1), &cal));
        assert!(!occurs_on(&yearly, d(2025, 6, 2), &cal));

        assert!(occurs_on(&RecurrenceRule::monthly(1).unwrap(), d(2025, 6, 17), &cal));
    }

    #[test]
    fn occurrences_iterates_and_stops_on_stall() {
        let cal = Gregorian::default();
        let rule = RecurrenceRule::monthly_on_days(1, [1, 15]).unwrap();
        let dates: Vec<_> = Occurrences::after(&rule, d(2025, 1, 1), &cal).take(4).collect();
        assert_eq!(
            dates,
            vec![d(2025, 1, 15), d(2025, 2, 1), d(2025, 2, 15), d(2025, 3, 1)]
        );

        let daily = RecurrenceRule::daily(1).unwrap();
        let stalled: Vec<_> = Occurrences::after(&daily, d(2025, 1, 30), &NoFebruary)
            .take(5)
            .collect();
        assert_eq!(stalled, vec![d(2025, 1, 31)]);
    }
}
