//! Recurrence rule model.
//!
//! Each frequency carries exactly the selectors that mean something for it,
//! so "not applicable" and "applicable but empty" cannot be confused.  Rules
//! are validated on construction and immutable afterwards; editing a rule
//! means building a new one.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::columns::RuleColumns;
use crate::error::RuleError;

/// Weekdays in Sunday-first order, matching the persisted weekday codes.
pub(crate) const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Selector building blocks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A set of weekdays, stored as a bitmask keyed by days-from-Sunday.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Weekdays(u8);

impl Weekdays {
    pub const EMPTY: Weekdays = Weekdays(0);

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_sunday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in Sunday-first order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.iter().copied().filter(move |d| self.contains(*d))
    }
}

impl FromIterator<Weekday> for Weekdays {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Weekdays::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl fmt::Debug for Weekdays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Which occurrence of a weekday within a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ordinal {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl Ordinal {
    /// Zero-based week offset for the counted ordinals; `None` for `Last`.
    pub fn week_offset(self) -> Option<u32> {
        match self {
            Self::First => Some(0),
            Self::Second => Some(1),
            Self::Third => Some(2),
            Self::Fourth => Some(3),
            Self::Last => None,
        }
    }
}

impl FromStr for Ordinal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "1" | "1st" => Ok(Self::First),
            "second" | "2" | "2nd" => Ok(Self::Second),
            "third" | "3" | "3rd" => Ok(Self::Third),
            "fourth" | "4" | "4th" => Ok(Self::Fourth),
            "last" | "-1" => Ok(Self::Last),
            other => Err(format!("unknown ordinal '{other}'")),
        }
    }
}

/// "third Monday", "last Friday" and the like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrdinalWeekday {
    pub ordinal: Ordinal,
    pub weekday: Weekday,
}

impl OrdinalWeekday {
    pub fn new(ordinal: Ordinal, weekday: Weekday) -> Self {
        Self { ordinal, weekday }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Per-frequency patterns
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeeklyPattern {
    /// Same weekday as the previous occurrence, every `interval` weeks.
    EveryNWeeks,
    OnDays(Weekdays),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthlyPattern {
    /// Same day of month as the previous occurrence, clipped to month length.
    SameDay,
    OnDays(BTreeSet<u32>),
    OnThe(OrdinalWeekday),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearlyPattern {
    /// Same month and day as the previous occurrence, clipped (Feb 29 → Feb 28).
    SameDate,
    /// The first day of each selected month.
    InMonths(BTreeSet<u32>),
    OnThe {
        months: BTreeSet<u32>,
        selector: OrdinalWeekday,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Daily,
    Weekly(WeeklyPattern),
    Monthly(MonthlyPattern),
    Yearly(YearlyPattern),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "yearly" | "year" | "annually" => Ok(Self::Yearly),
            other => Err(format!("unknown frequency '{other}'")),
        }
    }
}

/// When a series stops producing occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndCondition {
    #[default]
    Never,
    /// No occurrence after this date (inclusive bound).
    OnDate(NaiveDate),
    /// Stop after this many posted occurrences. Skips do not count.
    AfterOccurrences(u32),
}

impl EndCondition {
    /// Whether `candidate` may still occur once `consumed` occurrences have
    /// been used up.
    pub fn admits(&self, consumed: u32, candidate: NaiveDate) -> bool {
        match *self {
            Self::Never => true,
            Self::OnDate(end) => candidate <= end,
            Self::AfterOccurrences(n) => consumed < n,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RecurrenceRule
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A validated recurrence rule. Serializes through [`RuleColumns`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RuleColumns", into = "RuleColumns")]
pub struct RecurrenceRule {
    pattern: Pattern,
    interval: u32,
    end: EndCondition,
}

impl RecurrenceRule {
    pub fn new(pattern: Pattern, interval: u32, end: EndCondition) -> Result<Self, RuleError> {
        if interval < 1 {
            return Err(RuleError::InvalidInterval(interval));
        }
        validate_pattern(&pattern)?;
        if end == EndCondition::AfterOccurrences(0) {
            return Err(RuleError::ZeroOccurrences);
        }
        Ok(Self {
            pattern,
            interval,
            end,
        })
    }

    /// Construction for rules known valid at compile time (presets).
    pub(crate) fn trusted(pattern: Pattern, interval: u32) -> Self {
        debug_assert!(interval >= 1 && validate_pattern(&pattern).is_ok());
        Self {
            pattern,
            interval,
            end: EndCondition::Never,
        }
    }

    pub fn daily(interval: u32) -> Result<Self, RuleError> {
        Self::new(Pattern::Daily, interval, EndCondition::Never)
    }

    pub fn weekly(interval: u32) -> Result<Self, RuleError> {
        Self::new(
            Pattern::Weekly(WeeklyPattern::EveryNWeeks),
            interval,
            EndCondition::Never,
        )
    }

    pub fn weekly_on(
        interval: u32,
        days: impl IntoIterator<Item = Weekday>,
    ) -> Result<Self, RuleError> {
        Self::new(
            Pattern::Weekly(WeeklyPattern::OnDays(days.into_iter().collect())),
            interval,
            EndCondition::Never,
        )
    }

    pub fn monthly(interval: u32) -> Result<Self, RuleError> {
        Self::new(
            Pattern::Monthly(MonthlyPattern::SameDay),
            interval,
            EndCondition::Never,
        )
    }

    pub fn monthly_on_days(
        interval: u32,
        days: impl IntoIterator<Item = u32>,
    ) -> Result<Self, RuleError> {
        Self::new(
            Pattern::Monthly(MonthlyPattern::OnDays(days.into_iter().collect())),
            interval,
            EndCondition::Never,
        )
    }

    pub fn monthly_on_the(
        interval: u32,
        ordinal: Ordinal,
        weekday: Weekday,
    ) -> Result<Self, RuleError> {
        Self::new(
            Pattern::Monthly(MonthlyPattern::OnThe(OrdinalWeekday::new(ordinal, weekday))),
            interval,
            EndCondition::Never,
        )
    }

    pub fn yearly(interval: u32) -> Result<Self, RuleError> {
        Self::new(
            Pattern::Yearly(YearlyPattern::SameDate),
            interval,
            EndCondition::Never,
        )
    }

    pub fn yearly_in_months(
        interval: u32,
        months: impl IntoIterator<Item = u32>,
    ) -> Result<Self, RuleError> {
        Self::new(
            Pattern::Yearly(YearlyPattern::InMonths(months.into_iter().collect())),
            interval,
            EndCondition::Never,
        )
    }

    pub fn yearly_on_the(
        interval: u32,
        months: impl IntoIterator<Item = u32>,
        ordinal: Ordinal,
        weekday: Weekday,
    ) -> Result<Self, RuleError> {
        Self::new(
            Pattern::Yearly(YearlyPattern::OnThe {
                months: months.into_iter().collect(),
                selector: OrdinalWeekday::new(ordinal, weekday),
            }),
            interval,
            EndCondition::Never,
        )
    }

    /// Replace the end condition, re-validating it.
    pub fn with_end(self, end: EndCondition) -> Result<Self, RuleError> {
        Self::new(self.pattern, self.interval, end)
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn end(&self) -> EndCondition {
        self.end
    }

    pub fn frequency(&self) -> Frequency {
        match self.pattern {
            Pattern::Daily => Frequency::Daily,
            Pattern::Weekly(_) => Frequency::Weekly,
            Pattern::Monthly(_) => Frequency::Monthly,
            Pattern::Yearly(_) => Frequency::Yearly,
        }
    }
}

fn validate_pattern(pattern: &Pattern) -> Result<(), RuleError> {
    match pattern {
        Pattern::Daily | Pattern::Weekly(WeeklyPattern::EveryNWeeks) => Ok(()),
        Pattern::Weekly(WeeklyPattern::OnDays(days)) => {
            if days.is_empty() {
                return Err(RuleError::EmptySelector("weekly_days"));
            }
            Ok(())
        }
        Pattern::Monthly(MonthlyPattern::SameDay) | Pattern::Monthly(MonthlyPattern::OnThe(_)) => {
            Ok(())
        }
        Pattern::Monthly(MonthlyPattern::OnDays(days)) => {
            if days.is_empty() {
                return Err(RuleError::EmptySelector("monthly_days"));
            }
            if let Some(&bad) = days.iter().find(|d| !(1..=31).contains(*d)) {
                return Err(RuleError::DayOutOfRange(bad));
            }
            Ok(())
        }
        Pattern::Yearly(YearlyPattern::SameDate) => Ok(()),
        Pattern::Yearly(YearlyPattern::InMonths(months))
        | Pattern::Yearly(YearlyPattern::OnThe { months, .. }) => {
            if months.is_empty() {
                return Err(RuleError::EmptySelector("yearly_months"));
            }
            if let Some(&bad) = months.iter().find(|m| !(1..=12).contains(*m)) {
                return Err(RuleError::MonthOutOfRange(bad));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_rejected() {
        assert_eq!(
            RecurrenceRule::daily(0).unwrap_err(),
            RuleError::InvalidInterval(0)
        );
    }

    #[test]
    fn empty_selectors_are_rejected() {
        assert_eq!(
            RecurrenceRule::weekly_on(1, Vec::<Weekday>::new()).unwrap_err(),
            RuleError::EmptySelector("weekly_days")
        );
        assert_eq!(
            RecurrenceRule::monthly_on_days(1, Vec::<u32>::new()).unwrap_err(),
            RuleError::EmptySelector("monthly_days")
        );
        assert_eq!(
            RecurrenceRule::yearly_on_the(1, Vec::<u32>::new(), Ordinal::First, Weekday::Mon)
                .unwrap_err(),
            RuleError::EmptySelector("yearly_months")
        );
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        assert_eq!(
            RecurrenceRule::monthly_on_days(1, [0]).unwrap_err(),
            RuleError::DayOutOfRange(0)
        );
        assert_eq!(
            RecurrenceRule::monthly_on_days(1, [15, 32]).unwrap_err(),
            RuleError::DayOutOfRange(32)
        );
        assert_eq!(
            RecurrenceRule::yearly_in_months(1, [13]).unwrap_err(),
            RuleError::MonthOutOfRange(13)
        );
    }

    #[test]
    fn zero_occurrence_end_is_rejected() {
        let rule = RecurrenceRule::daily(1).unwrap();
        assert_eq!(
            rule.with_end(EndCondition::AfterOccurrences(0)).unwrap_err(),
            RuleError::ZeroOccurrences
        );
    }

    #[test]
    fn weekdays_iterate_sunday_first() {
        let set: Weekdays = [Weekday::Fri, Weekday::Sun, Weekday::Tue].into_iter().collect();
        let days: Vec<_> = set.iter().collect();
        assert_eq!(days, vec![Weekday::Sun, Weekday::Tue, Weekday::Fri]);
        assert_eq!(set.len(), 3);
        assert!(!set.contains(Weekday::Mon));
    }

    #[test]
    fn end_condition_admits() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        assert!(EndCondition::Never.admits(1_000, d(1)));
        assert!(EndCondition::OnDate(d(10)).admits(0, d(10)));
        assert!(!EndCondition::OnDate(d(10)).admits(0, d(11)));
        assert!(EndCondition::AfterOccurrences(2).admits(1, d(1)));
        assert!(!EndCondition::AfterOccurrences(2).admits(2, d(1)));
    }

    #[test]
    fn frequency_follows_pattern() {
        assert_eq!(RecurrenceRule::daily(1).unwrap().frequency(), Frequency::Daily);
        assert_eq!(
            RecurrenceRule::monthly_on_the(1, Ordinal::Last, Weekday::Fri)
                .unwrap()
                .frequency(),
            Frequency::Monthly
        );
        assert_eq!("Annually".parse::<Frequency>(), Ok(Frequency::Yearly));
    }

    #[test]
    fn ordinal_parses_words_and_codes() {
        assert_eq!("third".parse::<Ordinal>(), Ok(Ordinal::Third));
        assert_eq!("-1".parse::<Ordinal>(), Ok(Ordinal::Last));
        assert!("fifth".parse::<Ordinal>().is_err());
    }
}
