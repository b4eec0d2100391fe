//! Flattened scalar form of a rule, matching the persisted field contract:
//! integer codes, comma-separated integer lists for selector sets, and
//! `[year, month, day]` triples for dates.
//!
//! | column                       | codes                                        |
//! |------------------------------|----------------------------------------------|
//! | `frequency`                  | 0 daily, 1 weekly, 2 monthly, 3 yearly       |
//! | `monthly_mode`               | 0 each, 1 on-the                             |
//! | `*_weekday`, `weekly_days`   | 1 Sunday … 7 Saturday                        |
//! | `*_ordinal`                  | 1..=4, -1 last                               |
//! | `end_mode`                   | 0 never, 1 on date, 2 after occurrences      |

use std::collections::BTreeSet;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::rule::{
    EndCondition, MonthlyPattern, Ordinal, OrdinalWeekday, Pattern, RecurrenceRule, WeeklyPattern,
    Weekdays, YearlyPattern, WEEK,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleColumns {
    pub frequency: u8,
    pub interval: u32,
    pub weekly_days: String,
    pub monthly_mode: u8,
    pub monthly_days: String,
    pub monthly_ordinal: Option<i8>,
    pub monthly_weekday: Option<u8>,
    pub yearly_months: String,
    pub yearly_days_of_week_enabled: bool,
    pub yearly_ordinal: Option<i8>,
    pub yearly_weekday: Option<u8>,
    pub end_mode: u8,
    #[serde(with = "ymd::option")]
    pub end_date: Option<NaiveDate>,
    pub end_after_occurrences: Option<u32>,
}

impl Default for RuleColumns {
    fn default() -> Self {
        Self {
            frequency: 0,
            interval: 1,
            weekly_days: String::new(),
            monthly_mode: 0,
            monthly_days: String::new(),
            monthly_ordinal: None,
            monthly_weekday: None,
            yearly_months: String::new(),
            yearly_days_of_week_enabled: false,
            yearly_ordinal: None,
            yearly_weekday: None,
            end_mode: 0,
            end_date: None,
            end_after_occurrences: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Code tables
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn weekday_code(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8 + 1
}

pub fn weekday_from_code(code: u8) -> Option<Weekday> {
    WEEK.get(usize::from(code).checked_sub(1)?).copied()
}

pub fn ordinal_code(ordinal: Ordinal) -> i8 {
    match ordinal {
        Ordinal::First => 1,
        Ordinal::Second => 2,
        Ordinal::Third => 3,
        Ordinal::Fourth => 4,
        Ordinal::Last => -1,
    }
}

pub fn ordinal_from_code(code: i8) -> Option<Ordinal> {
    match code {
        1 => Some(Ordinal::First),
        2 => Some(Ordinal::Second),
        3 => Some(Ordinal::Third),
        4 => Some(Ordinal::Fourth),
        -1 => Some(Ordinal::Last),
        _ => None,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Decoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl TryFrom<RuleColumns> for RecurrenceRule {
    type Error = RuleError;

    fn try_from(c: RuleColumns) -> Result<Self, Self::Error> {
        let pattern = match c.frequency {
            0 => Pattern::Daily,
            1 => {
                let days = parse_weekdays(&c.weekly_days)?;
                if days.is_empty() {
                    Pattern::Weekly(WeeklyPattern::EveryNWeeks)
                } else {
                    Pattern::Weekly(WeeklyPattern::OnDays(days))
                }
            }
            2 => match c.monthly_mode {
                0 => {
                    let days = parse_list(&c.monthly_days, "monthly_days")?;
                    if days.is_empty() {
                        Pattern::Monthly(MonthlyPattern::SameDay)
                    } else {
                        Pattern::Monthly(MonthlyPattern::OnDays(days))
                    }
                }
                1 => Pattern::Monthly(MonthlyPattern::OnThe(selector(
                    c.monthly_ordinal,
                    c.monthly_weekday,
                    ("monthly_ordinal", "monthly_weekday"),
                )?)),
                code => {
                    return Err(RuleError::UnknownCode {
                        field: "monthly_mode",
                        code: i64::from(code),
                    })
                }
            },
            3 => {
                let months = parse_list(&c.yearly_months, "yearly_months")?;
                if c.yearly_days_of_week_enabled {
                    Pattern::Yearly(YearlyPattern::OnThe {
                        months,
                        selector: selector(
                            c.yearly_ordinal,
                            c.yearly_weekday,
                            ("yearly_ordinal", "yearly_weekday"),
                        )?,
                    })
                } else if months.is_empty() {
                    Pattern::Yearly(YearlyPattern::SameDate)
                } else {
                    Pattern::Yearly(YearlyPattern::InMonths(months))
                }
            }
            code => {
                return Err(RuleError::UnknownCode {
                    field: "frequency",
                    code: i64::from(code),
                })
            }
        };

        let end = match c.end_mode {
            0 => EndCondition::Never,
            1 => EndCondition::OnDate(c.end_date.ok_or(RuleError::MissingField("end_date"))?),
            2 => EndCondition::AfterOccurrences(
                c.end_after_occurrences
                    .ok_or(RuleError::MissingField("end_after_occurrences"))?,
            ),
            code => {
                return Err(RuleError::UnknownCode {
                    field: "end_mode",
                    code: i64::from(code),
                })
            }
        };

        RecurrenceRule::new(pattern, c.interval, end)
    }
}

fn parse_list(raw: &str, field: &'static str) -> Result<BTreeSet<u32>, RuleError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().map_err(|_| RuleError::MalformedList {
                field,
                value: s.to_string(),
            })
        })
        .collect()
}

fn parse_weekdays(raw: &str) -> Result<Weekdays, RuleError> {
    let mut days = Weekdays::EMPTY;
    for s in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let code: i64 = s.parse().map_err(|_| RuleError::MalformedList {
            field: "weekly_days",
            value: s.to_string(),
        })?;
        let day = u8::try_from(code)
            .ok()
            .and_then(weekday_from_code)
            .ok_or(RuleError::WeekdayOutOfRange(code))?;
        days.insert(day);
    }
    Ok(days)
}

fn selector(
    ordinal: Option<i8>,
    weekday: Option<u8>,
    (ordinal_field, weekday_field): (&'static str, &'static str),
) -> Result<OrdinalWeekday, RuleError> {
    let ordinal_code = ordinal.ok_or(RuleError::MissingField(ordinal_field))?;
    let weekday_code = weekday.ok_or(RuleError::MissingField(weekday_field))?;
    let ordinal = ordinal_from_code(ordinal_code)
        .ok_or(RuleError::OrdinalOutOfRange(i64::from(ordinal_code)))?;
    let weekday = weekday_from_code(weekday_code)
        .ok_or(RuleError::WeekdayOutOfRange(i64::from(weekday_code)))?;
    Ok(OrdinalWeekday::new(ordinal, weekday))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Encoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl From<RecurrenceRule> for RuleColumns {
    fn from(rule: RecurrenceRule) -> Self {
        let mut c = RuleColumns {
            interval: rule.interval(),
            ..Default::default()
        };
        match rule.pattern() {
            Pattern::Daily => c.frequency = 0,
            Pattern::Weekly(weekly) => {
                c.frequency = 1;
                if let WeeklyPattern::OnDays(days) = weekly {
                    c.weekly_days = join(days.iter().map(weekday_code));
                }
            }
            Pattern::Monthly(monthly) => {
                c.frequency = 2;
                match monthly {
                    MonthlyPattern::SameDay => {}
                    MonthlyPattern::OnDays(days) => c.monthly_days = join(days.iter()),
                    MonthlyPattern::OnThe(sel) => {
                        c.monthly_mode = 1;
                        c.monthly_ordinal = Some(ordinal_code(sel.ordinal));
                        c.monthly_weekday = Some(weekday_code(sel.weekday));
                    }
                }
            }
            Pattern::Yearly(yearly) => {
                c.frequency = 3;
                match yearly {
                    YearlyPattern::SameDate => {}
                    YearlyPattern::InMonths(months) => c.yearly_months = join(months.iter()),
                    YearlyPattern::OnThe { months, selector } => {
                        c.yearly_months = join(months.iter());
                        c.yearly_days_of_week_enabled = true;
                        c.yearly_ordinal = Some(ordinal_code(selector.ordinal));
                        c.yearly_weekday = Some(weekday_code(selector.weekday));
                    }
                }
            }
        }
        match rule.end() {
            EndCondition::Never => {}
            EndCondition::OnDate(date) => {
                c.end_mode = 1;
                c.end_date = Some(date);
            }
            EndCondition::AfterOccurrences(n) => {
                c.end_mode = 2;
                c.end_after_occurrences = Some(n);
            }
        }
        c
    }
}

fn join<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Date triples
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `#[serde(with = "ymd")]`: a `NaiveDate` as `[year, month, day]`.
pub mod ymd {
    use chrono::{Datelike, NaiveDate};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        (date.year(), date.month(), date.day()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let (y, m, day) = <(i32, u32, u32)>::deserialize(d)?;
        NaiveDate::from_ymd_opt(y, m, day)
            .ok_or_else(|| D::Error::custom(format!("invalid date [{y}, {m}, {day}]")))
    }

    pub mod option {
        use chrono::{Datelike, NaiveDate};
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
            date.map(|d| (d.year(), d.month(), d.day())).serialize(s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
            match Option::<(i32, u32, u32)>::deserialize(d)? {
                None => Ok(None),
                Some((y, m, day)) => NaiveDate::from_ymd_opt(y, m, day)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid date [{y}, {m}, {day}]"))),
            }
        }
    }
}
