//! Named rule shortcuts.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;

use crate::rule::{MonthlyPattern, Pattern, RecurrenceRule, WeeklyPattern, YearlyPattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Daily,
    /// Monday through Friday.
    Weekdays,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Semiannually,
    Yearly,
}

impl Preset {
    pub const ALL: [Preset; 8] = [
        Self::Daily,
        Self::Weekdays,
        Self::Weekly,
        Self::Biweekly,
        Self::Monthly,
        Self::Quarterly,
        Self::Semiannually,
        Self::Yearly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekdays => "weekdays",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Semiannually => "semiannually",
            Self::Yearly => "yearly",
        }
    }

    /// The rule this preset stands for. Presets never end.
    pub fn rule(self) -> RecurrenceRule {
        let (pattern, interval) = match self {
            Self::Daily => (Pattern::Daily, 1),
            Self::Weekdays => (
                Pattern::Weekly(WeeklyPattern::OnDays(
                    [
                        Weekday::Mon,
                        Weekday::Tue,
                        Weekday::Wed,
                        Weekday::Thu,
                        Weekday::Fri,
                    ]
                    .into_iter()
                    .collect(),
                )),
                1,
            ),
            Self::Weekly => (Pattern::Weekly(WeeklyPattern::EveryNWeeks), 1),
            Self::Biweekly => (Pattern::Weekly(WeeklyPattern::EveryNWeeks), 2),
            Self::Monthly => (Pattern::Monthly(MonthlyPattern::SameDay), 1),
            Self::Quarterly => (Pattern::Monthly(MonthlyPattern::SameDay), 3),
            Self::Semiannually => (Pattern::Monthly(MonthlyPattern::SameDay), 6),
            Self::Yearly => (Pattern::Yearly(YearlyPattern::SameDate), 1),
        };
        RecurrenceRule::trusted(pattern, interval)
    }

    /// The preset whose pattern and interval equal `rule`'s, ignoring the
    /// end condition.
    pub fn matching(rule: &RecurrenceRule) -> Option<Preset> {
        Self::ALL.into_iter().find(|p| {
            let candidate = p.rule();
            candidate.pattern() == rule.pattern() && candidate.interval() == rule.interval()
        })
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekdays" | "weekday" => Ok(Self::Weekdays),
            "weekly" => Ok(Self::Weekly),
            "biweekly" | "fortnightly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "semiannually" | "semiannual" | "half-yearly" => Ok(Self::Semiannually),
            "yearly" | "annually" => Ok(Self::Yearly),
            other => Err(format!("unknown preset '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{EndCondition, Frequency};

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("BiWeekly".parse::<Preset>(), Ok(Preset::Biweekly));
        assert_eq!(" quarterly ".parse::<Preset>(), Ok(Preset::Quarterly));
        assert!("hourly".parse::<Preset>().is_err());
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for preset in Preset::ALL {
            assert_eq!(preset.to_string().parse::<Preset>(), Ok(preset));
        }
    }

    #[test]
    fn rules_have_expected_shape() {
        let quarterly = Preset::Quarterly.rule();
        assert_eq!(quarterly.frequency(), Frequency::Monthly);
        assert_eq!(quarterly.interval(), 3);
        assert_eq!(Preset::Biweekly.rule().interval(), 2);
        assert_eq!(Preset::Yearly.rule().end(), EndCondition::Never);
    }

    #[test]
    fn matching_ignores_end_condition() {
        let rule = RecurrenceRule::monthly(6)
            .unwrap()
            .with_end(EndCondition::AfterOccurrences(4))
            .unwrap();
        assert_eq!(Preset::matching(&rule), Some(Preset::Semiannually));
        assert_eq!(
            Preset::matching(&RecurrenceRule::monthly(2).unwrap()),
            None
        );
    }

    #[test]
    fn every_preset_matches_itself() {
        for preset in Preset::ALL {
            assert_eq!(Preset::matching(&preset.rule()), Some(preset));
        }
    }
}
