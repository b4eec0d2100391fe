use anyhow::{bail, Context};
use chrono::{NaiveDate, Weekday};
use clap::Args;

use rc_schedule::{EndCondition, Frequency, Ordinal, Preset, RecurrenceRule};

/// Rule flags shared by `add` and `preview`.
#[derive(Debug, Clone, Default, Args)]
pub struct RuleArgs {
    /// Named preset (see `recurra presets`).
    #[arg(
        long,
        conflicts_with_all = [
            "frequency", "interval", "weekdays", "month_days", "ordinal", "weekday", "months",
        ]
    )]
    pub preset: Option<Preset>,

    /// daily, weekly, monthly or yearly.
    #[arg(long)]
    pub frequency: Option<Frequency>,

    /// Repeat every N periods [default: 1].
    #[arg(long)]
    pub interval: Option<u32>,

    /// Weekly: comma-separated weekdays, e.g. "mon,thu".
    #[arg(long, value_delimiter = ',')]
    pub weekdays: Vec<Weekday>,

    /// Monthly: comma-separated days of the month, e.g. "1,15".
    #[arg(long, value_delimiter = ',', conflicts_with = "ordinal")]
    pub month_days: Vec<u32>,

    /// Monthly/yearly: first, second, third, fourth or last.
    #[arg(long, requires = "weekday")]
    pub ordinal: Option<Ordinal>,

    /// Monthly/yearly: weekday paired with --ordinal.
    #[arg(long, requires = "ordinal")]
    pub weekday: Option<Weekday>,

    /// Yearly: comma-separated months 1-12.
    #[arg(long, value_delimiter = ',')]
    pub months: Vec<u32>,

    /// No occurrence after this date.
    #[arg(long, conflicts_with = "count")]
    pub until: Option<NaiveDate>,

    /// Stop after this many posted occurrences.
    #[arg(long)]
    pub count: Option<u32>,
}

impl RuleArgs {
    pub fn to_rule(&self) -> anyhow::Result<RecurrenceRule> {
        let base = match (self.preset, self.frequency) {
            (Some(preset), None) => {
                if let Some(flag) = self.shape_flags().first() {
                    bail!("{flag} cannot be combined with --preset {preset}");
                }
                preset.rule()
            }
            (Some(_), Some(_)) => bail!("--preset and --frequency are mutually exclusive"),
            (None, Some(frequency)) => self.custom(frequency)?,
            (None, None) => bail!("either --preset or --frequency is required"),
        };
        let end = match (self.until, self.count) {
            (Some(date), _) => EndCondition::OnDate(date),
            (None, Some(n)) => EndCondition::AfterOccurrences(n),
            (None, None) => EndCondition::Never,
        };
        Ok(base.with_end(end)?)
    }

    /// Flags that shape the pattern, in declaration order.
    fn shape_flags(&self) -> Vec<&'static str> {
        [
            ("--interval", self.interval.is_some()),
            ("--weekdays", !self.weekdays.is_empty()),
            ("--month-days", !self.month_days.is_empty()),
            ("--ordinal", self.ordinal.is_some()),
            ("--weekday", self.weekday.is_some()),
            ("--months", !self.months.is_empty()),
        ]
        .into_iter()
        .filter_map(|(flag, given)| given.then_some(flag))
        .collect()
    }

    /// Fail on selector flags that `frequency` has no use for.
    fn reject_unused(&self, frequency: Frequency) -> anyhow::Result<()> {
        let selects_weekday = self.ordinal.is_some() || self.weekday.is_some();
        let checks = [
            ("--weekdays", !self.weekdays.is_empty(), frequency == Frequency::Weekly),
            ("--month-days", !self.month_days.is_empty(), frequency == Frequency::Monthly),
            (
                "--ordinal/--weekday",
                selects_weekday,
                matches!(frequency, Frequency::Monthly | Frequency::Yearly),
            ),
            ("--months", !self.months.is_empty(), frequency == Frequency::Yearly),
        ];
        for (flag, given, applies) in checks {
            if given && !applies {
                bail!("{flag} does not apply to a {frequency} rule");
            }
        }
        if !self.month_days.is_empty() && selects_weekday {
            bail!("--month-days cannot be combined with --ordinal/--weekday");
        }
        Ok(())
    }

    fn custom(&self, frequency: Frequency) -> anyhow::Result<RecurrenceRule> {
        self.reject_unused(frequency)?;
        let interval = self.interval.unwrap_or(1);
        let selector = self.ordinal.zip(self.weekday);
        let rule = match frequency {
            Frequency::Daily => RecurrenceRule::daily(interval),
            Frequency::Weekly if self.weekdays.is_empty() => RecurrenceRule::weekly(interval),
            Frequency::Weekly => RecurrenceRule::weekly_on(interval, self.weekdays.iter().copied()),
            Frequency::Monthly => match selector {
                Some((ordinal, weekday)) => {
                    RecurrenceRule::monthly_on_the(interval, ordinal, weekday)
                }
                None if self.month_days.is_empty() => RecurrenceRule::monthly(interval),
                None => RecurrenceRule::monthly_on_days(interval, self.month_days.iter().copied()),
            },
            Frequency::Yearly => match selector {
                Some((ordinal, weekday)) => RecurrenceRule::yearly_on_the(
                    interval,
                    self.months.iter().copied(),
                    ordinal,
                    weekday,
                ),
                None if self.months.is_empty() => RecurrenceRule::yearly(interval),
                None => RecurrenceRule::yearly_in_months(interval, self.months.iter().copied()),
            },
        };
        rule.with_context(|| format!("invalid {frequency} rule"))
    }
}

/// Parse a major-unit decimal amount ("19.99", "-5", "1200.5") into minor units.
pub fn parse_amount(raw: &str) -> Result<i64, String> {
    let s = raw.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("invalid amount '{raw}'"));
    }
    if frac.len() > 2 || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid amount '{raw}' (use up to two decimals)"));
    }
    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| format!("amount '{raw}' out of range"))?
    };
    let cents: i64 = format!("{frac:0<2}")
        .parse()
        .map_err(|_| format!("invalid amount '{raw}'"))?;
    let minor = whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(cents))
        .ok_or_else(|| format!("amount '{raw}' out of range"))?;
    Ok(if negative { -minor } else { minor })
}

/// Render minor units as a major-unit decimal.
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use rc_schedule::{MonthlyPattern, OrdinalWeekday, Pattern};

    fn preview_rule(args: &[&str]) -> anyhow::Result<RecurrenceRule> {
        let mut argv = vec!["recurra", "preview", "--from", "2025-01-01"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv)?.command {
            Command::Preview { rule, .. } => rule.to_rule(),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn preset_with_count() {
        let rule = preview_rule(&["--preset", "biweekly", "--count", "3"]).unwrap();
        assert_eq!(rule.interval(), 2);
        assert_eq!(rule.end(), EndCondition::AfterOccurrences(3));
    }

    #[test]
    fn weekly_days_from_names() {
        let rule = preview_rule(&["--frequency", "weekly", "--weekdays", "mon,thu"]).unwrap();
        assert_eq!(
            rule,
            RecurrenceRule::weekly_on(1, [Weekday::Mon, Weekday::Thu]).unwrap()
        );
    }

    #[test]
    fn monthly_ordinal_weekday() {
        let rule = preview_rule(&[
            "--frequency", "monthly", "--ordinal", "last", "--weekday", "fri",
        ])
        .unwrap();
        assert_eq!(
            rule.pattern(),
            &Pattern::Monthly(MonthlyPattern::OnThe(OrdinalWeekday::new(
                Ordinal::Last,
                Weekday::Fri
            )))
        );
    }

    #[test]
    fn yearly_weekday_mode_needs_months() {
        let err = preview_rule(&[
            "--frequency", "yearly", "--ordinal", "first", "--weekday", "mon",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("yearly"));
    }

    #[test]
    fn missing_frequency_is_an_error() {
        assert!(preview_rule(&[]).is_err());
    }

    #[test]
    fn ordinal_without_weekday_is_rejected_by_parser() {
        assert!(preview_rule(&["--frequency", "monthly", "--ordinal", "first"]).is_err());
    }

    #[test]
    fn preset_rejects_interval_and_selectors() {
        assert!(preview_rule(&["--preset", "weekly", "--interval", "3"]).is_err());
        assert!(preview_rule(&["--preset", "monthly", "--month-days", "1,15"]).is_err());
        assert!(preview_rule(&["--preset", "weekly", "--weekdays", "mon"]).is_err());
    }

    #[test]
    fn preset_rejects_interval_set_in_code() {
        let args = RuleArgs {
            preset: Some(Preset::Weekly),
            interval: Some(3),
            ..RuleArgs::default()
        };
        let err = args.to_rule().unwrap_err();
        assert!(err.to_string().contains("--interval"));
    }

    #[test]
    fn interval_defaults_to_one_and_applies_to_custom_rules() {
        assert_eq!(preview_rule(&["--frequency", "weekly"]).unwrap().interval(), 1);
        let rule = preview_rule(&["--frequency", "weekly", "--interval", "3"]).unwrap();
        assert_eq!(rule, RecurrenceRule::weekly(3).unwrap());
    }

    #[test]
    fn selectors_for_another_frequency_are_rejected() {
        let err = preview_rule(&["--frequency", "daily", "--weekdays", "mon"]).unwrap_err();
        assert!(err.to_string().contains("--weekdays"));
        assert!(preview_rule(&["--frequency", "weekly", "--month-days", "1"]).is_err());
        assert!(preview_rule(&["--frequency", "monthly", "--months", "3"]).is_err());
        assert!(preview_rule(&[
            "--frequency", "weekly", "--ordinal", "first", "--weekday", "mon",
        ])
        .is_err());
    }

    #[test]
    fn month_days_conflict_with_ordinal_weekday() {
        assert!(preview_rule(&[
            "--frequency", "monthly", "--month-days", "1", "--ordinal", "last", "--weekday", "fri",
        ])
        .is_err());
        let args = RuleArgs {
            frequency: Some(Frequency::Monthly),
            month_days: vec![1],
            ordinal: Some(Ordinal::Last),
            weekday: Some(Weekday::Fri),
            ..RuleArgs::default()
        };
        assert!(args.to_rule().is_err());
    }

    #[test]
    fn yearly_months_work_in_both_modes() {
        assert!(preview_rule(&["--frequency", "yearly", "--months", "1,7"]).is_ok());
        assert!(preview_rule(&[
            "--frequency", "yearly", "--months", "11", "--ordinal", "fourth", "--weekday", "thu",
        ])
        .is_ok());
    }

    #[test]
    fn amounts_parse_to_minor_units() {
        assert_eq!(parse_amount("19.99"), Ok(1_999));
        assert_eq!(parse_amount("1200"), Ok(120_000));
        assert_eq!(parse_amount("-5.5"), Ok(-550));
        assert_eq!(parse_amount(".75"), Ok(75));
        assert!(parse_amount("1.234").is_err());
        assert!(parse_amount("12a").is_err());
        assert!(parse_amount("-").is_err());
    }

    #[test]
    fn amounts_format_with_two_decimals() {
        assert_eq!(format_amount(1_999), "19.99");
        assert_eq!(format_amount(-550), "-5.50");
        assert_eq!(format_amount(7), "0.07");
    }
}
