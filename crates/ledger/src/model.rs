//! Ledger data model: templates and posted records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rc_schedule::columns::ymd;
use rc_schedule::{RecurrenceRule, Schedule};

/// Direction of money flow for a template.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    #[default]
    Expense,
    Income,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Expense => "expense",
            Self::Income => "income",
        })
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            other => Err(format!("unknown entry kind '{other}'")),
        }
    }
}

/// A recurring obligation: what is owed, how it recurs and how far along it is.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    /// Signed amount in minor currency units (cents).
    pub amount_minor: i64,
    #[serde(default)]
    pub kind: EntryKind,
    pub rule: RecurrenceRule,
    pub schedule: Schedule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`crate::Ledger::create`].
#[derive(Clone, Debug)]
pub struct NewTemplate {
    pub name: String,
    pub amount_minor: i64,
    pub kind: EntryKind,
    pub rule: RecurrenceRule,
    pub start_date: NaiveDate,
}

/// One posted occurrence. Keeps its back-reference after the template is
/// deleted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostedRecord {
    pub id: Uuid,
    pub template_id: Uuid,
    /// The scheduled occurrence this record consumed.
    #[serde(with = "ymd")]
    pub intended_date: NaiveDate,
    /// The date the user says it actually happened.
    #[serde(with = "ymd")]
    pub occurrence_date: NaiveDate,
    pub amount_minor: i64,
    pub posted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_kind_parses_and_displays() {
        assert_eq!("Income".parse::<EntryKind>(), Ok(EntryKind::Income));
        assert_eq!(EntryKind::Expense.to_string(), "expense");
        assert!("refund".parse::<EntryKind>().is_err());
    }

    #[test]
    fn template_json_embeds_rule_columns() {
        let rule = RecurrenceRule::monthly(1).unwrap();
        let start = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let now = Utc::now();
        let template = Template {
            id: Uuid::new_v4(),
            name: "Rent".into(),
            amount_minor: -120_000,
            kind: EntryKind::Expense,
            schedule: Schedule::start(&rule, start, &rc_schedule::Gregorian::default()),
            rule,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&template).unwrap();
        assert_eq!(json["kind"], "expense");
        assert_eq!(json["rule"]["frequency"], 2);
        assert_eq!(json["schedule"]["next_due_date"], serde_json::json!([2025, 1, 15]));

        let back: Template = serde_json::from_value(json).unwrap();
        assert_eq!(back, template);
    }
}
