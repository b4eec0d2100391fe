use chrono::NaiveDate;

use crate::lifecycle::ScheduleStatus;

/// A rule that can never be attached to a schedule.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("interval must be at least 1, got {0}")]
    InvalidInterval(u32),

    #[error("{0} must select at least one value")]
    EmptySelector(&'static str),

    #[error("day of month {0} out of range 1..=31")]
    DayOutOfRange(u32),

    #[error("month {0} out of range 1..=12")]
    MonthOutOfRange(u32),

    #[error("weekday code {0} out of range 1..=7")]
    WeekdayOutOfRange(i64),

    #[error("ordinal code {0} not one of 1, 2, 3, 4, -1")]
    OrdinalOutOfRange(i64),

    #[error("unknown {field} code {code}")]
    UnknownCode { field: &'static str, code: i64 },

    #[error("{0} is required by the selected mode")]
    MissingField(&'static str),

    #[error("end_after_occurrences must be at least 1")]
    ZeroOccurrences,

    #[error("{field}: invalid list entry '{value}'")]
    MalformedList { field: &'static str, value: String },
}

/// A lifecycle or resolver operation that could not be carried out.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule stalled at {at}: rule produced no later occurrence")]
    Stalled { at: NaiveDate },

    #[error("schedule is {status}, not accepting posts or skips")]
    NotActive { status: ScheduleStatus },

    #[error("cannot {action} a {from} schedule")]
    InvalidTransition {
        from: ScheduleStatus,
        action: &'static str,
    },

    #[error("schedule already deleted")]
    AlreadyDeleted,
}

impl From<RuleError> for rc_domain::Error {
    fn from(e: RuleError) -> Self {
        rc_domain::Error::Rule(e.to_string())
    }
}

impl From<ScheduleError> for rc_domain::Error {
    fn from(e: ScheduleError) -> Self {
        rc_domain::Error::Schedule(e.to_string())
    }
}
