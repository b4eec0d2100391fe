//! Recurrence scheduling engine.
//!
//! A rule ([`RecurrenceRule`]) describes *when* an obligation recurs; a
//! [`Schedule`] records how far along it is.  Everything here operates on
//! local calendar dates and takes the [`Calendar`] as an explicit argument,
//! so the calculator and resolver are pure functions.
//!
//! - [`rule`]: rule model (tagged selector unions, end conditions)
//! - [`calendar`]: calendar system (first weekday, month lengths)
//! - [`next`]: next-occurrence calculator
//! - [`resolver`]: due-instance resolver (catch-up counting)
//! - [`lifecycle`]: schedule state machine (post/skip/pause/resume/delete)
//! - [`preset`]: named shortcuts ("weekly", "biweekly", ...)
//! - [`columns`]: flattened scalar form used for persistence

pub mod calendar;
pub mod columns;
pub mod error;
pub mod lifecycle;
pub mod next;
pub mod preset;
pub mod resolver;
pub mod rule;

pub use calendar::{Calendar, Gregorian};
pub use columns::RuleColumns;
pub use error::{RuleError, ScheduleError};
pub use lifecycle::{Posting, Schedule, ScheduleStatus, Skipped};
pub use next::{next_occurrence, occurs_on, Occurrences};
pub use preset::Preset;
pub use resolver::{resolve, upcoming, DueSummary, Overdue};
pub use rule::{
    EndCondition, Frequency, MonthlyPattern, Ordinal, OrdinalWeekday, Pattern, RecurrenceRule,
    WeeklyPattern, Weekdays, YearlyPattern,
};

pub use rc_domain::config::AdvancePolicy;
