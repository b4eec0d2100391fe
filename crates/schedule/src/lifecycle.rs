//! Schedule lifecycle: the only stateful part of the engine.
//!
//! - `Active ⇄ Paused` via pause/resume, with no recomputation.
//! - Post/Skip on `Active` or `Paused` advance `next_due_date`; when the
//!   rule's end condition is met afterwards the schedule becomes `Completed`.
//! - Any non-deleted state can be soft-deleted.
//!
//! Every transition either fully applies or leaves the schedule untouched.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::columns::ymd;
use crate::error::ScheduleError;
use crate::next::{next_occurrence, occurs_on};
use crate::rule::RecurrenceRule;
use rc_domain::config::AdvancePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ScheduleStatus {
    Active,
    Paused,
    Completed,
    Deleted,
}

impl ScheduleStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Paused => 1,
            Self::Completed => 2,
            Self::Deleted => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Active),
            1 => Some(Self::Paused),
            2 => Some(Self::Completed),
            3 => Some(Self::Deleted),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ScheduleStatus> for u8 {
    fn from(status: ScheduleStatus) -> u8 {
        status.code()
    }
}

impl TryFrom<u8> for ScheduleStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown schedule status code {code}"))
    }
}

/// Per-template progress. Dates persist as `[year, month, day]` triples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(with = "ymd")]
    start_date: NaiveDate,
    #[serde(with = "ymd")]
    next_due_date: NaiveDate,
    posted_count: u32,
    status: ScheduleStatus,
}

/// Result of a successful Post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    /// The occurrence that was consumed (the `next_due_date` before posting).
    pub intended_date: NaiveDate,
    /// The date the caller recorded, which may differ from `intended_date`.
    pub occurrence_date: NaiveDate,
    pub next_due_date: NaiveDate,
    pub posted_count: u32,
    pub completed: bool,
}

/// Result of a successful Skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skipped {
    pub skipped_date: NaiveDate,
    pub next_due_date: NaiveDate,
    pub completed: bool,
}

impl Schedule {
    /// Create the schedule for a newly defined template.  The first due date
    /// is `start_date` when it satisfies the rule, else the next occurrence.
    pub fn start<C: Calendar + ?Sized>(
        rule: &RecurrenceRule,
        start_date: NaiveDate,
        calendar: &C,
    ) -> Self {
        let next_due_date = if occurs_on(rule, start_date, calendar) {
            start_date
        } else {
            next_occurrence(rule, start_date, calendar)
        };
        let status = if rule.end().admits(0, next_due_date) {
            ScheduleStatus::Active
        } else {
            ScheduleStatus::Completed
        };
        Self {
            start_date,
            next_due_date,
            posted_count: 0,
            status,
        }
    }

    /// Rebuild persisted state.
    pub fn restore(
        start_date: NaiveDate,
        next_due_date: NaiveDate,
        posted_count: u32,
        status: ScheduleStatus,
    ) -> Self {
        Self {
            start_date,
            next_due_date,
            posted_count,
            status,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn next_due_date(&self) -> NaiveDate {
        self.next_due_date
    }

    pub fn posted_count(&self) -> u32 {
        self.posted_count
    }

    pub fn status(&self) -> ScheduleStatus {
        self.status
    }

    /// Record the current occurrence as posted on `occurrence_date`.
    pub fn post<C: Calendar + ?Sized>(
        &mut self,
        rule: &RecurrenceRule,
        occurrence_date: NaiveDate,
        today: NaiveDate,
        calendar: &C,
        policy: AdvancePolicy,
    ) -> Result<Posting, ScheduleError> {
        self.ensure_accepting()?;
        let next = self.advance_target(rule, today, calendar, policy)?;
        let intended_date = self.next_due_date;

        self.next_due_date = next;
        self.posted_count += 1;
        let completed = self.complete_if_ended(rule);

        Ok(Posting {
            intended_date,
            occurrence_date,
            next_due_date: next,
            posted_count: self.posted_count,
            completed,
        })
    }

    /// Pass over the current occurrence without recording it.  Skips never
    /// count toward an occurrence limit.
    pub fn skip<C: Calendar + ?Sized>(
        &mut self,
        rule: &RecurrenceRule,
        today: NaiveDate,
        calendar: &C,
        policy: AdvancePolicy,
    ) -> Result<Skipped, ScheduleError> {
        self.ensure_accepting()?;
        let next = self.advance_target(rule, today, calendar, policy)?;
        let skipped_date = self.next_due_date;

        self.next_due_date = next;
        let completed = self.complete_if_ended(rule);

        Ok(Skipped {
            skipped_date,
            next_due_date: next,
            completed,
        })
    }

    pub fn pause(&mut self) -> Result<(), ScheduleError> {
        match self.status {
            ScheduleStatus::Active => {
                self.status = ScheduleStatus::Paused;
                Ok(())
            }
            from => Err(ScheduleError::InvalidTransition {
                from,
                action: "pause",
            }),
        }
    }

    pub fn resume(&mut self) -> Result<(), ScheduleError> {
        match self.status {
            ScheduleStatus::Paused => {
                self.status = ScheduleStatus::Active;
                Ok(())
            }
            from => Err(ScheduleError::InvalidTransition {
                from,
                action: "resume",
            }),
        }
    }

    /// Soft delete. Irreversible.
    pub fn delete(&mut self) -> Result<(), ScheduleError> {
        if self.status == ScheduleStatus::Deleted {
            return Err(ScheduleError::AlreadyDeleted);
        }
        self.status = ScheduleStatus::Deleted;
        Ok(())
    }

    fn ensure_accepting(&self) -> Result<(), ScheduleError> {
        match self.status {
            ScheduleStatus::Active | ScheduleStatus::Paused => Ok(()),
            status => Err(ScheduleError::NotActive { status }),
        }
    }

    fn advance_target<C: Calendar + ?Sized>(
        &self,
        rule: &RecurrenceRule,
        today: NaiveDate,
        calendar: &C,
        policy: AdvancePolicy,
    ) -> Result<NaiveDate, ScheduleError> {
        let anchor = match policy {
            AdvancePolicy::Sequential => self.next_due_date,
            AdvancePolicy::FastForward => self.next_due_date.max(today),
        };
        let next = next_occurrence(rule, anchor, calendar);
        if next <= anchor {
            return Err(ScheduleError::Stalled { at: anchor });
        }
        Ok(next)
    }

    fn complete_if_ended(&mut self, rule: &RecurrenceRule) -> bool {
        if rule.end().admits(self.posted_count, self.next_due_date) {
            return false;
        }
        self.status = ScheduleStatus::Completed;
        true
    }
}
