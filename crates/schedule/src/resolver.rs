//! Due-instance resolver: how many occurrences of an active schedule are
//! outstanding as of "today".

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::Calendar;
use crate::error::ScheduleError;
use crate::lifecycle::{Schedule, ScheduleStatus};
use crate::next::next_occurrence;
use crate::rule::RecurrenceRule;

/// Default iteration budget for catch-up counting.
pub const DEFAULT_CATCH_UP_BUDGET: u32 = 10_000;

/// Outstanding occurrence count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum Overdue {
    Exact(u32),
    /// The budget ran out with occurrences still pending; the rule is likely
    /// misconfigured.
    AtLeast(u32),
}

impl Overdue {
    pub fn count(&self) -> u32 {
        match *self {
            Self::Exact(n) | Self::AtLeast(n) => n,
        }
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::AtLeast(_))
    }
}

/// Computed, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DueSummary {
    /// The schedule's current `next_due_date`: the occurrence a Post would record.
    pub intended_date: NaiveDate,
    pub overdue: Overdue,
    /// The counted occurrences are the last ones the rule will produce.
    pub reached_end: bool,
}

/// Resolve the backlog of `schedule` as of `today`.
///
/// `None` when the schedule is not active or nothing is due yet.
pub fn resolve<C: Calendar + ?Sized>(
    schedule: &Schedule,
    rule: &RecurrenceRule,
    today: NaiveDate,
    calendar: &C,
    budget: u32,
) -> Result<Option<DueSummary>, ScheduleError> {
    if schedule.status() != ScheduleStatus::Active || schedule.next_due_date() > today {
        return Ok(None);
    }

    let end = rule.end();
    let posted = schedule.posted_count();
    let mut date = schedule.next_due_date();
    let mut counted = 0u32;
    let mut reached_end = false;
    let mut overflow = false;

    while date <= today {
        if !end.admits(posted.saturating_add(counted), date) {
            reached_end = true;
            break;
        }
        if counted >= budget {
            overflow = true;
            break;
        }
        counted += 1;

        let next = next_occurrence(rule, date, calendar);
        if next <= date {
            tracing::warn!(at = %date, "rule made no forward progress while resolving");
            return Err(ScheduleError::Stalled { at: date });
        }
        date = next;
    }

    if !reached_end && !overflow {
        reached_end = !end.admits(posted.saturating_add(counted), date);
    }

    tracing::debug!(
        intended = %schedule.next_due_date(),
        counted,
        reached_end,
        overflow,
        "resolved due occurrences"
    );

    Ok(Some(DueSummary {
        intended_date: schedule.next_due_date(),
        overdue: if overflow {
            Overdue::AtLeast(counted)
        } else {
            Overdue::Exact(counted)
        },
        reached_end,
    }))
}

/// The next `n` pending occurrence dates of a schedule, starting with its
/// `next_due_date`, honouring the end condition.  Stops early on a stall.
pub fn upcoming<C: Calendar + ?Sized>(
    schedule: &Schedule,
    rule: &RecurrenceRule,
    calendar: &C,
    n: usize,
) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    if matches!(
        schedule.status(),
        ScheduleStatus::Completed | ScheduleStatus::Deleted
    ) {
        return dates;
    }
    let end = rule.end();
    let posted = schedule.posted_count();
    let mut date = schedule.next_due_date();
    while dates.len() < n {
        let consumed = posted.saturating_add(dates.len() as u32);
        if !end.admits(consumed, date) {
            break;
        }
        dates.push(date);
        let next = next_occurrence(rule, date, calendar);
        if next <= date {
            break;
        }
        date = next;
    }
    dates
}
