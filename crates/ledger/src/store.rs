//! The ledger: templates, their schedules and posted records behind a
//! pluggable [`Persistence`] backend.
//!
//! State lives behind a single `RwLock`.  Every mutation runs on a copy of
//! the state, the copy is persisted, and only then does it replace the live
//! state, so a failed save leaves nothing half-applied.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use rc_domain::config::{AdvancePolicy, Config, EngineConfig};
use rc_domain::error::{Error, Result};
use rc_domain::trace::TraceEvent;
use rc_schedule::{
    resolve, upcoming, DueSummary, Gregorian, Posting, Schedule, ScheduleError, ScheduleStatus,
    Skipped,
};

use crate::model::{NewTemplate, PostedRecord, Template};
use crate::persist::{JsonFile, Persistence, Snapshot};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Results
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A template with outstanding occurrences.
#[derive(Clone, Debug, Serialize)]
pub struct DueEntry {
    pub template: Template,
    pub summary: DueSummary,
}

#[derive(Clone, Debug)]
pub struct PostOutcome {
    pub record: PostedRecord,
    pub posting: Posting,
}

/// Why [`Ledger::sweep`] paused a schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SweepReason {
    Stalled { at: NaiveDate },
    Overflow { counted: u32, budget: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SweepFinding {
    pub template_id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub reason: SweepReason,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// State
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone, Default)]
struct State {
    templates: HashMap<Uuid, Template>,
    records: Vec<PostedRecord>,
}

impl State {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            templates: snapshot
                .templates
                .into_iter()
                .map(|t| (t.id, t))
                .collect(),
            records: snapshot.records,
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        let mut templates: Vec<Template> = self.templates.values().cloned().collect();
        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Snapshot {
            templates,
            records: self.records.clone(),
        }
    }

    fn template_mut(&mut self, id: &Uuid) -> Result<&mut Template> {
        self.templates
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("template {id}")))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ledger
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Ledger {
    state: RwLock<State>,
    persistence: Box<dyn Persistence>,
    calendar: Gregorian,
    engine: EngineConfig,
}

impl Ledger {
    /// Open the JSON ledger at `storage.state_path/ledger.json`.
    pub fn open(config: &Config) -> Result<Self> {
        Self::with_persistence(
            Box::new(JsonFile::new(config.storage.ledger_file())),
            Gregorian::from_config(&config.calendar),
            config.engine.clone(),
        )
    }

    pub fn with_persistence(
        persistence: Box<dyn Persistence>,
        calendar: Gregorian,
        engine: EngineConfig,
    ) -> Result<Self> {
        if engine.catch_up_budget == 0 {
            return Err(Error::Config(
                "catch_up_budget must be greater than 0".into(),
            ));
        }
        let state = persistence
            .load()?
            .map(State::from_snapshot)
            .unwrap_or_default();
        Ok(Self {
            state: RwLock::new(state),
            persistence,
            calendar,
            engine,
        })
    }

    pub fn calendar(&self) -> &Gregorian {
        &self.calendar
    }

    /// Run `f` against a copy of the state; persist and swap it in on success.
    fn transact<T>(&self, f: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
        self.transact_if_changed(|state| f(state).map(|out| (out, true)))
    }

    /// Like [`Ledger::transact`], but the draft is only persisted when `f`
    /// reports that it changed something.
    fn transact_if_changed<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<(T, bool)>,
    ) -> Result<T> {
        let mut live = self.state.write();
        let mut draft = live.clone();
        let (out, changed) = f(&mut draft)?;
        if changed {
            self.persistence.save(&draft.to_snapshot())?;
            *live = draft;
        }
        Ok(out)
    }

    // ── Templates ──────────────────────────────────────────────────

    pub fn create(&self, new: NewTemplate) -> Result<Template> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(Error::Other("template name must not be empty".into()));
        }
        let schedule = Schedule::start(&new.rule, new.start_date, &self.calendar);
        let now = Utc::now();
        let template = Template {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            amount_minor: new.amount_minor,
            kind: new.kind,
            rule: new.rule,
            schedule,
            created_at: now,
            updated_at: now,
        };

        let stored = template.clone();
        self.transact(move |state| {
            state.templates.insert(stored.id, stored);
            Ok(())
        })?;

        TraceEvent::TemplateCreated {
            template_id: template.id.to_string(),
            start_date: template.schedule.start_date().to_string(),
            next_due_date: template.schedule.next_due_date().to_string(),
        }
        .emit();
        if template.schedule.status() == ScheduleStatus::Completed {
            tracing::info!(
                template_id = %template.id,
                "template created with no remaining occurrences"
            );
        }
        Ok(template)
    }

    pub fn get(&self, id: &Uuid) -> Result<Template> {
        self.state
            .read()
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("template {id}")))
    }

    /// Templates ordered by creation time. Soft-deleted ones only on request.
    pub fn list(&self, include_deleted: bool) -> Vec<Template> {
        let mut templates: Vec<Template> = self
            .state
            .read()
            .templates
            .values()
            .filter(|t| include_deleted || t.schedule.status() != ScheduleStatus::Deleted)
            .cloned()
            .collect();
        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        templates
    }

    /// Resolve a template id from a full UUID or a unique prefix.
    pub fn find(&self, key: &str) -> Result<Uuid> {
        if let Ok(id) = Uuid::parse_str(key) {
            return Ok(id);
        }
        let key = key.to_ascii_lowercase();
        let state = self.state.read();
        let mut matches = state
            .templates
            .keys()
            .filter(|id| id.to_string().starts_with(&key));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(*id),
            (None, _) => Err(Error::NotFound(format!("template {key}"))),
            (Some(_), Some(_)) => Err(Error::Conflict(format!("ambiguous template id '{key}'"))),
        }
    }

    // ── Due resolution ─────────────────────────────────────────────

    /// Every active template with outstanding occurrences as of `today`,
    /// earliest first.  Stalled schedules are logged and left out; see
    /// [`Ledger::sweep`].
    pub fn due(&self, today: NaiveDate) -> Vec<DueEntry> {
        let budget = self.engine.catch_up_budget;
        let state = self.state.read();
        let mut entries: Vec<DueEntry> = state
            .templates
            .values()
            .filter_map(|t| {
                match resolve(&t.schedule, &t.rule, today, &self.calendar, budget) {
                    Ok(Some(summary)) => Some(DueEntry {
                        template: t.clone(),
                        summary,
                    }),
                    Ok(None) => None,
                    Err(e) => {
                        tracing::warn!(
                            template_id = %t.id,
                            error = %e,
                            "skipping stalled template"
                        );
                        None
                    }
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            a.summary
                .intended_date
                .cmp(&b.summary.intended_date)
                .then_with(|| a.template.name.cmp(&b.template.name))
        });
        entries
    }

    /// Pause active schedules that stall or exhaust the catch-up budget so
    /// they surface as needing attention.
    pub fn sweep(&self, today: NaiveDate) -> Result<Vec<SweepFinding>> {
        let budget = self.engine.catch_up_budget;
        let calendar = self.calendar;
        let findings = self.transact_if_changed(|state| {
            let mut findings = Vec::new();
            for t in state.templates.values_mut() {
                let reason = match resolve(&t.schedule, &t.rule, today, &calendar, budget) {
                    Err(ScheduleError::Stalled { at }) => SweepReason::Stalled { at },
                    Ok(Some(summary)) if summary.overdue.is_overflow() => SweepReason::Overflow {
                        counted: summary.overdue.count(),
                        budget,
                    },
                    _ => continue,
                };
                t.schedule.pause()?;
                t.updated_at = Utc::now();
                findings.push(SweepFinding {
                    template_id: t.id,
                    name: t.name.clone(),
                    reason,
                });
            }
            let changed = !findings.is_empty();
            Ok((findings, changed))
        })?;

        for f in &findings {
            tracing::warn!(
                template_id = %f.template_id,
                reason = ?f.reason,
                "schedule auto-paused"
            );
            match f.reason {
                SweepReason::Stalled { at } => TraceEvent::ScheduleStalled {
                    template_id: f.template_id.to_string(),
                    at: at.to_string(),
                }
                .emit(),
                SweepReason::Overflow { counted, budget } => TraceEvent::CatchUpOverflow {
                    template_id: f.template_id.to_string(),
                    counted,
                    budget,
                }
                .emit(),
            }
            status_changed(&f.template_id, ScheduleStatus::Active, ScheduleStatus::Paused);
        }
        Ok(findings)
    }

    // ── Post / Skip ────────────────────────────────────────────────

    /// Post the template's current occurrence.  `occurrence_date` defaults
    /// to the intended date.  With `expected_due`, the call fails with a
    /// conflict when the schedule has moved on since the caller looked.
    pub fn post(
        &self,
        id: &Uuid,
        occurrence_date: Option<NaiveDate>,
        today: NaiveDate,
        expected_due: Option<NaiveDate>,
    ) -> Result<PostOutcome> {
        let calendar = self.calendar;
        let policy = self.engine.advance_policy;
        let outcome = self.transact(|state| {
            let t = state.template_mut(id)?;
            check_expected(t, expected_due)?;
            let occurrence = occurrence_date.unwrap_or(t.schedule.next_due_date());
            let posting = t
                .schedule
                .post(&t.rule, occurrence, today, &calendar, policy)?;
            let now = Utc::now();
            t.updated_at = now;
            let record = PostedRecord {
                id: Uuid::new_v4(),
                template_id: t.id,
                intended_date: posting.intended_date,
                occurrence_date: posting.occurrence_date,
                amount_minor: t.amount_minor,
                posted_at: now,
            };
            state.records.push(record.clone());
            Ok(PostOutcome { record, posting })
        })?;

        let p = &outcome.posting;
        TraceEvent::OccurrencePosted {
            template_id: id.to_string(),
            record_id: outcome.record.id.to_string(),
            intended_date: p.intended_date.to_string(),
            occurrence_date: p.occurrence_date.to_string(),
            next_due_date: p.next_due_date.to_string(),
            posted_count: p.posted_count,
        }
        .emit();
        if p.completed {
            completed(id, p.posted_count);
        }
        Ok(outcome)
    }

    /// Pass over the current occurrence without creating a record.
    pub fn skip(
        &self,
        id: &Uuid,
        today: NaiveDate,
        expected_due: Option<NaiveDate>,
    ) -> Result<Skipped> {
        let calendar = self.calendar;
        let policy = self.engine.advance_policy;
        let (skipped, posted_count) = self.transact(|state| {
            let t = state.template_mut(id)?;
            check_expected(t, expected_due)?;
            let skipped = t.schedule.skip(&t.rule, today, &calendar, policy)?;
            t.updated_at = Utc::now();
            Ok((skipped, t.schedule.posted_count()))
        })?;

        TraceEvent::OccurrenceSkipped {
            template_id: id.to_string(),
            skipped_date: skipped.skipped_date.to_string(),
            next_due_date: skipped.next_due_date.to_string(),
        }
        .emit();
        if skipped.completed {
            completed(id, posted_count);
        }
        Ok(skipped)
    }

    // ── Status transitions ─────────────────────────────────────────

    pub fn pause(&self, id: &Uuid) -> Result<Template> {
        self.transition(id, Schedule::pause)
    }

    pub fn resume(&self, id: &Uuid) -> Result<Template> {
        self.transition(id, Schedule::resume)
    }

    /// Soft delete. Posted records are kept.
    pub fn delete(&self, id: &Uuid) -> Result<Template> {
        self.transition(id, Schedule::delete)
    }

    fn transition(
        &self,
        id: &Uuid,
        apply: fn(&mut Schedule) -> std::result::Result<(), ScheduleError>,
    ) -> Result<Template> {
        let (from, template) = self.transact(|state| {
            let t = state.template_mut(id)?;
            let from = t.schedule.status();
            apply(&mut t.schedule)?;
            t.updated_at = Utc::now();
            Ok((from, t.clone()))
        })?;
        status_changed(id, from, template.schedule.status());
        Ok(template)
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Records posted against a template, oldest first.
    pub fn records(&self, id: &Uuid) -> Result<Vec<PostedRecord>> {
        let state = self.state.read();
        if !state.templates.contains_key(id) {
            return Err(Error::NotFound(format!("template {id}")));
        }
        Ok(state
            .records
            .iter()
            .filter(|r| r.template_id == *id)
            .cloned()
            .collect())
    }

    /// The next `n` pending occurrence dates of a template.
    pub fn upcoming(&self, id: &Uuid, n: usize) -> Result<Vec<NaiveDate>> {
        let t = self.get(id)?;
        Ok(upcoming(&t.schedule, &t.rule, &self.calendar, n))
    }

    pub fn advance_policy(&self) -> AdvancePolicy {
        self.engine.advance_policy
    }
}

fn check_expected(t: &Template, expected_due: Option<NaiveDate>) -> Result<()> {
    match expected_due {
        Some(expected) if expected != t.schedule.next_due_date() => Err(Error::Conflict(format!(
            "template {} is due {}, not {expected}",
            t.id,
            t.schedule.next_due_date()
        ))),
        _ => Ok(()),
    }
}

fn status_changed(id: &Uuid, from: ScheduleStatus, to: ScheduleStatus) {
    tracing::info!(template_id = %id, %from, %to, "schedule status changed");
    TraceEvent::ScheduleStatusChanged {
        template_id: id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    }
    .emit();
}

fn completed(id: &Uuid, posted_count: u32) {
    tracing::info!(template_id = %id, posted_count, "schedule completed");
    TraceEvent::ScheduleCompleted {
        template_id: id.to_string(),
        posted_count,
    }
    .emit();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntryKind;
    use crate::persist::Memory;
    use rc_schedule::RecurrenceRule;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ledger() -> Ledger {
        Ledger::with_persistence(
            Box::new(Memory::new()),
            Gregorian::default(),
            EngineConfig::default(),
        )
        .unwrap()
    }

    fn new_template(name: &str, rule: RecurrenceRule, start: NaiveDate) -> NewTemplate {
        NewTemplate {
            name: name.into(),
            amount_minor: -5_000,
            kind: EntryKind::Expense,
            rule,
            start_date: start,
        }
    }

    #[test]
    fn blank_name_is_rejected() {
        let l = ledger();
        let err = l
            .create(new_template("  ", RecurrenceRule::daily(1).unwrap(), d(2025, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn find_accepts_unique_prefix() {
        let l = ledger();
        let t = l
            .create(new_template("Gym", RecurrenceRule::monthly(1).unwrap(), d(2025, 1, 1)))
            .unwrap();
        let prefix = &t.id.to_string()[..8];
        assert_eq!(l.find(prefix).unwrap(), t.id);
        assert!(matches!(l.find("zzzz"), Err(Error::NotFound(_))));
    }

    #[test]
    fn due_is_sorted_by_intended_date() {
        let l = ledger();
        l.create(new_template("B", RecurrenceRule::monthly(1).unwrap(), d(2025, 1, 10)))
            .unwrap();
        l.create(new_template("A", RecurrenceRule::monthly(1).unwrap(), d(2025, 1, 5)))
            .unwrap();
        let due = l.due(d(2025, 1, 12));
        let names: Vec<_> = due.iter().map(|e| e.template.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn list_hides_deleted_unless_asked() {
        let l = ledger();
        let t = l
            .create(new_template("Old", RecurrenceRule::weekly(1).unwrap(), d(2025, 1, 6)))
            .unwrap();
        l.delete(&t.id).unwrap();
        assert!(l.list(false).is_empty());
        assert_eq!(l.list(true).len(), 1);
    }

    #[test]
    fn sweep_pauses_budget_overflow() {
        let l = Ledger::with_persistence(
            Box::new(Memory::new()),
            Gregorian::default(),
            EngineConfig {
                catch_up_budget: 10,
                ..EngineConfig::default()
            },
        )
        .unwrap();
        let t = l
            .create(new_template("Coffee", RecurrenceRule::daily(1).unwrap(), d(2025, 1, 1)))
            .unwrap();
        let findings = l.sweep(d(2025, 3, 1)).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].reason,
            SweepReason::Overflow {
                counted: 10,
                budget: 10
            }
        );
        assert_eq!(l.get(&t.id).unwrap().schedule.status(), ScheduleStatus::Paused);
    }

    #[test]
    fn zero_catch_up_budget_is_rejected() {
        let err = Ledger::with_persistence(
            Box::new(Memory::new()),
            Gregorian::default(),
            EngineConfig {
                catch_up_budget: 0,
                ..EngineConfig::default()
            },
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn sweep_leaves_due_schedules_with_budget_one_active() {
        let l = Ledger::with_persistence(
            Box::new(Memory::new()),
            Gregorian::default(),
            EngineConfig {
                catch_up_budget: 1,
                ..EngineConfig::default()
            },
        )
        .unwrap();
        let t = l
            .create(new_template("Rent", RecurrenceRule::monthly(1).unwrap(), d(2025, 3, 1)))
            .unwrap();
        assert!(l.sweep(d(2025, 3, 1)).unwrap().is_empty());
        assert_eq!(l.get(&t.id).unwrap().schedule.status(), ScheduleStatus::Active);
    }
}
