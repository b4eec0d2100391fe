//! Handlers for the ledger-facing subcommands.

use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;

use rc_domain::config::Config;
use rc_ledger::{EntryKind, Ledger, NewTemplate, PostedRecord, Template};
use rc_schedule::{upcoming, Gregorian, Preset, RecurrenceRule, Schedule};

use super::rule_args::format_amount;
use super::{Command, RuleArgs};

/// Dispatch one command. `config` and `version` are handled by `main`.
pub fn run(command: Command, config: &Config, json: bool) -> anyhow::Result<()> {
    let out = Output { json };
    match command {
        Command::Presets => presets(out),
        Command::Preview { rule, from, limit } => preview(config, out, &rule, from, limit),
        Command::Config(_) | Command::Version => Ok(()),
        command => {
            let ledger = Ledger::open(config).context("opening ledger")?;
            let today = |given: Option<NaiveDate>| given.unwrap_or_else(|| config.calendar.today());
            match command {
                Command::Add {
                    name,
                    amount,
                    income,
                    start,
                    rule,
                } => {
                    let template = ledger.create(NewTemplate {
                        name,
                        amount_minor: amount,
                        kind: if income {
                            EntryKind::Income
                        } else {
                            EntryKind::Expense
                        },
                        rule: rule.to_rule()?,
                        start_date: start,
                    })?;
                    out.template(&template)
                }
                Command::List { all } => out.templates(&ledger.list(all)),
                Command::Show { id } => out.template(&ledger.get(&ledger.find(&id)?)?),
                Command::Due { today: given } => due(&ledger, out, today(given)),
                Command::Upcoming { id, limit } => {
                    let dates = ledger.upcoming(&ledger.find(&id)?, limit)?;
                    out.dates(&dates)
                }
                Command::Post {
                    id,
                    on,
                    expect,
                    today: given,
                } => {
                    let id = ledger.find(&id)?;
                    let outcome = ledger.post(&id, on, today(given), expect)?;
                    if out.json {
                        return print_json(&outcome.record);
                    }
                    let p = &outcome.posting;
                    println!(
                        "posted {} (occurred {}), next due {}{}",
                        p.intended_date,
                        p.occurrence_date,
                        p.next_due_date,
                        if p.completed { ", series completed" } else { "" }
                    );
                    Ok(())
                }
                Command::Skip {
                    id,
                    expect,
                    today: given,
                } => {
                    let id = ledger.find(&id)?;
                    let s = ledger.skip(&id, today(given), expect)?;
                    if out.json {
                        return print_json(&serde_json::json!({
                            "skipped_date": s.skipped_date,
                            "next_due_date": s.next_due_date,
                            "completed": s.completed,
                        }));
                    }
                    println!(
                        "skipped {}, next due {}{}",
                        s.skipped_date,
                        s.next_due_date,
                        if s.completed { ", series completed" } else { "" }
                    );
                    Ok(())
                }
                Command::Pause { id } => out.template(&ledger.pause(&ledger.find(&id)?)?),
                Command::Resume { id } => out.template(&ledger.resume(&ledger.find(&id)?)?),
                Command::Delete { id } => out.template(&ledger.delete(&ledger.find(&id)?)?),
                Command::Records { id } => {
                    out.records(&ledger.records(&ledger.find(&id)?)?)
                }
                Command::Presets
                | Command::Preview { .. }
                | Command::Config(_)
                | Command::Version => Ok(()),
            }
        }
    }
}

fn due(ledger: &Ledger, out: Output, today: NaiveDate) -> anyhow::Result<()> {
    let findings = ledger.sweep(today)?;
    for f in &findings {
        eprintln!("paused '{}' ({}): {:?}", f.name, short(&f.template_id), f.reason);
    }

    let entries = ledger.due(today);
    if out.json {
        return print_json(&serde_json::json!({
            "today": today,
            "due": entries,
            "auto_paused": findings,
        }));
    }
    if entries.is_empty() {
        println!("nothing due as of {today}");
        return Ok(());
    }
    for e in &entries {
        let s = &e.summary;
        let count = if s.overdue.is_overflow() {
            format!("{}+", s.overdue.count())
        } else {
            s.overdue.count().to_string()
        };
        println!(
            "{}  {}  x{:<5} {:>12}  {}{}",
            short(&e.template.id),
            s.intended_date,
            count,
            format_amount(e.template.amount_minor),
            e.template.name,
            if s.reached_end { "  (last)" } else { "" }
        );
    }
    Ok(())
}

fn preview(
    config: &Config,
    out: Output,
    args: &RuleArgs,
    from: NaiveDate,
    limit: usize,
) -> anyhow::Result<()> {
    let rule = args.to_rule()?;
    let calendar = Gregorian::from_config(&config.calendar);
    let schedule = Schedule::start(&rule, from, &calendar);
    out.dates(&upcoming(&schedule, &rule, &calendar, limit))
}

fn presets(out: Output) -> anyhow::Result<()> {
    if out.json {
        let names: Vec<&str> = Preset::ALL.iter().map(|p| p.as_str()).collect();
        return print_json(&names);
    }
    for preset in Preset::ALL {
        let rule = preset.rule();
        println!(
            "{:<13} {} every {}",
            preset,
            rule.frequency(),
            rule.interval()
        );
    }
    Ok(())
}

// ── Output ───────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    fn template(self, t: &Template) -> anyhow::Result<()> {
        if self.json {
            return print_json(t);
        }
        println!("id         {}", t.id);
        println!("name       {}", t.name);
        println!("amount     {} ({})", format_amount(t.amount_minor), t.kind);
        println!("rule       {}", rule_label(&t.rule));
        println!("status     {}", t.schedule.status());
        println!("start      {}", t.schedule.start_date());
        println!("next due   {}", t.schedule.next_due_date());
        println!("posted     {}", t.schedule.posted_count());
        Ok(())
    }

    fn templates(self, templates: &[Template]) -> anyhow::Result<()> {
        if self.json {
            return print_json(&templates);
        }
        for t in templates {
            println!(
                "{}  {:<9}  {}  {:>12}  {:<14}  {}",
                short(&t.id),
                t.schedule.status(),
                t.schedule.next_due_date(),
                format_amount(t.amount_minor),
                rule_label(&t.rule),
                t.name
            );
        }
        Ok(())
    }

    fn records(self, records: &[PostedRecord]) -> anyhow::Result<()> {
        if self.json {
            return print_json(&records);
        }
        for r in records {
            println!(
                "{}  intended {}  occurred {}  {:>12}",
                short(&r.id),
                r.intended_date,
                r.occurrence_date,
                format_amount(r.amount_minor)
            );
        }
        Ok(())
    }

    fn dates(self, dates: &[NaiveDate]) -> anyhow::Result<()> {
        if self.json {
            return print_json(&dates);
        }
        for date in dates {
            println!("{date}  {}", date.format("%a"));
        }
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn short(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Preset name when the rule is one, else its frequency and interval.
fn rule_label(rule: &RecurrenceRule) -> String {
    match Preset::matching(rule) {
        Some(preset) => preset.to_string(),
        None => format!("{}/{}", rule.frequency(), rule.interval()),
    }
}
