//! Day schedule commands for CLI.

use clap::Subcommand;
use dayplanner_core::scheduler::clock::format_hhmm;
use dayplanner_core::{DaySchedule, SlotKind};
use serde::Serialize;

use super::{open_planner, print_json, resolve_now, CliResult};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Show today's schedule
    Today {
        /// Reference time "YYYY-MM-DDTHH:MM" (defaults to now)
        #[arg(long)]
        at: Option<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the task scheduled right now
    Now {
        /// Reference time "YYYY-MM-DDTHH:MM" (defaults to now)
        #[arg(long)]
        at: Option<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotView<'a> {
    task_id: &'a str,
    name: &'a str,
    start: String,
    end: String,
    kind: SlotKind,
}

#[derive(Serialize)]
struct ScheduleView<'a> {
    date: String,
    slots: Vec<SlotView<'a>>,
    deferred: Vec<&'a str>,
}

fn view(schedule: &DaySchedule, date: chrono::NaiveDate) -> ScheduleView<'_> {
    ScheduleView {
        date: date.format("%Y-%m-%d").to_string(),
        slots: schedule
            .slots
            .iter()
            .map(|slot| SlotView {
                task_id: &slot.task.id,
                name: &slot.task.name,
                start: format_hhmm(slot.start_minutes),
                end: format_hhmm(slot.end_minutes),
                kind: slot.kind,
            })
            .collect(),
        deferred: schedule.deferred.iter().map(|t| t.id.as_str()).collect(),
    }
}

pub fn run(action: PlanAction) -> CliResult {
    match action {
        PlanAction::Today { at, json } => {
            let now = resolve_now(at.as_deref())?;
            let (planner, _) = open_planner(now)?;
            let schedule = planner.schedule_for(now);
            let view = view(&schedule, now.date());

            if json {
                return print_json(&view);
            }
            println!("Schedule for {}", view.date);
            if view.slots.is_empty() {
                println!("  (nothing scheduled)");
            }
            for slot in &view.slots {
                let marker = match slot.kind {
                    SlotKind::Fixed => "*",
                    SlotKind::Flexible => " ",
                };
                println!("  {}-{} {marker} {}", slot.start, slot.end, slot.name);
            }
            if !schedule.deferred.is_empty() {
                println!("Deferred:");
                for task in &schedule.deferred {
                    println!("  {} ({}m)", task.name, task.duration_minutes);
                }
            }
        }
        PlanAction::Now { at, json } => {
            let now = resolve_now(at.as_deref())?;
            let (planner, _) = open_planner(now)?;
            let current = planner.current_task(now);

            if json {
                return print_json(&current);
            }
            match current {
                Some(slot) => println!(
                    "{} ({}-{})",
                    slot.task.name,
                    format_hhmm(slot.start_minutes),
                    format_hhmm(slot.end_minutes)
                ),
                None => println!("Nothing scheduled right now"),
            }
        }
    }
    Ok(())
}
