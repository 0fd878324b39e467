//! Task management commands for CLI.

use std::path::PathBuf;

use clap::Subcommand;
use dayplanner_core::scheduler::clock::parse_date_time;
use dayplanner_core::{CalendarEntry, RawTask, SkipOutcome, SkipTarget, TagMarkers, Task};

use super::{open_planner, print_json, resolve_now, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task name
        name: String,
        /// Explicit task id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Duration in minutes (learned or configured default when omitted)
        #[arg(long)]
        duration: Option<u32>,
        /// Importance 1-10
        #[arg(long)]
        importance: Option<u8>,
        /// Urgency 1-10 (derived from the deadline when omitted)
        #[arg(long)]
        urgency: Option<u8>,
        /// Deadline, "YYYY-MM-DD" or "YYYY-MM-DDTHH:MM"
        #[arg(long)]
        deadline: Option<String>,
        /// Start time "HH:MM"
        #[arg(long)]
        start: Option<String>,
        /// Pin the task to its start time
        #[arg(long)]
        fixed: bool,
        /// Id of a task that must complete first
        #[arg(long)]
        depends_on: Option<String>,
        /// Owning profile (active user when omitted)
        #[arg(long)]
        user: Option<String>,
    },
    /// List tasks
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New duration in minutes
        #[arg(long)]
        duration: Option<u32>,
        /// New importance
        #[arg(long)]
        importance: Option<u8>,
        /// New urgency
        #[arg(long)]
        urgency: Option<u8>,
        /// New deadline
        #[arg(long)]
        deadline: Option<String>,
        /// New start time "HH:MM"
        #[arg(long)]
        start: Option<String>,
        /// Set fixed status
        #[arg(long)]
        fixed: Option<bool>,
        /// New dependency id
        #[arg(long)]
        depends_on: Option<String>,
    },
    /// Mark a task completed
    Complete {
        /// Task ID
        id: String,
        /// Minutes the task actually took
        #[arg(long)]
        minutes: Option<f64>,
        /// Completion time (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Defer a task and escalate its urgency
    Skip {
        /// Task ID
        id: String,
        /// "end-of-day", "tomorrow" or "YYYY-MM-DD HH:MM"
        #[arg(long, default_value = "end-of-day")]
        to: String,
        /// Move an unfinished dependency along with the task
        #[arg(long)]
        move_dependency: bool,
        /// Reference time (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },
    /// List tasks waiting on an unfinished dependency
    Blocked,
    /// Achievement totals over completed tasks
    Scores,
    /// Import calendar events from a JSON array file
    ImportCalendar {
        /// Path to the JSON file
        file: PathBuf,
    },
}

fn parse_skip_target(value: &str) -> Result<SkipTarget, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "end" | "end-of-day" | "eod" => Ok(SkipTarget::EndOfDay),
        "tomorrow" => Ok(SkipTarget::Tomorrow),
        _ => parse_date_time(value)
            .map(SkipTarget::At)
            .ok_or_else(|| format!("cannot parse skip target '{value}'")),
    }
}

fn print_line(task: &Task) {
    let status = if task.is_completed() { "x" } else { " " };
    let start = task.start_time.as_deref().unwrap_or("--:--");
    println!(
        "[{status}] {id}  {start}  {minutes:>4}m  p{priority:<3} {name}",
        id = task.id,
        minutes = task.duration_minutes,
        priority = task.priority(),
        name = task.name,
    );
}

pub fn run(action: TaskAction) -> CliResult {
    let now = resolve_now(None)?;
    let (mut planner, config) = open_planner(now)?;

    match action {
        TaskAction::Add {
            name,
            id,
            duration,
            importance,
            urgency,
            deadline,
            start,
            fixed,
            depends_on,
            user,
        } => {
            let raw = RawTask {
                id,
                user: user.or_else(|| Some(config.active_user.clone())),
                duration_minutes: duration.map(Into::into),
                importance: importance.map(Into::into),
                urgency: urgency.map(Into::into),
                deadline,
                start_time: start,
                is_fixed: fixed.then_some(true),
                dependency: depends_on,
                ..RawTask::named(name)
            };
            let task = planner.store_mut().add(&raw, now)?;
            println!("Task created: {}", task.id);
            print_json(&task)?;
        }
        TaskAction::List { all, json } => {
            let tasks: Vec<Task> = planner
                .store()
                .get_tasks_by_user(&config.active_user)
                .into_iter()
                .filter(|t| all || !t.is_completed())
                .collect();
            if json {
                print_json(&tasks)?;
            } else if tasks.is_empty() {
                println!("No tasks");
            } else {
                tasks.iter().for_each(print_line);
            }
        }
        TaskAction::Get { id } => match planner.store().get_by_hash(&id) {
            Some(task) => print_json(task)?,
            None => return Err(format!("Task not found: {id}").into()),
        },
        TaskAction::Update {
            id,
            name,
            duration,
            importance,
            urgency,
            deadline,
            start,
            fixed,
            depends_on,
        } => {
            let updates = RawTask {
                name,
                duration_minutes: duration.map(Into::into),
                importance: importance.map(Into::into),
                urgency: urgency.map(Into::into),
                deadline,
                start_time: start,
                is_fixed: fixed,
                dependency: depends_on,
                ..RawTask::default()
            };
            match planner.store_mut().update_by_hash(&id, &updates, now)? {
                Some(task) => {
                    println!("Task updated: {}", task.id);
                    print_json(&task)?;
                }
                None => return Err(format!("Task not found: {id}").into()),
            }
        }
        TaskAction::Complete { id, minutes, at } => {
            let at = resolve_now(at.as_deref())?;
            let task = planner.complete_task(&id, minutes, at)?;
            println!(
                "Task completed: {} (score {:.2})",
                task.id, task.achievement_score
            );
        }
        TaskAction::Skip {
            id,
            to,
            move_dependency,
            at,
        } => {
            let target = parse_skip_target(&to)?;
            let now = resolve_now(at.as_deref())?;
            match planner.skip_task(&id, target, now, move_dependency)? {
                SkipOutcome::Rescheduled { task, skips } => {
                    println!(
                        "Task skipped: {} -> {} (urgency {}, skipped {skips}x)",
                        task.id,
                        task.planner_date.as_deref().unwrap_or_default(),
                        task.urgency,
                    );
                }
                SkipOutcome::DependencyConflict {
                    dependency_id,
                    dependency_at,
                } => {
                    return Err(format!(
                        "dependency {dependency_id} is planned for {dependency_at}; \
                         pass --move-dependency to move it too"
                    )
                    .into());
                }
            }
        }
        TaskAction::Blocked => print_json(&planner.blocked_tasks())?,
        TaskAction::Scores => print_json(&planner.store().get_task_score_totals())?,
        TaskAction::ImportCalendar { file } => {
            let content = std::fs::read_to_string(&file)?;
            let entries: Vec<CalendarEntry> = serde_json::from_str(&content)?;
            let markers = TagMarkers::from(&config.scheduler);
            let summary = planner
                .store_mut()
                .import_calendar(&entries, &markers, now)?;
            println!(
                "Imported {} events: {} added, {} updated, {} preserved",
                entries.len(),
                summary.added,
                summary.updated,
                summary.preserved
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_targets_parse() {
        assert_eq!(parse_skip_target("tomorrow"), Ok(SkipTarget::Tomorrow));
        assert_eq!(parse_skip_target("EOD"), Ok(SkipTarget::EndOfDay));
        assert_eq!(
            parse_skip_target("2026-10-20 09:30"),
            Ok(SkipTarget::At(parse_date_time("2026-10-20T09:30").unwrap()))
        );
        assert!(parse_skip_target("someday").is_err());
    }
}
