//! Duration learning commands for CLI.

use clap::Subcommand;
use dayplanner_core::DurationLearning;

use super::{open_store, CliResult};

#[derive(Subcommand)]
pub enum DurationAction {
    /// Record an observed duration for a task name
    Record {
        /// Task name (case-insensitive)
        name: String,
        /// Observed minutes
        minutes: f64,
    },
    /// Show the learned estimate for a task name
    Estimate {
        /// Task name (case-insensitive)
        name: String,
    },
    /// List every learned duration
    List,
}

pub fn run(action: DurationAction) -> CliResult {
    let learning = DurationLearning::new(open_store()?);

    match action {
        DurationAction::Record { name, minutes } => {
            match learning.record_task_duration(&name, minutes)? {
                Some(average) => println!("{average:.1}"),
                None => return Err("name must be non-empty and minutes positive".into()),
            }
        }
        DurationAction::Estimate { name } => match learning.get_estimated_duration(&name) {
            Some(minutes) => println!("{minutes}"),
            None => return Err(format!("no learned duration for '{name}'").into()),
        },
        DurationAction::List => super::print_json(&learning.entries())?,
    }
    Ok(())
}
