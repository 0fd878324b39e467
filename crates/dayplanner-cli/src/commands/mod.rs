pub mod config;
pub mod duration;
pub mod plan;
pub mod task;

use std::rc::Rc;

use chrono::{Local, NaiveDateTime};
use dayplanner_core::scheduler::clock::parse_date_time;
use dayplanner_core::{Config, DayPlanner, KeyValueStore, SqliteStore};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the SQLite store in the data directory.
pub fn open_store() -> Result<Rc<dyn KeyValueStore>, Box<dyn std::error::Error>> {
    Ok(Rc::new(SqliteStore::open()?))
}

/// Open a planner over the on-disk store for the active user.
pub fn open_planner(now: NaiveDateTime) -> Result<(DayPlanner, Config), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    tracing::debug!(user = %config.active_user, %now, "opening planner");
    let planner = DayPlanner::open(open_store()?, &config.scheduler, now)
        .with_user(config.active_user.clone());
    Ok((planner, config))
}

/// Resolve `--at`, defaulting to the local clock.
pub fn resolve_now(at: Option<&str>) -> Result<NaiveDateTime, Box<dyn std::error::Error>> {
    match at {
        Some(value) => parse_date_time(value)
            .ok_or_else(|| format!("cannot parse '{value}' as a date-time").into()),
        None => Ok(Local::now().naive_local()),
    }
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
