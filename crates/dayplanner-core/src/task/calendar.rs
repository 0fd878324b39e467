//! Calendar feed intake.

use serde::{Deserialize, Serialize};

use super::lenient;
use super::{RawTask, Task};
use crate::scheduler::clock::{clock_time_in, format_hhmm, parse_date_time};
use crate::scheduler::SchedulerConfig;

/// One event as a calendar feed delivers it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarEntry {
    #[serde(deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub uid: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub title: Option<String>,
    /// Date-time the event starts
    #[serde(deserialize_with = "lenient::string")]
    pub start: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub end: Option<String>,
    /// Start of this occurrence for recurring events
    #[serde(deserialize_with = "lenient::string")]
    pub instance_start: Option<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub is_fixed: Option<bool>,
    #[serde(deserialize_with = "lenient::string")]
    pub user: Option<String>,
}

/// Title markers that force an imported event fixed or flexible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMarkers {
    pub fixed: String,
    pub flexible: String,
}

impl Default for TagMarkers {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for TagMarkers {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            fixed: config.fixed_tag.clone(),
            flexible: config.flexible_tag.clone(),
        }
    }
}

/// Remove every occurrence of the markers and collapse whitespace.
pub fn strip_tags(title: &str, tags: &TagMarkers) -> String {
    let mut out = title.to_string();
    for tag in [&tags.fixed, &tags.flexible] {
        if !tag.is_empty() {
            out = out.replace(tag.as_str(), " ");
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turn a calendar entry into a raw task record.
pub fn normalize_calendar_entry(entry: &CalendarEntry, tags: &TagMarkers) -> RawTask {
    let title = entry.title.clone().unwrap_or_default();
    let has = |tag: &str| !tag.is_empty() && title.contains(tag);
    let is_fixed = if has(&tags.fixed) {
        Some(true)
    } else if has(&tags.flexible) {
        Some(false)
    } else {
        entry.is_fixed
    };

    let duration = match (
        entry.start.as_deref().and_then(parse_date_time),
        entry.end.as_deref().and_then(parse_date_time),
    ) {
        (Some(start), Some(end)) if end > start => Some((end - start).num_minutes() as f64),
        _ => None,
    };

    let calendar_uid = entry.uid.clone().or_else(|| entry.id.clone());
    let instance_start = entry.instance_start.clone().or_else(|| entry.start.clone());
    let calendar_instance_id = match (&calendar_uid, &instance_start) {
        (Some(uid), Some(at)) => Some(format!("{uid}:{at}")),
        _ => None,
    };

    let start_time = entry
        .start
        .as_deref()
        .and_then(clock_time_in)
        .map(format_hhmm);

    RawTask {
        name: Some(strip_tags(&title, tags)).filter(|s| !s.is_empty()),
        text: Some(title.clone()).filter(|s| !s.trim().is_empty()),
        source: Some("calendar".to_string()),
        original_tool: Some("calendar".to_string()),
        planner_date: entry.start.clone(),
        start_time,
        duration_minutes: duration.map(Into::into),
        is_fixed,
        calendar_uid,
        calendar_instance_id,
        user: entry.user.clone(),
        ..RawTask::default()
    }
}

/// Identity used to match a re-imported event to its stored task.
pub fn dedup_key(task: &Task) -> String {
    if let Some(id) = task.calendar_instance_id.as_deref().filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    if let Some(uid) = task.calendar_uid.as_deref().filter(|s| !s.is_empty()) {
        return uid.to_string();
    }
    format!(
        "{}|{}",
        task.name,
        task.planner_date.as_deref().unwrap_or_default()
    )
}
