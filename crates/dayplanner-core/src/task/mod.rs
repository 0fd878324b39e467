//! Canonical task entity and its normalization from raw records.
//!
//! Tasks reach the core from manual entry, calendar feeds and planner
//! carry-overs, each with its own idea of which fields exist. [`RawTask`]
//! accepts all of them; [`TaskFactory`] turns one into a fully populated
//! [`Task`] with every field defaulted.

pub mod calendar;
pub mod lenient;

use std::fmt;
use std::rc::Rc;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::duration::DurationLearning;
use crate::scheduler::clock::parse_date_time;
pub use crate::urgency::compute_urgency_from_deadline;

pub use lenient::Numeric;

/// Profile that owns tasks created without an explicit user.
pub const DEFAULT_USER: &str = "main";
/// Configured default when nothing else supplies a duration.
pub const DEFAULT_TASK_MINUTES: u32 = 25;
/// Duration used when even the configured default is unusable.
pub const FALLBACK_TASK_MINUTES: u32 = 60;
/// Neutral importance/urgency.
pub const NEUTRAL_SCORE: u8 = 5;

const UNTITLED: &str = "Untitled Task";

/// Completion status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

/// Where a task came from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskSource {
    #[default]
    Manual,
    Calendar,
    Planner,
    Imported,
}

impl TaskSource {
    /// Map a free-form provenance tag onto a source.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "" | "manual" => TaskSource::Manual,
            "calendar" | "ics" | "google-calendar" => TaskSource::Calendar,
            "planner" | "day-planner" | "dayplanner" => TaskSource::Planner,
            _ => TaskSource::Imported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskSource::Manual => "manual",
            TaskSource::Calendar => "calendar",
            TaskSource::Planner => "planner",
            TaskSource::Imported => "imported",
        }
    }
}

impl fmt::Display for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully normalized task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, immutable once generated
    pub id: String,
    /// Owning profile
    pub user: String,
    /// Display name
    pub name: String,
    /// Raw text as entered
    pub text: String,
    pub source: TaskSource,
    /// Free-form name of the tool that produced the task
    pub original_tool: String,
    pub created_at: NaiveDateTime,
    /// Date or date-time the task is due
    pub deadline: Option<String>,
    /// Date-time a planner placed the task at
    pub planner_date: Option<String>,
    /// Explicit "HH:MM" start
    pub start_time: Option<String>,
    /// Always positive
    pub duration_minutes: u32,
    /// 1-10
    pub importance: u8,
    /// 1-10
    pub urgency: u8,
    /// Id of a task that must complete first
    pub dependency: Option<String>,
    pub status: TaskStatus,
    pub completed_at: Option<NaiveDateTime>,
    pub achievement_score: f64,
    /// Pinned to its start time when scheduling
    pub is_fixed: bool,
    pub calendar_uid: Option<String>,
    pub calendar_instance_id: Option<String>,
    /// Edited locally after a calendar import; re-imports leave it alone
    pub local_override: bool,
    pub assigned_to: Option<String>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// `importance * urgency`, each clamped to 1-10.
    pub fn priority(&self) -> u32 {
        u32::from(self.importance.clamp(1, 10)) * u32::from(self.urgency.clamp(1, 10))
    }

    /// Whether `user` owns the task or has it assigned.
    pub fn belongs_to(&self, user: &str) -> bool {
        self.user == user || self.assigned_to.as_deref() == Some(user)
    }

    /// `importance * hours`, rounded to two decimals.
    pub fn compute_achievement_score(&self) -> f64 {
        let hours = f64::from(self.duration_minutes) / 60.0;
        round2(f64::from(self.importance) * hours)
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    if value.is_finite() {
        (value * 100.0).round() / 100.0
    } else {
        0.0
    }
}

/// A partial, loosely typed task record.
///
/// Field names follow the JSON the collaborators emit, including the
/// aliases older payloads use (`title`, `priority`, `dependsOn`, `hash`...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTask {
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub original_tool: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub planner_date: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<Numeric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Numeric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<Numeric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<Numeric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Numeric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Numeric>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient::flag", skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(deserialize_with = "lenient::flag", skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement_score: Option<Numeric>,
    #[serde(deserialize_with = "lenient::flag", skip_serializing_if = "Option::is_none")]
    pub is_fixed: Option<bool>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub calendar_uid: Option<String>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub calendar_instance_id: Option<String>,
    #[serde(deserialize_with = "lenient::flag", skip_serializing_if = "Option::is_none")]
    pub local_override: Option<bool>,
    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl RawTask {
    /// A record carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Field-wise layering: every field set on `top` replaces ours.
    pub fn layered(&self, top: &RawTask) -> RawTask {
        macro_rules! pick {
            ($($field:ident),* $(,)?) => {
                RawTask {
                    $($field: top.$field.clone().or_else(|| self.$field.clone()),)*
                }
            };
        }
        pick!(
            id,
            hash,
            user,
            name,
            title,
            text,
            source,
            original_tool,
            created_at,
            deadline,
            planner_date,
            start_time,
            duration_minutes,
            duration,
            estimated_minutes,
            importance,
            priority,
            urgency,
            dependency,
            depends_on,
            status,
            completed,
            is_completed,
            completed_at,
            achievement_score,
            is_fixed,
            calendar_uid,
            calendar_instance_id,
            local_override,
            assigned_to,
        )
    }
}

impl From<&Task> for RawTask {
    fn from(task: &Task) -> Self {
        RawTask {
            id: Some(task.id.clone()),
            user: Some(task.user.clone()),
            name: Some(task.name.clone()),
            text: Some(task.text.clone()),
            source: Some(task.source.as_str().to_string()),
            original_tool: Some(task.original_tool.clone()),
            created_at: Some(task.created_at.format("%Y-%m-%dT%H:%M:%S").to_string()),
            deadline: task.deadline.clone(),
            planner_date: task.planner_date.clone(),
            start_time: task.start_time.clone(),
            duration_minutes: Some(task.duration_minutes.into()),
            importance: Some(task.importance.into()),
            urgency: Some(task.urgency.into()),
            dependency: task.dependency.clone(),
            status: Some(
                match task.status {
                    TaskStatus::Pending => "pending",
                    TaskStatus::Completed => "completed",
                }
                .to_string(),
            ),
            completed_at: task
                .completed_at
                .map(|at| at.format("%Y-%m-%dT%H:%M:%S").to_string()),
            achievement_score: Some(task.achievement_score.into()),
            is_fixed: Some(task.is_fixed),
            calendar_uid: task.calendar_uid.clone(),
            calendar_instance_id: task.calendar_instance_id.clone(),
            local_override: Some(task.local_override),
            assigned_to: task.assigned_to.clone(),
            ..RawTask::default()
        }
    }
}

/// Source of fresh task ids.
pub trait IdSource {
    fn next_id(&self) -> String;
}

/// Random UUID v4 ids, prefixed with `task-`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> String {
        format!("task-{}", uuid::Uuid::new_v4())
    }
}

/// Builds normalized tasks from raw records.
///
/// Collaborators are injected; without them the factory falls back to
/// UUID ids, the stock default duration and no learned estimates.
#[derive(Clone)]
pub struct TaskFactory {
    default_task_minutes: u32,
    ids: Rc<dyn IdSource>,
    durations: Option<DurationLearning>,
}

impl fmt::Debug for TaskFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFactory")
            .field("default_task_minutes", &self.default_task_minutes)
            .field("learns_durations", &self.durations.is_some())
            .finish()
    }
}

impl Default for TaskFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskFactory {
    pub fn new() -> Self {
        Self {
            default_task_minutes: DEFAULT_TASK_MINUTES,
            ids: Rc::new(UuidIds),
            durations: None,
        }
    }

    /// Use `minutes` when a record has no duration; zero means 60.
    pub fn with_default_minutes(mut self, minutes: u32) -> Self {
        self.default_task_minutes = minutes;
        self
    }

    pub fn with_id_source(mut self, ids: Rc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Consult learned averages before the configured default.
    pub fn with_duration_learning(mut self, durations: DurationLearning) -> Self {
        self.durations = Some(durations);
        self
    }

    /// Normalize `raw` with `overrides` layered on top, stamped with the
    /// current local time.
    pub fn create(&self, raw: &RawTask, overrides: &RawTask) -> Task {
        self.create_at(raw, overrides, Local::now().naive_local())
    }

    /// Normalize `raw` with `overrides` layered on top.
    ///
    /// Never fails: every field that is missing or malformed gets its
    /// default. `now` stamps creation/completion and anchors the
    /// deadline-derived urgency.
    pub fn create_at(&self, raw: &RawTask, overrides: &RawTask, now: NaiveDateTime) -> Task {
        let r = raw.layered(overrides);

        let created_at = r
            .created_at
            .as_deref()
            .and_then(parse_date_time)
            .unwrap_or(now);
        let user = non_empty(&r.user).unwrap_or(DEFAULT_USER).to_string();
        let name = non_empty(&r.name)
            .or_else(|| non_empty(&r.title))
            .or_else(|| non_empty(&r.text))
            .unwrap_or(UNTITLED)
            .to_string();
        let text = non_empty(&r.text).unwrap_or(name.as_str()).to_string();
        let deadline = r.deadline.clone().or_else(|| r.planner_date.clone());

        let duration_minutes = [&r.duration_minutes, &r.duration, &r.estimated_minutes]
            .into_iter()
            .find_map(|field| field.as_ref().and_then(Numeric::finite).filter(|n| *n > 0.0))
            .map(|n| (n.round() as u32).max(1))
            .or_else(|| {
                self.durations
                    .as_ref()
                    .and_then(|d| d.get_estimated_duration(&name))
            })
            .unwrap_or(match self.default_task_minutes {
                0 => FALLBACK_TASK_MINUTES,
                n => n,
            });

        let importance = clamp_score(
            r.importance
                .as_ref()
                .or(r.priority.as_ref())
                .and_then(Numeric::finite)
                .unwrap_or(f64::from(NEUTRAL_SCORE)),
        );
        let urgency = r
            .urgency
            .as_ref()
            .and_then(Numeric::finite)
            .map(clamp_score)
            .unwrap_or_else(|| compute_urgency_from_deadline(deadline.as_deref(), now.date()));

        let completed = r.status.as_deref() == Some("completed")
            || r.completed.unwrap_or(false)
            || r.is_completed.unwrap_or(false);
        let completed_at = if completed {
            Some(
                r.completed_at
                    .as_deref()
                    .and_then(parse_date_time)
                    .unwrap_or(now),
            )
        } else {
            None
        };

        let source_tag = non_empty(&r.source)
            .or_else(|| non_empty(&r.original_tool))
            .unwrap_or("manual");
        let original_tool = non_empty(&r.original_tool)
            .unwrap_or(source_tag)
            .to_string();

        let id = non_empty(&r.id)
            .or_else(|| non_empty(&r.hash))
            .map(str::to_string)
            .unwrap_or_else(|| self.ids.next_id());

        let mut task = Task {
            id,
            user,
            name,
            text,
            source: TaskSource::from_tag(source_tag),
            original_tool,
            created_at,
            deadline,
            planner_date: r.planner_date.clone(),
            start_time: r.start_time.clone(),
            duration_minutes,
            importance,
            urgency,
            dependency: r.dependency.clone().or_else(|| r.depends_on.clone()),
            status: if completed {
                TaskStatus::Completed
            } else {
                TaskStatus::Pending
            },
            completed_at,
            achievement_score: r
                .achievement_score
                .as_ref()
                .and_then(Numeric::finite)
                .unwrap_or(0.0),
            is_fixed: r.is_fixed.unwrap_or(false),
            calendar_uid: r.calendar_uid.clone(),
            calendar_instance_id: r.calendar_instance_id.clone(),
            local_override: r.local_override.unwrap_or(false),
            assigned_to: r.assigned_to.clone(),
        };

        if task.is_completed() && task.achievement_score == 0.0 {
            task.achievement_score = task.compute_achievement_score();
        }
        task
    }

    /// Re-normalize `task` with `updates` applied, keeping its identity and
    /// creation time.
    pub fn update(&self, task: &Task, updates: &RawTask) -> Task {
        self.update_at(task, updates, Local::now().naive_local())
    }

    pub fn update_at(&self, task: &Task, updates: &RawTask, now: NaiveDateTime) -> Task {
        let pinned = RawTask {
            id: Some(task.id.clone()),
            created_at: Some(task.created_at.format("%Y-%m-%dT%H:%M:%S").to_string()),
            ..RawTask::default()
        };
        let merged = RawTask::from(task).layered(updates).layered(&pinned);
        self.create_at(&merged, &RawTask::default(), now)
    }

    /// Mark `task` completed at `at` and recompute its achievement score.
    pub fn mark_completed(&self, task: &Task, at: NaiveDateTime) -> Task {
        let mut updated = self.update_at(
            task,
            &RawTask {
                status: Some("completed".to_string()),
                completed_at: Some(at.format("%Y-%m-%dT%H:%M:%S").to_string()),
                ..RawTask::default()
            },
            at,
        );
        updated.completed_at = Some(at);
        updated.achievement_score = updated.compute_achievement_score();
        updated
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Round and clamp a score into 1-10; zero and negatives become 1.
pub fn clamp_score(value: f64) -> u8 {
    if !value.is_finite() {
        return NEUTRAL_SCORE;
    }
    value.round().clamp(1.0, 10.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Sequential(Cell<u32>);

    impl IdSource for Sequential {
        fn next_id(&self) -> String {
            let n = self.0.get() + 1;
            self.0.set(n);
            format!("seq-{n}")
        }
    }

    fn now() -> NaiveDateTime {
        parse_date_time("2026-10-19T08:00").unwrap()
    }

    fn factory() -> TaskFactory {
        TaskFactory::new().with_id_source(Rc::new(Sequential(Cell::new(0))))
    }

    #[test]
    fn empty_record_gets_every_default() {
        let task = factory().create_at(&RawTask::default(), &RawTask::default(), now());
        assert_eq!(task.id, "seq-1");
        assert_eq!(task.name, "Untitled Task");
        assert_eq!(task.text, "Untitled Task");
        assert_eq!(task.user, DEFAULT_USER);
        assert_eq!(task.duration_minutes, DEFAULT_TASK_MINUTES);
        assert_eq!(task.importance, 5);
        assert_eq!(task.urgency, 5);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.source, TaskSource::Manual);
        assert_eq!(task.original_tool, "manual");
        assert_eq!(task.created_at, now());
        assert!(!task.is_fixed);
    }

    #[test]
    fn name_falls_back_through_title_and_text() {
        let f = factory();
        let raw = RawTask {
            title: Some("From title".into()),
            text: Some("From text".into()),
            ..RawTask::default()
        };
        let task = f.create_at(&raw, &RawTask::default(), now());
        assert_eq!(task.name, "From title");
        assert_eq!(task.text, "From text");

        let raw = RawTask {
            text: Some("Only text".into()),
            ..RawTask::default()
        };
        assert_eq!(f.create_at(&raw, &RawTask::default(), now()).name, "Only text");
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let raw: RawTask = serde_json::from_str(
            r#"{"name": "x", "durationMinutes": "soon", "importance": "very", "urgency": null}"#,
        )
        .unwrap();
        let task = factory().create_at(&raw, &RawTask::default(), now());
        assert_eq!(task.duration_minutes, DEFAULT_TASK_MINUTES);
        assert_eq!(task.importance, 5);
        assert_eq!(task.urgency, 5);
    }

    #[test]
    fn non_positive_duration_uses_next_candidate() {
        let raw = RawTask {
            duration_minutes: Some(0u32.into()),
            estimated_minutes: Some("45".into()),
            ..RawTask::named("x")
        };
        assert_eq!(
            factory().create_at(&raw, &RawTask::default(), now()).duration_minutes,
            45
        );
    }

    #[test]
    fn scores_are_clamped() {
        let raw = RawTask {
            importance: Some(0u32.into()),
            urgency: Some(42u32.into()),
            ..RawTask::named("x")
        };
        let task = factory().create_at(&raw, &RawTask::default(), now());
        assert_eq!(task.importance, 1);
        assert_eq!(task.urgency, 10);

        let raw = RawTask {
            priority: Some(8u32.into()),
            ..RawTask::named("x")
        };
        assert_eq!(factory().create_at(&raw, &RawTask::default(), now()).importance, 8);
    }

    #[test]
    fn urgency_derives_from_deadline_or_planner_date() {
        let raw = RawTask {
            deadline: Some("2026-10-20".into()),
            ..RawTask::named("x")
        };
        let task = factory().create_at(&raw, &RawTask::default(), now());
        assert_eq!(task.urgency, 9);

        let raw = RawTask {
            planner_date: Some("2026-10-19T15:00".into()),
            ..RawTask::named("x")
        };
        let task = factory().create_at(&raw, &RawTask::default(), now());
        assert_eq!(task.deadline.as_deref(), Some("2026-10-19T15:00"));
        assert_eq!(task.urgency, 10);
    }

    #[test]
    fn overrides_win_and_raw_is_untouched() {
        let raw = RawTask {
            importance: Some(2u32.into()),
            ..RawTask::named("Original")
        };
        let snapshot = raw.clone();
        let overrides = RawTask {
            name: Some("Overridden".into()),
            importance: Some(9u32.into()),
            ..RawTask::default()
        };
        let task = factory().create_at(&raw, &overrides, now());
        assert_eq!(task.name, "Overridden");
        assert_eq!(task.importance, 9);
        assert_eq!(raw, snapshot);
    }

    #[test]
    fn legacy_aliases_are_honoured() {
        let raw: RawTask = serde_json::from_str(
            r#"{"hash": "task-77", "title": "Legacy", "dependsOn": "task-1",
                "isCompleted": true, "completedAt": "2026-10-18T10:00:00",
                "duration": 90, "importance": 4}"#,
        )
        .unwrap();
        let task = factory().create_at(&raw, &RawTask::default(), now());
        assert_eq!(task.id, "task-77");
        assert_eq!(task.dependency.as_deref(), Some("task-1"));
        assert!(task.is_completed());
        assert_eq!(task.completed_at, parse_date_time("2026-10-18T10:00"));
        assert_eq!(task.achievement_score, 6.0);
    }

    #[test]
    fn completed_without_timestamp_is_stamped() {
        let raw = RawTask {
            completed: Some(true),
            ..RawTask::named("x")
        };
        let task = factory().create_at(&raw, &RawTask::default(), now());
        assert_eq!(task.completed_at, Some(now()));
    }

    #[test]
    fn source_and_tool_fall_back_to_each_other() {
        let raw = RawTask {
            original_tool: Some("calendar".into()),
            ..RawTask::named("x")
        };
        let task = factory().create_at(&raw, &RawTask::default(), now());
        assert_eq!(task.source, TaskSource::Calendar);
        assert_eq!(task.original_tool, "calendar");

        let raw = RawTask {
            source: Some("pomodoro".into()),
            ..RawTask::named("x")
        };
        let task = factory().create_at(&raw, &RawTask::default(), now());
        assert_eq!(task.source, TaskSource::Imported);
        assert_eq!(task.original_tool, "pomodoro");
    }

    #[test]
    fn update_keeps_identity() {
        let f = factory();
        let task = f.create_at(&RawTask::named("Write report"), &RawTask::default(), now());
        let updated = f.update_at(
            &task,
            &RawTask {
                id: Some("hijack".into()),
                importance: Some(9u32.into()),
                ..RawTask::default()
            },
            now(),
        );
        assert_eq!(updated.id, task.id);
        assert_eq!(updated.created_at, task.created_at);
        assert_eq!(updated.importance, 9);
        assert_eq!(updated.name, "Write report");
    }

    #[test]
    fn mark_completed_scores_the_task() {
        let f = factory();
        let raw = RawTask {
            importance: Some(6u32.into()),
            duration_minutes: Some(90u32.into()),
            ..RawTask::named("Deep work")
        };
        let task = f.create_at(&raw, &RawTask::default(), now());
        let at = parse_date_time("2026-10-19T11:00").unwrap();
        let done = f.mark_completed(&task, at);
        assert!(done.is_completed());
        assert_eq!(done.completed_at, Some(at));
        assert_eq!(done.achievement_score, 9.0);
    }

    #[test]
    fn task_json_reads_back_as_raw() {
        let f = factory();
        let task = f.create_at(&RawTask::named("Roundtrip"), &RawTask::default(), now());
        let json = serde_json::to_value(&task).unwrap();
        let raw: RawTask = serde_json::from_value(json).unwrap();
        let again = f.create_at(&raw, &RawTask::default(), now());
        assert_eq!(again, task);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn created_tasks_hold_invariants(
                duration in prop::option::of(-1000.0f64..1000.0),
                importance in prop::option::of(-50.0f64..50.0),
                urgency in prop::option::of(-50.0f64..50.0),
                name in prop::option::of(".{0,12}"),
            ) {
                let raw = RawTask {
                    name,
                    duration_minutes: duration.map(Numeric::from),
                    importance: importance.map(Numeric::from),
                    urgency: urgency.map(Numeric::from),
                    ..RawTask::default()
                };
                let task = factory().create_at(&raw, &RawTask::default(), now());
                prop_assert!(task.duration_minutes > 0);
                prop_assert!((1..=10).contains(&task.importance));
                prop_assert!((1..=10).contains(&task.urgency));
                prop_assert!(!task.id.is_empty());
                prop_assert!(!task.name.trim().is_empty());
            }
        }
    }
}
