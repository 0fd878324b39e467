//! Day scheduler.
//!
//! Lays one day's candidate tasks onto the day window:
//! - Fixed tasks are anchored at their start time, compressed forward when
//!   they collide, never dropped
//! - Flexible tasks fill the gaps before and after the anchors in priority
//!   order
//! - Flexible tasks that do not fit are reported as deferred
//!
//! The scheduler is a pure function of its inputs; filtering of blocked
//! tasks and urgency smoothing happen upstream in the planner.

pub mod clock;

use std::collections::VecDeque;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::task::{Task, DEFAULT_TASK_MINUTES, FALLBACK_TASK_MINUTES};
use clock::{at_minutes, clock_time_in, minutes_of, parse_time_to_minutes, DayWindow};

/// Scheduler configuration, the `[scheduler]` section of `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// "HH:MM" the day starts at
    pub day_start: String,
    /// "HH:MM" the day ends at; at or before `day_start` means midnight
    pub day_end: String,
    /// Duration for tasks that carry none
    pub default_task_minutes: u32,
    /// Title marker that pins a task to its start time
    pub fixed_tag: String,
    /// Title marker that keeps a timed task flexible
    pub flexible_tag: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            day_start: "07:00".to_string(),
            day_end: "22:00".to_string(),
            default_task_minutes: DEFAULT_TASK_MINUTES,
            fixed_tag: "[FIX]".to_string(),
            flexible_tag: "[FLEX]".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn day_window(&self) -> DayWindow {
        DayWindow::from_clock_strings(&self.day_start, &self.day_end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Fixed,
    Flexible,
}

/// A task placed on the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub task: Task,
    pub start_minutes: u32,
    pub end_minutes: u32,
    pub kind: SlotKind,
}

impl Slot {
    pub fn duration_minutes(&self) -> u32 {
        self.end_minutes - self.start_minutes
    }

    /// Whether `minute` falls in `[start, end)`.
    pub fn contains(&self, minute: u32) -> bool {
        self.start_minutes <= minute && minute < self.end_minutes
    }

    pub fn start_at(&self, date: NaiveDate) -> NaiveDateTime {
        at_minutes(date, self.start_minutes)
    }

    pub fn end_at(&self, date: NaiveDate) -> NaiveDateTime {
        at_minutes(date, self.end_minutes)
    }
}

/// Output of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    /// Placed tasks, ordered by start
    pub slots: Vec<Slot>,
    /// Flexible tasks that did not fit, in priority order
    pub deferred: Vec<Task>,
}

impl DaySchedule {
    /// The slot running at `now`.
    pub fn current_task(&self, now: NaiveTime) -> Option<&Slot> {
        let minute = minutes_of(now);
        self.slots.iter().find(|slot| slot.contains(minute))
    }

    /// Slots starting after `now`.
    pub fn upcoming(&self, now: NaiveTime) -> impl Iterator<Item = &Slot> {
        let minute = minutes_of(now);
        self.slots.iter().filter(move |slot| slot.start_minutes > minute)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Start time a task asks for, in minutes from midnight.
///
/// An explicit `startTime` wins, then the clock time of a deadline written
/// with a `T`, then the clock time of the planner date.
pub fn start_candidate(task: &Task) -> Option<u32> {
    task.start_time
        .as_deref()
        .and_then(parse_time_to_minutes)
        .or_else(|| {
            task.deadline
                .as_deref()
                .filter(|d| d.contains('T'))
                .and_then(clock_time_in)
        })
        .or_else(|| task.planner_date.as_deref().and_then(clock_time_in))
}

/// Minutes a task occupies; zero falls back to an hour.
pub fn effective_minutes(task: &Task) -> u32 {
    match task.duration_minutes {
        0 => FALLBACK_TASK_MINUTES,
        n => n,
    }
}

/// Lays tasks onto a day window.
#[derive(Debug, Clone, Default)]
pub struct DayScheduler {
    config: SchedulerConfig,
}

impl DayScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn window(&self) -> DayWindow {
        self.config.day_window()
    }

    /// Anchor for `task` if it is fixed, already clamped into the window.
    /// Title tags match in either the name or the raw text.
    pub fn fixed_anchor(&self, task: &Task) -> Option<u32> {
        let window = self.window();
        let start = start_candidate(task)?;
        let tagged =
            |tag: &str| !tag.is_empty() && (task.name.contains(tag) || task.text.contains(tag));

        if task.is_fixed || tagged(&self.config.fixed_tag) {
            Some(window.clamp(start))
        } else if !tagged(&self.config.flexible_tag) && window.contains(start) {
            Some(start)
        } else {
            None
        }
    }

    /// Build the day's schedule from `tasks`.
    ///
    /// Deterministic: the same slice and config always give the same result.
    pub fn build_schedule(&self, tasks: &[Task]) -> DaySchedule {
        let window = self.window();

        let mut fixed: Vec<(&Task, u32)> = Vec::new();
        let mut flexible: Vec<&Task> = Vec::new();
        for task in tasks {
            match self.fixed_anchor(task) {
                Some(anchor) => fixed.push((task, anchor)),
                None => flexible.push(task),
            }
        }
        fixed.sort_by_key(|(_, anchor)| *anchor);
        flexible.sort_by(|a, b| b.priority().cmp(&a.priority()));

        let mut queue: VecDeque<&Task> = flexible.into();
        let mut slots = Vec::with_capacity(tasks.len());
        let mut cursor = window.start();

        for (task, anchor) in fixed {
            fill_gap(&mut queue, &mut cursor, anchor, &mut slots);

            let start = cursor.max(anchor);
            let end = start
                .saturating_add(effective_minutes(task))
                .min(window.end())
                .max(start);
            slots.push(Slot {
                task: task.clone(),
                start_minutes: start,
                end_minutes: end,
                kind: SlotKind::Fixed,
            });
            cursor = end;
        }
        fill_gap(&mut queue, &mut cursor, window.end(), &mut slots);

        let deferred: Vec<Task> = queue.into_iter().cloned().collect();
        tracing::debug!(
            tasks = tasks.len(),
            placed = slots.len(),
            deferred = deferred.len(),
            window_start = window.start(),
            window_end = window.end(),
            "day schedule built"
        );
        DaySchedule { slots, deferred }
    }
}

/// Place queued flexible tasks in `[cursor, limit)` until the head no
/// longer fits.
fn fill_gap(queue: &mut VecDeque<&Task>, cursor: &mut u32, limit: u32, slots: &mut Vec<Slot>) {
    while let Some(&head) = queue.front() {
        let end = cursor.saturating_add(effective_minutes(head));
        if end > limit {
            break;
        }
        slots.push(Slot {
            task: head.clone(),
            start_minutes: *cursor,
            end_minutes: end,
            kind: SlotKind::Flexible,
        });
        *cursor = end;
        queue.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{RawTask, TaskFactory};
    use clock::MINUTES_PER_DAY;

    fn now() -> NaiveDateTime {
        clock::parse_date_time("2026-10-19T06:00").unwrap()
    }

    fn task(name: &str, f: impl FnOnce(&mut RawTask)) -> Task {
        let mut raw = RawTask::named(name);
        raw.id = Some(name.to_lowercase().replace(' ', "-"));
        f(&mut raw);
        TaskFactory::new().create_at(&raw, &RawTask::default(), now())
    }

    fn fixed_at(name: &str, start: &str, minutes: u32) -> Task {
        task(name, |r| {
            r.start_time = Some(start.into());
            r.duration_minutes = Some(minutes.into());
        })
    }

    fn flexible(name: &str, importance: u8, urgency: u8, minutes: u32) -> Task {
        task(name, |r| {
            r.importance = Some(importance.into());
            r.urgency = Some(urgency.into());
            r.duration_minutes = Some(minutes.into());
        })
    }

    fn span(slot: &Slot) -> (u32, u32) {
        (slot.start_minutes, slot.end_minutes)
    }

    #[test]
    fn colliding_fixed_tasks_compress_forward() {
        let tasks = vec![fixed_at("A", "09:00", 30), fixed_at("B", "09:15", 30)];
        let schedule = DayScheduler::new().build_schedule(&tasks);
        assert_eq!(schedule.slots.len(), 2);
        assert_eq!(span(&schedule.slots[0]), (540, 570));
        assert_eq!(span(&schedule.slots[1]), (570, 600));
        assert!(schedule.slots.iter().all(|s| s.kind == SlotKind::Fixed));
    }

    #[test]
    fn flexible_fills_gap_before_anchor() {
        let tasks = vec![
            fixed_at("Standup", "10:00", 30),
            flexible("Deep work", 8, 8, 60),
            flexible("Long review", 3, 3, 150),
        ];
        let schedule = DayScheduler::new().build_schedule(&tasks);
        let spans: Vec<_> = schedule
            .slots
            .iter()
            .map(|s| (s.task.name.as_str(), span(s)))
            .collect();
        assert_eq!(
            spans,
            vec![
                ("Deep work", (420, 480)),
                ("Standup", (600, 630)),
                ("Long review", (630, 780)),
            ]
        );
        assert!(schedule.deferred.is_empty());
    }

    #[test]
    fn head_of_line_stops_the_gap_fill() {
        // the big task blocks the small one from the morning gap
        let tasks = vec![
            fixed_at("Anchor", "08:00", 30),
            flexible("Big", 9, 9, 120),
            flexible("Small", 1, 1, 15),
        ];
        let schedule = DayScheduler::new().build_schedule(&tasks);
        assert_eq!(schedule.slots[0].task.name, "Anchor");
        assert_eq!(span(&schedule.slots[1]), (510, 630));
        assert_eq!(span(&schedule.slots[2]), (630, 645));
    }

    #[test]
    fn overflow_is_deferred() {
        let cfg = SchedulerConfig {
            day_start: "09:00".into(),
            day_end: "10:00".into(),
            ..SchedulerConfig::default()
        };
        let tasks = vec![flexible("One", 5, 5, 45), flexible("Two", 4, 4, 30)];
        let schedule = DayScheduler::with_config(cfg).build_schedule(&tasks);
        assert_eq!(schedule.slots.len(), 1);
        assert_eq!(schedule.deferred.len(), 1);
        assert_eq!(schedule.deferred[0].name, "Two");
    }

    #[test]
    fn fixed_slot_is_clamped_at_midnight() {
        let cfg = SchedulerConfig {
            day_end: "00:00".into(),
            ..SchedulerConfig::default()
        };
        let tasks = vec![fixed_at("Late", "23:30", 120)];
        let schedule = DayScheduler::with_config(cfg).build_schedule(&tasks);
        assert_eq!(span(&schedule.slots[0]), (23 * 60 + 30, MINUTES_PER_DAY));
    }

    #[test]
    fn fixed_past_day_end_is_emitted_once_at_day_end() {
        let late = task("Late call", |r| {
            r.start_time = Some("23:00".into());
            r.is_fixed = Some(true);
        });
        let schedule = DayScheduler::new().build_schedule(&[late]);
        assert_eq!(schedule.slots.len(), 1);
        assert_eq!(span(&schedule.slots[0]), (22 * 60, 22 * 60));
    }

    #[test]
    fn out_of_window_start_without_flag_is_flexible() {
        let early = fixed_at("Early", "05:00", 30);
        let schedule = DayScheduler::new().build_schedule(&[early]);
        assert_eq!(schedule.slots[0].kind, SlotKind::Flexible);
        assert_eq!(span(&schedule.slots[0]), (420, 450));
    }

    #[test]
    fn tags_override_partition() {
        let flex = fixed_at("Gym [FLEX]", "09:00", 60);
        let pinned = task("Dentist [FIX]", |r| {
            r.planner_date = Some("2026-10-19T06:30".into());
            r.duration_minutes = Some(30u32.into());
        });
        let scheduler = DayScheduler::new();
        assert_eq!(scheduler.fixed_anchor(&flex), None);
        assert_eq!(scheduler.fixed_anchor(&pinned), Some(420));
    }

    #[test]
    fn start_resolves_from_deadline_then_planner_date() {
        let t = task("x", |r| {
            r.deadline = Some("2026-10-19T14:00".into());
            r.planner_date = Some("2026-10-19T16:00".into());
        });
        assert_eq!(start_candidate(&t), Some(14 * 60));

        let t = task("x", |r| {
            r.deadline = Some("2026-10-19".into());
            r.planner_date = Some("2026-10-19T16:00".into());
        });
        assert_eq!(start_candidate(&t), Some(16 * 60));
    }

    #[test]
    fn zero_duration_takes_an_hour() {
        let mut t = flexible("Zero", 5, 5, 10);
        t.duration_minutes = 0;
        let schedule = DayScheduler::new().build_schedule(&[t]);
        assert_eq!(span(&schedule.slots[0]), (420, 480));
    }

    #[test]
    fn current_and_upcoming() {
        let tasks = vec![fixed_at("A", "09:00", 30), fixed_at("B", "11:00", 30)];
        let schedule = DayScheduler::new().build_schedule(&tasks);
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(schedule.current_task(t(9, 10)).unwrap().task.name, "A");
        assert!(schedule.current_task(t(9, 30)).is_none());
        let next: Vec<_> = schedule.upcoming(t(9, 10)).map(|s| s.task.name.as_str()).collect();
        assert_eq!(next, vec!["B"]);

        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(
            schedule.slots[1].start_at(date),
            clock::parse_date_time("2026-10-19T11:00").unwrap()
        );
    }

    #[test]
    fn empty_input_gives_empty_schedule() {
        let schedule = DayScheduler::new().build_schedule(&[]);
        assert!(schedule.is_empty());
        assert!(schedule.deferred.is_empty());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_task() -> impl Strategy<Value = Task> {
            (
                0usize..1000,
                prop::option::of(0u32..24 * 60),
                1u32..300,
                1u8..=10,
                1u8..=10,
                any::<bool>(),
            )
                .prop_map(|(n, start, minutes, importance, urgency, is_fixed)| {
                    task(&format!("t{n}"), |r| {
                        r.start_time = start.map(clock::format_hhmm);
                        r.duration_minutes = Some(minutes.into());
                        r.importance = Some(importance.into());
                        r.urgency = Some(urgency.into());
                        r.is_fixed = Some(is_fixed);
                    })
                })
        }

        proptest! {
            #[test]
            fn slots_are_ordered_and_inside_the_window(
                tasks in prop::collection::vec(arb_task(), 0..20),
                start in 0u32..24 * 60,
                end in 0u32..=24 * 60,
            ) {
                let cfg = SchedulerConfig {
                    day_start: clock::format_hhmm(start),
                    day_end: clock::format_hhmm(end),
                    ..SchedulerConfig::default()
                };
                let scheduler = DayScheduler::with_config(cfg);
                let window = scheduler.window();
                let schedule = scheduler.build_schedule(&tasks);

                let mut cursor = window.start();
                for slot in &schedule.slots {
                    prop_assert!(slot.start_minutes >= cursor);
                    prop_assert!(slot.end_minutes >= slot.start_minutes);
                    prop_assert!(slot.end_minutes <= window.end());
                    prop_assert!(slot.end_minutes <= MINUTES_PER_DAY);
                    cursor = slot.end_minutes;
                }

                let fixed_count = tasks.iter().filter(|t| scheduler.fixed_anchor(t).is_some()).count();
                let placed_fixed = schedule.slots.iter().filter(|s| s.kind == SlotKind::Fixed).count();
                prop_assert_eq!(fixed_count, placed_fixed);
                prop_assert_eq!(schedule.slots.len() + schedule.deferred.len(), tasks.len());
            }

            #[test]
            fn scheduling_is_deterministic(tasks in prop::collection::vec(arb_task(), 0..15)) {
                let scheduler = DayScheduler::new();
                prop_assert_eq!(scheduler.build_schedule(&tasks), scheduler.build_schedule(&tasks));
            }
        }
    }
}
