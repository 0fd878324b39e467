//! Day planner: wires the store, urgency, duration learning and scheduler
//! together for one session.

use std::rc::Rc;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::duration::DurationLearning;
use crate::error::{Result, ValidationError};
use crate::events::{Event, EventBus};
use crate::scheduler::clock::{at_minutes, format_planner_date, minutes_of, parse_date_time, MINUTES_PER_DAY};
use crate::scheduler::{DaySchedule, DayScheduler, SchedulerConfig, Slot};
use crate::storage::KeyValueStore;
use crate::store::TaskStore;
use crate::task::{RawTask, Task, TaskFactory};
use crate::urgency::{compute_smoothed_urgency, smooth_urgency, SkipLedger};

/// Where a skipped task goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipTarget {
    /// Today at day end
    EndOfDay,
    /// Same clock time tomorrow
    Tomorrow,
    At(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum SkipOutcome {
    Rescheduled { task: Task, skips: u32 },
    /// The dependency is planned after the target and was not moved.
    DependencyConflict {
        dependency_id: String,
        dependency_at: NaiveDateTime,
    },
}

pub struct DayPlanner {
    store: TaskStore,
    ledger: SkipLedger,
    durations: DurationLearning,
    scheduler: DayScheduler,
    bus: EventBus,
    user: Option<String>,
}

impl DayPlanner {
    /// Build a planner over `kv`, loading the task collection.
    pub fn open(kv: Rc<dyn KeyValueStore>, config: &SchedulerConfig, now: NaiveDateTime) -> Self {
        let bus = EventBus::new();
        let durations = DurationLearning::new(Rc::clone(&kv)).with_events(bus.clone());
        let factory = TaskFactory::new()
            .with_default_minutes(config.default_task_minutes)
            .with_duration_learning(durations.clone());
        let store = TaskStore::load(Rc::clone(&kv), factory, bus.clone(), now);
        let ledger = SkipLedger::new(kv).with_events(bus.clone());

        Self {
            store,
            ledger,
            durations,
            scheduler: DayScheduler::with_config(config.clone()),
            bus,
            user: None,
        }
    }

    /// Restrict planning to tasks owned by or assigned to `user`.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore {
        &mut self.store
    }

    pub fn ledger(&self) -> &SkipLedger {
        &self.ledger
    }

    pub fn durations(&self) -> &DurationLearning {
        &self.durations
    }

    pub fn scheduler(&self) -> &DayScheduler {
        &self.scheduler
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn visible_pending(&self) -> impl Iterator<Item = &Task> {
        self.store.tasks().iter().filter(move |t| {
            !t.is_completed() && self.user.as_deref().map_or(true, |u| t.belongs_to(u))
        })
    }

    /// Whether `task` waits on a dependency that is not done yet.
    pub fn is_blocked(&self, task: &Task) -> bool {
        task.dependency
            .as_deref()
            .filter(|dep| !dep.is_empty())
            .and_then(|dep| self.store.get_by_hash(dep))
            .is_some_and(|dep| !dep.is_completed())
    }

    pub fn blocked_tasks(&self) -> Vec<Task> {
        self.visible_pending()
            .filter(|t| self.is_blocked(t))
            .cloned()
            .collect()
    }

    /// Tasks eligible for today's schedule, urgency replaced by its
    /// smoothed value.
    pub fn candidate_tasks(&self, now: NaiveDateTime) -> Vec<Task> {
        let today = now.date();
        self.visible_pending()
            .filter(|t| !self.is_blocked(t))
            .filter(|t| {
                t.planner_date
                    .as_deref()
                    .and_then(parse_date_time)
                    .map_or(true, |at| at.date() <= today)
            })
            .map(|t| {
                let mut task = t.clone();
                task.urgency = compute_smoothed_urgency(t, &self.ledger, now);
                task
            })
            .collect()
    }

    pub fn schedule_for(&self, now: NaiveDateTime) -> DaySchedule {
        self.scheduler.build_schedule(&self.candidate_tasks(now))
    }

    pub fn current_task(&self, now: NaiveDateTime) -> Option<Slot> {
        self.schedule_for(now).current_task(now.time()).cloned()
    }

    fn resolve_target(&self, id: &str, target: SkipTarget, now: NaiveDateTime) -> NaiveDateTime {
        match target {
            SkipTarget::EndOfDay => {
                let end = self.scheduler.window().end().min(MINUTES_PER_DAY - 1);
                at_minutes(now.date(), end)
            }
            SkipTarget::Tomorrow => {
                let base = self
                    .schedule_for(now)
                    .slots
                    .iter()
                    .find(|slot| slot.task.id == id)
                    .map(|slot| slot.start_at(now.date()))
                    .unwrap_or(now);
                base + Duration::days(1)
            }
            SkipTarget::At(at) => at,
        }
    }

    /// Defer a task to `target`, escalating its urgency.
    ///
    /// When an unfinished dependency is planned after the target the skip is
    /// refused, unless `move_dependency` is set, in which case the
    /// dependency moves to the target date keeping its clock time.
    pub fn skip_task(
        &mut self,
        id: &str,
        target: SkipTarget,
        now: NaiveDateTime,
        move_dependency: bool,
    ) -> Result<SkipOutcome> {
        let task = self
            .store
            .get_by_hash(id)
            .cloned()
            .ok_or_else(|| ValidationError::TaskNotFound(id.to_string()))?;
        let target_at = self.resolve_target(id, target, now);

        if let Some(dep) = task
            .dependency
            .as_deref()
            .and_then(|dep| self.store.get_by_hash(dep))
            .filter(|dep| !dep.is_completed())
            .cloned()
        {
            let dep_at = dep
                .planner_date
                .as_deref()
                .or(dep.deadline.as_deref())
                .and_then(parse_date_time);
            if let Some(dep_at) = dep_at.filter(|at| *at > target_at) {
                if !move_dependency {
                    return Ok(SkipOutcome::DependencyConflict {
                        dependency_id: dep.id,
                        dependency_at: dep_at,
                    });
                }
                let moved = format_planner_date(at_minutes(target_at.date(), minutes_of(dep_at.time())));
                tracing::info!(dependency = %dep.id, to = %moved, "moving dependency with skipped task");
                self.store.update_by_hash(
                    &dep.id,
                    &RawTask {
                        deadline: Some(dep.deadline.clone().unwrap_or_else(|| moved.clone())),
                        planner_date: Some(moved),
                        ..RawTask::default()
                    },
                    now,
                )?;
            }
        }

        let skips = self.ledger.increment_skip_count_at(id, now)?;
        let bumped = (u32::from(task.urgency) + 1 + skips.min(2)).min(10) as u8;
        let urgency = smooth_urgency(bumped, task.deadline.as_deref(), skips, now);
        let planned = format_planner_date(target_at);

        let updated = self
            .store
            .update_by_hash(
                id,
                &RawTask {
                    planner_date: Some(planned.clone()),
                    deadline: Some(planned),
                    urgency: Some(urgency.into()),
                    ..RawTask::default()
                },
                now,
            )?
            .ok_or_else(|| ValidationError::TaskNotFound(id.to_string()))?;

        self.bus.publish(Event::ScheduleNeedsRefresh {
            reason: format!("task {id} skipped"),
            at: now,
        });
        Ok(SkipOutcome::Rescheduled {
            task: updated,
            skips,
        })
    }

    /// Complete a task, learning from the observed duration when given.
    pub fn complete_task(
        &mut self,
        id: &str,
        observed_minutes: Option<f64>,
        at: NaiveDateTime,
    ) -> Result<Task> {
        let task = self
            .store
            .mark_complete(id, at)?
            .ok_or_else(|| ValidationError::TaskNotFound(id.to_string()))?;
        if let Some(minutes) = observed_minutes {
            self.durations.record_task_duration_at(&task.name, minutes, at)?;
        }
        self.bus.publish(Event::ScheduleNeedsRefresh {
            reason: format!("task {id} completed"),
            at,
        });
        Ok(task)
    }
}
