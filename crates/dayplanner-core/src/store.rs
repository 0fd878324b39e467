//! Task store: the single writer of the task collection.
//!
//! Holds the normalized collection in memory and writes it through to the
//! injected [`KeyValueStore`] on every mutation.

use std::collections::HashSet;
use std::rc::Rc;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StorageError, ValidationError};
use crate::events::{Event, EventBus};
use crate::storage::{read_json_or_default, write_json, KeyValueStore, LEGACY_HUB_KEY, TASKS_KEY};
use crate::task::calendar::{dedup_key, normalize_calendar_entry, CalendarEntry, TagMarkers};
use crate::task::{round2, RawTask, Task, TaskFactory};

/// Legacy single-document payload.
#[derive(Debug, Default, Deserialize)]
struct LegacyHub {
    #[serde(default)]
    tasks: Vec<Value>,
}

/// Completed work for one task name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreGroup {
    pub name: String,
    pub count: usize,
    pub score: f64,
}

/// Achievement totals over completed tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTotals {
    /// One group per task name, in first-seen order
    pub groups: Vec<ScoreGroup>,
    pub total_score: f64,
}

/// Outcome of a calendar import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub added: usize,
    pub updated: usize,
    /// Existing tasks left alone because they were edited locally
    pub preserved: usize,
    /// Entries repeated within the same batch
    pub duplicates: usize,
}

pub struct TaskStore {
    kv: Rc<dyn KeyValueStore>,
    factory: TaskFactory,
    bus: EventBus,
    tasks: Vec<Task>,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks.len())
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}

impl TaskStore {
    /// Load the collection from `kv`.
    ///
    /// Reads the unified key, falling back to the legacy payload when it is
    /// absent. Corrupt payloads load as empty; records are normalized with
    /// `now` as their reference time.
    pub fn load(
        kv: Rc<dyn KeyValueStore>,
        factory: TaskFactory,
        bus: EventBus,
        now: NaiveDateTime,
    ) -> Self {
        let (records, migrated) = match kv.get(TASKS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Value>>(&raw) {
                Ok(records) => (records, false),
                Err(e) => {
                    tracing::warn!(key = TASKS_KEY, error = %e, "task collection is corrupt, starting empty");
                    (Vec::new(), false)
                }
            },
            Ok(None) => {
                let legacy: LegacyHub = read_json_or_default(kv.as_ref(), LEGACY_HUB_KEY);
                let migrated = !legacy.tasks.is_empty();
                (legacy.tasks, migrated)
            }
            Err(e) => {
                tracing::warn!(key = TASKS_KEY, error = %e, "failed to read task collection");
                (Vec::new(), false)
            }
        };

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(records.len());
        for record in records {
            let raw: RawTask = match serde_json::from_value(record) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable task record");
                    continue;
                }
            };
            let task = factory.create_at(&raw, &RawTask::default(), now);
            if seen.insert(task.id.clone()) {
                tasks.push(task);
            } else {
                tracing::warn!(task_id = %task.id, "dropping task with duplicate id");
            }
        }

        let store = Self {
            kv,
            factory,
            bus,
            tasks,
        };
        if migrated {
            tracing::info!(count = store.tasks.len(), "migrating legacy task payload");
            if let Err(e) = store.persist() {
                tracing::warn!(error = %e, "legacy tasks loaded but not migrated");
            }
        }
        store
    }

    pub fn factory(&self) -> &TaskFactory {
        &self.factory
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get_all_tasks(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn get_pending_tasks(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| !t.is_completed())
            .cloned()
            .collect()
    }

    pub fn get_by_hash(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks owned by or assigned to `user`.
    pub fn get_tasks_by_user(&self, user: &str) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.belongs_to(user))
            .cloned()
            .collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn persist(&self) -> Result<(), StorageError> {
        write_json(self.kv.as_ref(), TASKS_KEY, &self.tasks).inspect_err(|e| {
            tracing::error!(error = %e, "failed to persist tasks");
        })
    }

    /// Create a task from `raw` and append it.
    pub fn add(&mut self, raw: &RawTask, now: NaiveDateTime) -> Result<Task> {
        let task = self.factory.create_at(raw, &RawTask::default(), now);
        if self.position(&task.id).is_some() {
            return Err(ValidationError::DuplicateId(task.id).into());
        }
        self.tasks.push(task.clone());
        self.persist()?;
        self.bus.publish(Event::TaskAdded {
            task_id: task.id.clone(),
            at: now,
        });
        Ok(task)
    }

    /// Apply `updates` to the task with `id`. Returns `None` when absent.
    ///
    /// Editing a calendar-imported task marks it as locally overridden.
    pub fn update_by_hash(
        &mut self,
        id: &str,
        updates: &RawTask,
        now: NaiveDateTime,
    ) -> Result<Option<Task>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let current = &self.tasks[index];
        let mut updates = updates.clone();
        if current.calendar_uid.is_some() && updates.local_override.is_none() {
            updates.local_override = Some(true);
        }
        let updated = self.factory.update_at(current, &updates, now);
        self.tasks[index] = updated.clone();
        self.persist()?;
        self.bus.publish(Event::TaskUpdated {
            task_id: updated.id.clone(),
            at: now,
        });
        Ok(Some(updated))
    }

    /// Update the task `raw` names by id, or add it when unknown.
    pub fn upsert_by_hash(&mut self, raw: &RawTask, now: NaiveDateTime) -> Result<Task> {
        let id = raw.id.as_deref().or(raw.hash.as_deref());
        if let Some(id) = id.filter(|id| self.position(id).is_some()) {
            let id = id.to_string();
            if let Some(task) = self.update_by_hash(&id, raw, now)? {
                return Ok(task);
            }
        }
        self.add(raw, now)
    }

    /// Mark the task with `id` completed at `at`.
    ///
    /// Already-completed tasks are returned unchanged.
    pub fn mark_complete(&mut self, id: &str, at: NaiveDateTime) -> Result<Option<Task>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        if self.tasks[index].is_completed() {
            return Ok(Some(self.tasks[index].clone()));
        }

        let done = self.factory.mark_completed(&self.tasks[index], at);
        self.tasks[index] = done.clone();
        self.persist()?;
        self.bus.publish(Event::TaskCompleted {
            task_id: done.id.clone(),
            achievement_score: done.achievement_score,
            at,
        });
        Ok(Some(done))
    }

    /// Replace the whole collection. Later duplicates of an id are dropped.
    pub fn save_all(&mut self, tasks: Vec<Task>, now: NaiveDateTime) -> Result<()> {
        let mut seen = HashSet::new();
        self.tasks = tasks
            .into_iter()
            .filter(|t| seen.insert(t.id.clone()))
            .collect();
        self.persist()?;
        self.bus.publish(Event::TasksReplaced {
            count: self.tasks.len(),
            at: now,
        });
        Ok(())
    }

    /// Completed counts and achievement scores grouped by task name.
    pub fn get_task_score_totals(&self) -> ScoreTotals {
        let mut groups: IndexMap<&str, (usize, f64)> = IndexMap::new();
        for task in self.tasks.iter().filter(|t| t.is_completed()) {
            let entry = groups.entry(task.name.as_str()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += task.achievement_score;
        }

        let total_score = round2(groups.values().map(|(_, score)| score).sum());
        ScoreTotals {
            groups: groups
                .into_iter()
                .map(|(name, (count, score))| ScoreGroup {
                    name: name.to_string(),
                    count,
                    score: round2(score),
                })
                .collect(),
            total_score,
        }
    }

    /// Merge calendar entries into the collection.
    ///
    /// New events are added and known ones refreshed in place; tasks marked
    /// as locally overridden keep their local edits.
    pub fn import_calendar(
        &mut self,
        entries: &[CalendarEntry],
        markers: &TagMarkers,
        now: NaiveDateTime,
    ) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let mut seen = HashSet::new();

        for entry in entries {
            let raw = normalize_calendar_entry(entry, markers);
            let candidate = self.factory.create_at(&raw, &RawTask::default(), now);
            let key = dedup_key(&candidate);
            if !seen.insert(key.clone()) {
                summary.duplicates += 1;
                continue;
            }

            match self.tasks.iter().position(|t| dedup_key(t) == key) {
                Some(index) if self.tasks[index].local_override => summary.preserved += 1,
                Some(index) => {
                    self.tasks[index] = self.factory.update_at(&self.tasks[index], &raw, now);
                    summary.updated += 1;
                }
                None => {
                    self.tasks.push(candidate);
                    summary.added += 1;
                }
            }
        }

        self.persist()?;
        tracing::debug!(?summary, "calendar imported");
        self.bus.publish(Event::CalendarImported {
            added: summary.added,
            updated: summary.updated,
            preserved: summary.preserved,
            at: now,
        });
        Ok(summary)
    }
}
