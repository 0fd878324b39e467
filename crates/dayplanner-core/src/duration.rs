//! Duration learning.
//!
//! Keeps a running mean of observed durations per task name so new tasks
//! with a familiar name start from a realistic estimate.

use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::events::{Event, EventBus};
use crate::storage::{read_json_or_default, write_json, KeyValueStore, DURATION_LEARNING_KEY};

/// Learned duration for one task name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationEntry {
    /// Running mean in minutes
    pub average: f64,
    /// Number of observations
    pub count: u32,
    /// Most recent observation in minutes
    pub last: f64,
}

impl DurationEntry {
    /// Fold one more observation into the mean.
    pub fn observe(self, minutes: f64) -> Self {
        let count = self.count.saturating_add(1);
        let average = (self.average * f64::from(self.count) + minutes) / f64::from(count);
        Self {
            average,
            count,
            last: minutes,
        }
    }
}

/// Lower-cased, trimmed name used as the learning key.
pub fn normalize_task_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Persistent map of learned durations.
#[derive(Clone)]
pub struct DurationLearning {
    kv: Rc<dyn KeyValueStore>,
    bus: Option<EventBus>,
}

impl std::fmt::Debug for DurationLearning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurationLearning").finish_non_exhaustive()
    }
}

impl DurationLearning {
    pub fn new(kv: Rc<dyn KeyValueStore>) -> Self {
        Self { kv, bus: None }
    }

    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn entries(&self) -> BTreeMap<String, DurationEntry> {
        read_json_or_default(self.kv.as_ref(), DURATION_LEARNING_KEY)
    }

    pub fn entry(&self, name: &str) -> Option<DurationEntry> {
        self.entries().get(&normalize_task_name(name)).copied()
    }

    /// Record an observed duration and return the new average.
    ///
    /// Blank names and non-positive or non-finite minutes are ignored and
    /// return `Ok(None)` without touching storage.
    pub fn record_task_duration(
        &self,
        name: &str,
        minutes: f64,
    ) -> Result<Option<f64>, StorageError> {
        self.record_task_duration_at(name, minutes, Local::now().naive_local())
    }

    pub fn record_task_duration_at(
        &self,
        name: &str,
        minutes: f64,
        at: NaiveDateTime,
    ) -> Result<Option<f64>, StorageError> {
        let key = normalize_task_name(name);
        if key.is_empty() || !minutes.is_finite() || minutes <= 0.0 {
            return Ok(None);
        }

        let mut entries = self.entries();
        let updated = match entries.get(&key) {
            Some(existing) => existing.observe(minutes),
            None => DurationEntry {
                average: minutes,
                count: 1,
                last: minutes,
            },
        };
        entries.insert(key.clone(), updated);

        write_json(self.kv.as_ref(), DURATION_LEARNING_KEY, &entries).inspect_err(|e| {
            tracing::error!(name = %key, error = %e, "failed to persist duration learning");
        })?;
        tracing::debug!(name = %key, average = updated.average, count = updated.count, "duration recorded");

        if let Some(bus) = &self.bus {
            bus.publish(Event::DurationRecorded {
                name: key,
                average: updated.average,
                at,
            });
        }
        Ok(Some(updated.average))
    }

    /// Learned estimate in whole minutes.
    pub fn get_estimated_duration(&self, name: &str) -> Option<u32> {
        let entry = self.entry(name)?;
        if !entry.average.is_finite() || entry.average <= 0.0 {
            return None;
        }
        Some((entry.average.round() as u32).max(1))
    }
}
