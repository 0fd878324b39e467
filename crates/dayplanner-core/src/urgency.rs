//! Urgency estimation: deadline proximity, far-deadline dampening and
//! skip escalation.

use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::StorageError;
use crate::events::{Event, EventBus};
use crate::scheduler::clock::parse_date_time;
use crate::storage::{read_json_or_default, write_json, KeyValueStore, SKIP_LEDGER_KEY};
use crate::task::Task;

/// Deadlines further out than this get their urgency pulled toward neutral.
const DAMPENING_HORIZON_HOURS: i64 = 48;
const DAMPENING_FACTOR: f64 = 0.6;
const SKIP_WEIGHT: f64 = 0.75;

/// Urgency implied by a deadline relative to `today`.
///
/// Total: missing or unparseable deadlines map to 5.
pub fn compute_urgency_from_deadline(deadline: Option<&str>, today: NaiveDate) -> u8 {
    let Some(due) = deadline.and_then(parse_date_time) else {
        return 5;
    };
    let days = (due.date() - today).num_days();
    match days {
        d if d <= 0 => 10,
        1 => 9,
        2..=3 => 8,
        4..=5 => 7,
        6..=7 => 6,
        _ => 5,
    }
}

/// Apply dampening and skip escalation to a raw urgency.
pub fn smooth_urgency(urgency: u8, deadline: Option<&str>, skips: u32, now: NaiveDateTime) -> u8 {
    let mut value = urgency.clamp(1, 10);

    if let Some(due) = deadline.and_then(parse_date_time) {
        if due - now > Duration::hours(DAMPENING_HORIZON_HOURS) {
            let dampened = 5.0 + (f64::from(value) - 5.0) * DAMPENING_FACTOR;
            value = dampened.round().clamp(1.0, 10.0) as u8;
        }
    }

    if skips > 0 {
        let bump = ((f64::from(skips) * SKIP_WEIGHT).round() as u32).max(1);
        value = (u32::from(value) + bump).min(10) as u8;
    }
    value
}

/// Smoothed urgency of `task` using its recorded skips.
pub fn compute_smoothed_urgency(task: &Task, ledger: &SkipLedger, now: NaiveDateTime) -> u8 {
    smooth_urgency(
        task.urgency,
        task.deadline.as_deref(),
        ledger.skip_count(&task.id),
        now,
    )
}

/// Persistent per-task skip counters.
#[derive(Clone)]
pub struct SkipLedger {
    kv: Rc<dyn KeyValueStore>,
    bus: Option<EventBus>,
}

impl SkipLedger {
    pub fn new(kv: Rc<dyn KeyValueStore>) -> Self {
        Self { kv, bus: None }
    }

    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn entries(&self) -> BTreeMap<String, u32> {
        read_json_or_default(self.kv.as_ref(), SKIP_LEDGER_KEY)
    }

    pub fn skip_count(&self, task_id: &str) -> u32 {
        self.entries().get(task_id).copied().unwrap_or(0)
    }

    /// Increment and persist the counter for `task_id`, returning the new
    /// count. An empty id is ignored and reports 0.
    pub fn increment_skip_count(&self, task_id: &str) -> Result<u32, StorageError> {
        self.increment_skip_count_at(task_id, chrono::Local::now().naive_local())
    }

    pub fn increment_skip_count_at(
        &self,
        task_id: &str,
        at: NaiveDateTime,
    ) -> Result<u32, StorageError> {
        if task_id.is_empty() {
            return Ok(0);
        }

        let mut entries = self.entries();
        let count = entries.entry(task_id.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        let count = *count;

        write_json(self.kv.as_ref(), SKIP_LEDGER_KEY, &entries).inspect_err(|e| {
            tracing::error!(task_id, error = %e, "failed to persist skip ledger");
        })?;

        if let Some(bus) = &self.bus {
            bus.publish(Event::SkipRecorded {
                task_id: task_id.to_string(),
                count,
                at,
            });
        }
        Ok(count)
    }
}
