//! # Dayplanner Core Library
//!
//! Business logic for a single-user day planner. Every operation is
//! available through the standalone `dayplanner` CLI, which is a thin layer
//! over this crate.
//!
//! ## Architecture
//!
//! - **Task model**: normalizes loosely typed records from manual entry,
//!   calendar feeds and older payloads into one canonical [`Task`]
//! - **Urgency**: deadline-derived urgency, far-deadline dampening and
//!   escalation through a persisted skip ledger
//! - **Duration learning**: running means of observed durations per task name
//! - **Scheduler**: a pure pass that lays fixed and flexible tasks onto the
//!   day window
//! - **Storage**: a key-value seam with SQLite and in-memory engines, plus
//!   TOML configuration
//!
//! ## Key Components
//!
//! - [`TaskStore`]: single writer of the task collection
//! - [`DayScheduler`]: builds a [`DaySchedule`] from candidate tasks
//! - [`DayPlanner`]: wires the pieces together for one session
//! - [`Config`]: application configuration management

pub mod duration;
pub mod error;
pub mod events;
pub mod planner;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod task;
pub mod urgency;

pub use duration::{normalize_task_name, DurationEntry, DurationLearning};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::{Event, EventBus, Topic};
pub use planner::{DayPlanner, SkipOutcome, SkipTarget};
pub use scheduler::clock::DayWindow;
pub use scheduler::{DaySchedule, DayScheduler, SchedulerConfig, Slot, SlotKind};
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore};
pub use store::{ImportSummary, ScoreGroup, ScoreTotals, TaskStore};
pub use task::calendar::{CalendarEntry, TagMarkers};
pub use task::{IdSource, RawTask, Task, TaskFactory, TaskSource, TaskStatus, UuidIds};
pub use urgency::{compute_smoothed_urgency, compute_urgency_from_deadline, SkipLedger};
