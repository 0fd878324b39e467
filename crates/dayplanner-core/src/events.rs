use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Named channel an event is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    Tasks,
    SkipLedger,
    Durations,
    Schedule,
}

/// Every state change in the planner produces an Event.
/// Front-ends subscribe by topic and refresh their views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TaskAdded {
        task_id: String,
        at: NaiveDateTime,
    },
    TaskUpdated {
        task_id: String,
        at: NaiveDateTime,
    },
    TaskCompleted {
        task_id: String,
        achievement_score: f64,
        at: NaiveDateTime,
    },
    /// The whole collection was replaced.
    TasksReplaced {
        count: usize,
        at: NaiveDateTime,
    },
    CalendarImported {
        added: usize,
        updated: usize,
        preserved: usize,
        at: NaiveDateTime,
    },
    SkipRecorded {
        task_id: String,
        count: u32,
        at: NaiveDateTime,
    },
    DurationRecorded {
        name: String,
        average: f64,
        at: NaiveDateTime,
    },
    /// Something changed that invalidates the last schedule pass.
    ScheduleNeedsRefresh {
        reason: String,
        at: NaiveDateTime,
    },
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::TaskAdded { .. }
            | Event::TaskUpdated { .. }
            | Event::TaskCompleted { .. }
            | Event::TasksReplaced { .. }
            | Event::CalendarImported { .. } => Topic::Tasks,
            Event::SkipRecorded { .. } => Topic::SkipLedger,
            Event::DurationRecorded { .. } => Topic::Durations,
            Event::ScheduleNeedsRefresh { .. } => Topic::Schedule,
        }
    }
}

struct Subscriber {
    topic: Topic,
    tx: Sender<Event>,
}

/// Topic-based fan-out of [`Event`]s.
///
/// Clones share the same subscriber list. Delivery is synchronous into each
/// subscriber's channel; dropped receivers are pruned on the next publish.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Rc<RefCell<Vec<Subscriber>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event published on `topic` from now on.
    pub fn subscribe(&self, topic: Topic) -> Receiver<Event> {
        let (tx, rx) = channel();
        self.subscribers.borrow_mut().push(Subscriber { topic, tx });
        rx
    }

    /// Deliver `event` to the subscribers of its topic. Returns how many
    /// received it.
    pub fn publish(&self, event: Event) -> usize {
        let topic = event.topic();
        let mut delivered = 0;
        self.subscribers.borrow_mut().retain(|sub| {
            if sub.topic != topic {
                return true;
            }
            match sub.tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        tracing::trace!(?topic, delivered, "event published");
        delivered
    }
}
