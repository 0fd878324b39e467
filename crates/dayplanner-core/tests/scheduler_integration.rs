//! Integration tests for the day scheduler driven through the planner.

use std::rc::Rc;

use chrono::NaiveDateTime;
use dayplanner_core::scheduler::clock::parse_date_time;
use dayplanner_core::{
    DayPlanner, DayScheduler, KeyValueStore, MemoryStore, RawTask, SchedulerConfig, SlotKind,
    SqliteStore, TaskFactory,
};

fn at(s: &str) -> NaiveDateTime {
    parse_date_time(s).unwrap()
}

fn raw(id: &str, f: impl FnOnce(&mut RawTask)) -> RawTask {
    let mut raw = RawTask {
        id: Some(id.into()),
        ..RawTask::named(id)
    };
    f(&mut raw);
    raw
}

#[test]
fn test_fixed_collisions_compress_forward() {
    let factory = TaskFactory::new();
    let now = at("2026-10-19T07:00");
    let tasks: Vec<_> = [("a", "09:00"), ("b", "09:15")]
        .into_iter()
        .map(|(id, start)| {
            factory.create_at(
                &raw(id, |r| {
                    r.start_time = Some(start.into());
                    r.duration_minutes = Some(30u32.into());
                }),
                &RawTask::default(),
                now,
            )
        })
        .collect();

    let schedule = DayScheduler::new().build_schedule(&tasks);
    let spans: Vec<_> = schedule
        .slots
        .iter()
        .map(|s| (s.start_minutes, s.end_minutes))
        .collect();
    assert_eq!(spans, vec![(540, 570), (570, 600)]);
}

#[test]
fn test_flexible_fills_morning_then_afternoon() {
    let kv: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let now = at("2026-10-19T06:30");
    let mut planner = DayPlanner::open(kv, &SchedulerConfig::default(), now);
    let store = planner.store_mut();
    store
        .add(
            &raw("deep-work", |r| {
                r.importance = Some(8u32.into());
                r.urgency = Some(8u32.into());
                r.duration_minutes = Some(60u32.into());
            }),
            now,
        )
        .unwrap();
    store
        .add(
            &raw("standup", |r| {
                r.start_time = Some("10:00".into());
                r.duration_minutes = Some(30u32.into());
            }),
            now,
        )
        .unwrap();
    store
        .add(
            &raw("report", |r| {
                r.importance = Some(2u32.into());
                r.duration_minutes = Some(180u32.into());
            }),
            now,
        )
        .unwrap();

    let schedule = planner.schedule_for(now);
    let layout: Vec<_> = schedule
        .slots
        .iter()
        .map(|s| (s.task.id.as_str(), s.start_minutes, s.end_minutes, s.kind))
        .collect();
    assert_eq!(
        layout,
        vec![
            ("deep-work", 420, 480, SlotKind::Flexible),
            ("standup", 600, 630, SlotKind::Fixed),
            ("report", 630, 810, SlotKind::Flexible),
        ]
    );
}

#[test]
fn test_dependency_keeps_task_off_the_schedule() {
    let kv: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let now = at("2026-10-19T08:00");
    let mut planner = DayPlanner::open(kv, &SchedulerConfig::default(), now);
    planner.store_mut().add(&raw("prep", |_| {}), now).unwrap();
    planner
        .store_mut()
        .add(
            &raw("present", |r| {
                r.dependency = Some("prep".into());
                r.importance = Some(10u32.into());
                r.urgency = Some(10u32.into());
            }),
            now,
        )
        .unwrap();

    let schedule = planner.schedule_for(now);
    assert!(schedule.slots.iter().all(|s| s.task.id != "present"));
    assert!(schedule.deferred.iter().all(|t| t.id != "present"));
}

#[test]
fn test_skips_escalate_urgency() {
    let kv: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let now = at("2026-10-19T08:00");
    let mut planner = DayPlanner::open(kv, &SchedulerConfig::default(), now);
    let task = planner
        .store_mut()
        .add(&raw("chore", |r| r.urgency = Some(4u32.into())), now)
        .unwrap();

    let baseline = dayplanner_core::compute_smoothed_urgency(&task, planner.ledger(), now);
    for _ in 0..3 {
        planner.ledger().increment_skip_count_at("chore", now).unwrap();
    }
    let escalated = dayplanner_core::compute_smoothed_urgency(&task, planner.ledger(), now);
    assert!(escalated >= baseline + 2);
}

#[test]
fn test_schedule_survives_reopen_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dayplanner.db");
    let now = at("2026-10-19T08:00");

    {
        let kv: Rc<dyn KeyValueStore> = Rc::new(SqliteStore::open_at(&path).unwrap());
        let mut planner = DayPlanner::open(kv, &SchedulerConfig::default(), now);
        planner
            .store_mut()
            .add(
                &raw("gym", |r| {
                    r.start_time = Some("18:00".into());
                    r.duration_minutes = Some(60u32.into());
                }),
                now,
            )
            .unwrap();
    }

    let kv: Rc<dyn KeyValueStore> = Rc::new(SqliteStore::open_at(&path).unwrap());
    let planner = DayPlanner::open(kv, &SchedulerConfig::default(), now);
    let first = planner.schedule_for(now);
    let second = planner.schedule_for(now);
    assert_eq!(first, second);
    assert_eq!(first.slots[0].task.id, "gym");
    assert_eq!(first.slots[0].start_minutes, 18 * 60);
}

#[test]
fn test_narrow_window_defers_overflow() {
    let config = SchedulerConfig {
        day_start: "13:00".into(),
        day_end: "14:00".into(),
        ..SchedulerConfig::default()
    };
    let kv: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let now = at("2026-10-19T12:00");
    let mut planner = DayPlanner::open(kv, &config, now);
    for id in ["one", "two", "three"] {
        planner
            .store_mut()
            .add(&raw(id, |r| r.duration_minutes = Some(25u32.into())), now)
            .unwrap();
    }

    let schedule = planner.schedule_for(now);
    assert_eq!(schedule.slots.len(), 2);
    assert_eq!(schedule.deferred.len(), 1);
    assert!(schedule.slots.iter().all(|s| s.end_minutes <= 14 * 60));
}
