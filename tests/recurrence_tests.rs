use chrono::NaiveDate;
use taskcal::models::{DayKey, NewTask, Priority};
use taskcal::recurrence::materialize;
use taskcal::session::Session;
use taskcal::storage::MemoryStore;
use taskcal::store::TaskStore;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

fn today_key() -> DayKey {
    DayKey::from_date(today())
}

#[test]
fn test_open_recurring_tasks_are_cloned_once() {
    let mut store = TaskStore::new();
    store.add_task(DayKey::new(2025, 5, 1), NewTask::new("Stretch").recurring(true));
    store.add_task(DayKey::new(2025, 5, 2), NewTask::new("Stretch").recurring(true));
    store.add_task(DayKey::new(2025, 5, 3), NewTask::new("Old habit").recurring(true).completed(true));
    store.add_task(DayKey::new(2025, 5, 4), NewTask::new("One-off"));

    assert_eq!(materialize(&mut store, today()), 1);

    let cloned = store.day_tasks(today_key());
    assert_eq!(cloned.len(), 1);
    assert_eq!(cloned[0].text, "Stretch");
    assert!(cloned[0].recurring);
    assert!(!cloned[0].completed);

    // Sources are left alone
    assert_eq!(store.day_tasks(DayKey::new(2025, 5, 1)).len(), 1);
    assert_eq!(store.day_tasks(DayKey::new(2025, 5, 2)).len(), 1);

    assert_eq!(materialize(&mut store, today()), 0);
    assert_eq!(store.day_tasks(today_key()).len(), 1);
}

#[test]
fn test_clone_copies_priority_and_time() {
    let mut store = TaskStore::new();
    let source = store.add_task(
        DayKey::new(2025, 5, 1),
        NewTask::new("Standup")
            .priority(Priority::High)
            .time(Some("09:00".into()))
            .recurring(true),
    );

    assert_eq!(materialize(&mut store, today()), 1);

    let clone = &store.day_tasks(today_key())[0];
    assert_ne!(clone.id, source);
    assert_eq!(clone.priority, Priority::High);
    assert_eq!(clone.time.as_deref(), Some("09:00"));
}

#[test]
fn test_source_on_today_is_not_duplicated() {
    let mut store = TaskStore::new();
    store.add_task(today_key(), NewTask::new("Water plants").recurring(true));

    assert_eq!(materialize(&mut store, today()), 0);
    assert_eq!(store.day_tasks(today_key()).len(), 1);
}

#[test]
fn test_plain_task_with_same_text_does_not_block_clone() {
    let mut store = TaskStore::new();
    store.add_task(today_key(), NewTask::new("Read"));
    store.add_task(DayKey::new(2025, 5, 1), NewTask::new("Read").recurring(true));

    assert_eq!(materialize(&mut store, today()), 1);
    assert_eq!(store.day_tasks(today_key()).len(), 2);
}

#[test]
fn test_completed_clone_on_today_still_blocks() {
    let mut store = TaskStore::new();
    store.add_task(today_key(), NewTask::new("Run").recurring(true).completed(true));
    store.add_task(DayKey::new(2025, 5, 1), NewTask::new("Run").recurring(true));

    assert_eq!(materialize(&mut store, today()), 0);
}

#[test]
fn test_clones_are_sorted_into_the_day() {
    let mut store = TaskStore::new();
    store.add_task(today_key(), NewTask::new("low").priority(Priority::Low));
    store.add_task(DayKey::new(2025, 5, 1), NewTask::new("high").priority(Priority::High).recurring(true));

    materialize(&mut store, today());
    let texts: Vec<&str> = store.day_tasks(today_key()).iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["high", "low"]);
}

const SEEDED: &str = r#"{"tasks":{"2025-06":{"1":[{"id":"s1","text":"Stretch","recurring":true,"createdAt":1}]}}}"#;

#[test]
fn test_session_materializes_only_once() {
    let persistence = MemoryStore::new();
    persistence.insert_raw("alice", SEEDED);

    let mut session = Session::boot("alice", persistence, today());
    assert_eq!(session.day_tasks(today_key()).len(), 1);

    let clone_id = session.day_tasks(today_key())[0].id.clone();
    assert!(session.delete_task(today_key(), &clone_id));

    // Already ran this session
    assert_eq!(session.materialize_recurring(today()), 0);
    assert!(session.day_tasks(today_key()).is_empty());
}

#[test]
fn test_materialized_clone_is_persisted() {
    let persistence = MemoryStore::new();
    persistence.insert_raw("alice", SEEDED);
    let session = Session::boot("alice", persistence, today());

    let saved = session.persistence().raw("alice").unwrap();
    let next = MemoryStore::new();
    next.insert_raw("alice", saved);

    let mut again = Session::open("alice", next);
    assert_eq!(again.day_tasks(today_key()).len(), 1);
    assert_eq!(again.materialize_recurring(today()), 0);
    assert_eq!(again.day_tasks(today_key()).len(), 1);
}

#[test]
fn test_open_does_not_materialize() {
    let persistence = MemoryStore::new();
    persistence.insert_raw("alice", SEEDED);

    let mut session = Session::open("alice", persistence);
    assert!(session.day_tasks(today_key()).is_empty());
    assert_eq!(session.materialize_recurring(today()), 1);
}
