use chrono::NaiveDate;
use taskcal::models::{DayKey, NewTask, Priority, TaskPatch};
use taskcal::store::TaskStore;
use taskcal::views::ViewCache;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn key(y: i32, m: u32, d: u32) -> DayKey {
    DayKey::from_date(date(y, m, d))
}

#[test]
fn test_upcoming_finds_task_in_window() {
    let mut store = TaskStore::new();
    store.add_task(DayKey::new(2025, 5, 15), NewTask::new("Pay rent").priority(Priority::High));
    let mut cache = ViewCache::new();

    let upcoming = cache.upcoming(&store, date(2025, 6, 1), 30);
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].task.text, "Pay rent");
    assert_eq!(upcoming[0].date, Some(date(2025, 6, 15)));
    assert_eq!(upcoming[0].key, DayKey::new(2025, 5, 15));
    assert!(!upcoming[0].task.completed);
}

#[test]
fn test_upcoming_window_is_inclusive() {
    let mut store = TaskStore::new();
    store.add_task(key(2025, 6, 8), NewTask::new("last day"));
    store.add_task(key(2025, 6, 1), NewTask::new("today"));
    store.add_task(key(2025, 6, 9), NewTask::new("too late"));
    store.add_task(key(2025, 5, 31), NewTask::new("yesterday"));
    let mut cache = ViewCache::new();

    let texts: Vec<&str> = cache
        .upcoming(&store, date(2025, 6, 1), 7)
        .iter()
        .map(|t| t.task.text.as_str())
        .collect();
    assert_eq!(texts, vec!["today", "last day"]);
}

#[test]
fn test_upcoming_keeps_day_order_within_a_date() {
    let mut store = TaskStore::new();
    store.add_task(key(2025, 6, 2), NewTask::new("low").priority(Priority::Low));
    store.add_task(key(2025, 6, 2), NewTask::new("high").priority(Priority::High));
    let mut cache = ViewCache::new();

    let texts: Vec<&str> = cache
        .upcoming(&store, date(2025, 6, 1), 7)
        .iter()
        .map(|t| t.task.text.as_str())
        .collect();
    assert_eq!(texts, vec!["high", "low"]);
}

#[test]
fn test_completing_task_drops_it_from_upcoming() {
    let mut store = TaskStore::new();
    let today = date(2025, 6, 1);
    let id = store.add_task(key(2025, 6, 3), NewTask::new("Buy milk"));
    let mut cache = ViewCache::new();

    assert!(cache.upcoming(&store, today, 7).iter().any(|t| t.task.id == id));

    store.toggle_task(key(2025, 6, 3), &id, true);
    assert!(cache.upcoming(&store, today, 7).iter().all(|t| t.task.id != id));
}

#[test]
fn test_views_follow_every_mutation() {
    let mut store = TaskStore::new();
    let today = date(2025, 6, 1);
    let mut cache = ViewCache::new();

    let id = store.add_task(key(2025, 6, 2), NewTask::new("draft"));
    assert_eq!(cache.upcoming(&store, today, 7).len(), 1);
    assert_eq!(cache.all_tasks(&store).len(), 1);

    let patch = TaskPatch { text: Some("final".into()), ..TaskPatch::default() };
    store.update_task(key(2025, 6, 2), &id, patch);
    assert_eq!(cache.upcoming(&store, today, 7)[0].task.text, "final");
    assert_eq!(cache.all_tasks(&store)[0].task.text, "final");

    store.move_task(key(2025, 6, 2), &id, key(2025, 7, 1));
    assert!(cache.upcoming(&store, today, 7).is_empty());
    assert_eq!(cache.all_tasks(&store)[0].key, key(2025, 7, 1));

    store.delete_task(key(2025, 7, 1), &id);
    assert!(cache.all_tasks(&store).is_empty());
}

#[test]
fn test_unchanged_store_reuses_cached_view() {
    let mut store = TaskStore::new();
    store.add_task(key(2025, 6, 2), NewTask::new("a"));
    let mut cache = ViewCache::new();
    let today = date(2025, 6, 1);

    let first = cache.upcoming(&store, today, 7).as_ptr();
    let second = cache.upcoming(&store, today, 7).as_ptr();
    assert_eq!(first, second);

    let first = cache.all_tasks(&store).as_ptr();
    let second = cache.all_tasks(&store).as_ptr();
    assert_eq!(first, second);
}

#[test]
fn test_changing_window_or_today_recomputes() {
    let mut store = TaskStore::new();
    store.add_task(key(2025, 6, 20), NewTask::new("far"));
    let mut cache = ViewCache::new();

    assert!(cache.upcoming(&store, date(2025, 6, 1), 7).is_empty());
    assert_eq!(cache.upcoming(&store, date(2025, 6, 1), 30).len(), 1);
    assert_eq!(cache.upcoming(&store, date(2025, 6, 15), 7).len(), 1);
    assert!(cache.upcoming(&store, date(2025, 6, 21), 7).is_empty());
}

#[test]
fn test_huge_window_covers_everything_ahead() {
    let mut store = TaskStore::new();
    store.add_task(key(2025, 6, 2), NewTask::new("soon"));
    store.add_task(key(9999, 12, 31), NewTask::new("far future"));
    store.add_task(key(2025, 5, 31), NewTask::new("past"));
    let mut cache = ViewCache::new();

    let texts: Vec<&str> = cache
        .upcoming(&store, date(2025, 6, 1), u32::MAX)
        .iter()
        .map(|t| t.task.text.as_str())
        .collect();
    assert_eq!(texts, vec!["soon", "far future"]);

    assert_eq!(cache.upcoming(&store, date(2025, 6, 1), 200_000_000).len(), 2);
}

#[test]
fn test_out_of_range_day_rolls_over() {
    let mut store = TaskStore::new();
    // April 31st is May 1st
    store.add_task(DayKey::new(2025, 3, 31), NewTask::new("rolled"));
    let mut cache = ViewCache::new();

    let upcoming = cache.upcoming(&store, date(2025, 4, 30), 1);
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].date, Some(date(2025, 5, 1)));
    assert_eq!(upcoming[0].key, DayKey::new(2025, 3, 31));
}

#[test]
fn test_all_tasks_includes_completed_in_calendar_order() {
    let mut store = TaskStore::new();
    store.add_task(key(2025, 7, 1), NewTask::new("later"));
    store.add_task(key(2025, 6, 1), NewTask::new("done").completed(true));
    store.add_task(key(2025, 6, 1), NewTask::new("open"));
    let mut cache = ViewCache::new();

    let texts: Vec<&str> = cache.all_tasks(&store).iter().map(|t| t.task.text.as_str()).collect();
    assert_eq!(texts, vec!["open", "done", "later"]);
}

#[test]
fn test_search_is_case_insensitive_and_dated() {
    let mut store = TaskStore::new();
    store.add_task(key(2025, 8, 1), NewTask::new("Return rental car"));
    store.add_task(key(2025, 6, 1), NewTask::new("Pay RENT"));
    store.add_task(key(2025, 6, 2), NewTask::new("Groceries"));
    let mut cache = ViewCache::new();

    let hits = cache.search(&store, "rent");
    let texts: Vec<&str> = hits.iter().map(|t| t.task.text.as_str()).collect();
    assert_eq!(texts, vec!["Pay RENT", "Return rental car"]);
    assert_eq!(hits[0].date, Some(date(2025, 6, 1)));

    assert!(cache.search(&store, "   ").is_empty());
    assert!(cache.search(&store, "dentist").is_empty());
}
