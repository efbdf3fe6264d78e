use chrono::{Duration, NaiveDate};

use crate::models::{DayKey, Task};
use crate::ordering::compare_tasks;
use crate::store::TaskStore;

/// A task together with the day it lives on.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedTask {
    pub key: DayKey,
    /// Absolute date of `key`, `None` only for keys outside chrono's range.
    pub date: Option<NaiveDate>,
    pub task: Task,
}

#[derive(Debug)]
struct UpcomingEntry {
    generation: u64,
    today: NaiveDate,
    window_days: u32,
    tasks: Vec<DatedTask>,
}

#[derive(Debug)]
struct AllEntry {
    generation: u64,
    tasks: Vec<DatedTask>,
}

/// Read models derived from a [`TaskStore`].
///
/// Each entry remembers the store generation it was computed from and is
/// rebuilt from scratch whenever that no longer matches.
#[derive(Debug, Default)]
pub struct ViewCache {
    upcoming: Option<UpcomingEntry>,
    all: Option<AllEntry>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open tasks dated within `[today, today + window_days]`, earliest first.
    pub fn upcoming(&mut self, store: &TaskStore, today: NaiveDate, window_days: u32) -> &[DatedTask] {
        let generation = store.generation();
        let fresh = self.upcoming.as_ref().is_some_and(|e| {
            e.generation == generation && e.today == today && e.window_days == window_days
        });
        if !fresh {
            tracing::trace!(generation, window_days, "Recomputing upcoming view");
            self.upcoming = Some(UpcomingEntry {
                generation,
                today,
                window_days,
                tasks: collect_upcoming(store, today, window_days),
            });
        }
        self.upcoming.as_ref().map(|e| e.tasks.as_slice()).unwrap_or(&[])
    }

    /// Every task in the store, in calendar order.
    pub fn all_tasks(&mut self, store: &TaskStore) -> &[DatedTask] {
        let generation = store.generation();
        if !self.all.as_ref().is_some_and(|e| e.generation == generation) {
            tracing::trace!(generation, "Recomputing all-tasks view");
            self.all = Some(AllEntry {
                generation,
                tasks: flatten(store),
            });
        }
        self.all.as_ref().map(|e| e.tasks.as_slice()).unwrap_or(&[])
    }

    /// Case-insensitive substring search over every task, ordered by date.
    pub fn search(&mut self, store: &TaskStore, query: &str) -> Vec<DatedTask> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<DatedTask> = self
            .all_tasks(store)
            .iter()
            .filter(|t| t.task.text.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.key.cmp(&b.key))
                .then_with(|| compare_tasks(&a.task, &b.task))
        });
        hits
    }
}

fn flatten(store: &TaskStore) -> Vec<DatedTask> {
    store
        .days()
        .flat_map(|(key, tasks)| {
            let date = key.resolve();
            tasks.iter().map(move |task| DatedTask {
                key,
                date,
                task: task.clone(),
            })
        })
        .collect()
}

fn collect_upcoming(store: &TaskStore, today: NaiveDate, window_days: u32) -> Vec<DatedTask> {
    // Windows past chrono's range cover everything from today on
    let end = today
        .checked_add_signed(Duration::days(i64::from(window_days)))
        .unwrap_or(NaiveDate::MAX);
    let mut results: Vec<DatedTask> = store
        .days()
        .filter_map(|(key, tasks)| {
            let date = key.resolve()?;
            (date >= today && date <= end).then_some((key, date, tasks))
        })
        .flat_map(|(key, date, tasks)| {
            tasks.iter().filter(|t| !t.completed).map(move |task| DatedTask {
                key,
                date: Some(date),
                task: task.clone(),
            })
        })
        .collect();
    results.sort_by_key(|t| t.date);
    results
}
