use chrono::NaiveDate;

use crate::models::{DayKey, NewTask, Priority};
use crate::store::TaskStore;

/// Clones every open recurring task onto `today`.
///
/// A clone is skipped when today's bucket already holds a recurring task
/// with the same text, which also covers sources that live on today.
/// Source tasks are never modified. Returns how many clones were added.
pub fn materialize(store: &mut TaskStore, today: NaiveDate) -> usize {
    let today_key = DayKey::from_date(today);

    let candidates: Vec<(String, Priority, Option<String>)> = store
        .days()
        .filter(|(key, _)| *key != today_key)
        .flat_map(|(_, tasks)| tasks.iter())
        .filter(|t| t.recurring && !t.completed)
        .map(|t| (t.text.clone(), t.priority, t.time.clone()))
        .collect();

    let mut added = 0;
    for (text, priority, time) in candidates {
        let exists = store
            .day_tasks(today_key)
            .iter()
            .any(|t| t.recurring && t.text == text);
        if exists {
            continue;
        }
        store.add_task(
            today_key,
            NewTask::new(text)
                .priority(priority)
                .time(time)
                .recurring(true)
                .completed(false),
        );
        added += 1;
    }

    if added > 0 {
        tracing::info!(day = %today_key, added, "Materialized recurring tasks");
    }
    added
}
