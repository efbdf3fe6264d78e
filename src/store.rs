use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{DayKey, NewTask, Task, TaskId, TaskPatch, UserData};
use crate::ordering::sort_day;

/// Open and completed task counts for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCount {
    pub open: usize,
    pub done: usize,
}

/// Every task of one user, bucketed by day.
///
/// Each mutating method advances [`TaskStore::generation`], which derived
/// views use to tell whether their cached results are still current.
#[derive(Debug, Default)]
pub struct TaskStore {
    days: BTreeMap<DayKey, Vec<Task>>,
    generation: u64,
    last_created_at: i64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from persisted data, re-sorting every bucket.
    pub fn from_data(data: UserData) -> Self {
        let mut store = TaskStore::new();
        store.replace(data);
        store
    }

    /// Current generation. Only ever increases.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    fn next_created_at(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis().max(self.last_created_at);
        self.last_created_at = now;
        now
    }

    fn day_mut(&mut self, key: DayKey) -> &mut Vec<Task> {
        self.days.entry(key).or_default()
    }

    fn prune(&mut self, key: DayKey) {
        if self.days.get(&key).is_some_and(Vec::is_empty) {
            self.days.remove(&key);
        }
    }

    /// Returns the day's task list, creating it if needed.
    ///
    /// Callers get mutable access, so the generation advances even if they
    /// end up changing nothing.
    pub fn ensure_day(&mut self, key: DayKey) -> &mut Vec<Task> {
        self.bump();
        self.day_mut(key)
    }

    /// Appends a task to a day and re-sorts the day. Returns the new id.
    pub fn add_task(&mut self, key: DayKey, new: NewTask) -> TaskId {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            text: new.text,
            completed: new.completed,
            created_at: self.next_created_at(),
            priority: new.priority,
            time: new.time,
            recurring: new.recurring,
        };
        let id = task.id.clone();
        let tasks = self.day_mut(key);
        tasks.push(task);
        sort_day(tasks);
        self.bump();
        tracing::debug!(day = %key, id = %id, "Task added");
        id
    }

    /// Merges `patch` into the task with `id` in that day.
    ///
    /// Returns `false` and changes nothing when the id isn't in that bucket.
    pub fn update_task(&mut self, key: DayKey, id: &str, patch: TaskPatch) -> bool {
        let Some(tasks) = self.days.get_mut(&key) else {
            return false;
        };
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        patch.apply(task);
        sort_day(tasks);
        self.bump();
        tracing::debug!(day = %key, id, "Task updated");
        true
    }

    pub fn toggle_task(&mut self, key: DayKey, id: &str, completed: bool) -> bool {
        self.update_task(
            key,
            id,
            TaskPatch {
                completed: Some(completed),
                ..TaskPatch::default()
            },
        )
    }

    /// Removes a task. Deleting an unknown id is a no-op.
    pub fn delete_task(&mut self, key: DayKey, id: &str) -> bool {
        let Some(tasks) = self.days.get_mut(&key) else {
            return false;
        };
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return false;
        }
        self.prune(key);
        self.bump();
        tracing::debug!(day = %key, id, "Task deleted");
        true
    }

    /// Reschedules a task onto another day, keeping its id and creation time.
    pub fn move_task(&mut self, from: DayKey, id: &str, to: DayKey) -> bool {
        if from == to {
            return self.find(from, id).is_some();
        }
        let Some(tasks) = self.days.get_mut(&from) else {
            return false;
        };
        let Some(pos) = tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        let task = tasks.remove(pos);
        self.prune(from);
        let target = self.day_mut(to);
        target.push(task);
        sort_day(target);
        self.bump();
        tracing::debug!(from = %from, to = %to, id, "Task moved");
        true
    }

    /// Swaps in a whole new data set.
    pub fn replace(&mut self, data: UserData) {
        self.days = data.tasks;
        self.days.retain(|_, tasks| !tasks.is_empty());
        for tasks in self.days.values_mut() {
            sort_day(tasks);
        }
        if let Some(max) = self.days.values().flatten().map(|t| t.created_at).max() {
            self.last_created_at = self.last_created_at.max(max);
        }
        self.bump();
    }

    /// Snapshot of the store in its persisted shape.
    pub fn to_data(&self) -> UserData {
        UserData {
            tasks: self
                .days
                .iter()
                .filter(|(_, tasks)| !tasks.is_empty())
                .map(|(key, tasks)| (*key, tasks.clone()))
                .collect(),
        }
    }

    /// Tasks of one day in display order. Empty when the day has none.
    pub fn day_tasks(&self, key: DayKey) -> &[Task] {
        self.days.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, key: DayKey, id: &str) -> Option<&Task> {
        self.day_tasks(key).iter().find(|t| t.id == id)
    }

    /// Non-empty buckets in calendar order.
    pub fn days(&self) -> impl Iterator<Item = (DayKey, &[Task])> {
        self.days
            .iter()
            .filter(|(_, tasks)| !tasks.is_empty())
            .map(|(key, tasks)| (*key, tasks.as_slice()))
    }

    /// Per-day open/done counts for one month, for the month grid.
    pub fn month_counts(&self, year: i32, month: u32) -> BTreeMap<u32, DayCount> {
        let start = DayKey::new(year, month, 0);
        let end = DayKey::new(year, month, u32::MAX);
        self.days
            .range(start..=end)
            .filter(|(_, tasks)| !tasks.is_empty())
            .map(|(key, tasks)| {
                let done = tasks.iter().filter(|t| t.completed).count();
                (
                    key.day,
                    DayCount {
                        open: tasks.len() - done,
                        done,
                    },
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
