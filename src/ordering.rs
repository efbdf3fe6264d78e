use std::cmp::Ordering;

use crate::models::Task;

/// Compares two tasks of the same day.
///
/// The order is:
/// - **Completion**: open tasks before completed ones.
/// - **Priority**: high, then medium, then low.
/// - **Time of day**: timed tasks before untimed ones, earlier times first.
///   `HH:MM` strings compare correctly as plain strings.
/// - **Creation**: older tasks first.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
        .then_with(|| match (&a.time, &b.time) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Re-sorts a day's tasks. The sort is stable, so exact ties keep insertion order.
pub fn sort_day(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}
