use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveTime};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::auth::Authenticator;
use crate::models::{days_in_month, DayKey, NewTask, Priority, Task, TaskId, TaskPatch};
use crate::session::Session;
use crate::storage::Persistence;
use crate::views::DatedTask;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES.get(month as usize).copied().unwrap_or("?")
}

/// Parses `YYYY-MM-DD`, or `today`.
pub fn parse_date(s: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    if s.trim().eq_ignore_ascii_case("today") {
        return Ok(today);
    }
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}': {}. Use YYYY-MM-DD.", s, e))
}

/// Parses a time of day and normalizes it to zero-padded `HH:MM`.
pub fn parse_time(s: &str) -> Result<String, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|e| format!("Invalid time '{}': {}. Use HH:MM.", s, e))
}

/// Parses `YYYY-MM` into `(year, 0-based month)`.
pub fn parse_month(s: &str) -> Result<(i32, u32), String> {
    crate::models::parse_month_key(s).ok_or_else(|| format!("Invalid month '{}'. Use YYYY-MM.", s))
}

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Finds the task in a day whose id equals or uniquely starts with `prefix`.
pub fn resolve_id<P: Persistence>(session: &Session<P>, key: DayKey, prefix: &str) -> Result<TaskId, String> {
    let prefix = prefix.trim();
    let tasks = session.day_tasks(key);
    if let Some(t) = tasks.iter().find(|t| t.id == prefix) {
        return Ok(t.id.clone());
    }
    let matches: Vec<&Task> = tasks.iter().filter(|t| !prefix.is_empty() && t.id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [only] => Ok(only.id.clone()),
        [] => Err(format!("Task {} not found on {}.", prefix, key)),
        _ => Err(format!("Task id {} is ambiguous on {}.", prefix, key)),
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn header(cols: &[&str]) -> Vec<Cell> {
    cols.iter().map(|c| Cell::new(c).add_attribute(Attribute::Bold)).collect()
}

fn task_cells(t: &Task) -> Vec<Cell> {
    let status = if t.completed { "Done" } else { "Pending" };
    let status_color = if t.completed { Color::Green } else { Color::Yellow };
    vec![
        Cell::new(short_id(&t.id)),
        Cell::new(&t.text),
        Cell::new(t.priority).fg(if t.completed { Color::Grey } else { priority_color(t.priority) }),
        Cell::new(t.time.as_deref().unwrap_or("-")),
        Cell::new(if t.recurring { "yes" } else { "" }),
        Cell::new(status).fg(status_color),
    ]
}

fn dated_table(items: &[DatedTask]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Date", "ID", "Task", "Priority", "Time", "Recurring", "Status"]));
    for item in items {
        let date = item
            .date
            .map(|d| d.format("%a %b %d %Y").to_string())
            .unwrap_or_else(|| item.key.to_string());
        let mut row = vec![Cell::new(date)];
        row.extend(task_cells(&item.task));
        table.add_row(row);
    }
    table
}

/// Creates a user account.
pub fn cmd_register<A: Authenticator>(auth: &mut A, username: &str, password: &str, silent: bool) -> bool {
    match auth.register(username, password) {
        Ok(()) => {
            if !silent { println!("User '{}' registered.", username.trim()); }
            true
        }
        Err(e) => {
            if !silent { eprintln!("{}", e); }
            false
        }
    }
}

/// Adds a task to a day. Blank text is rejected.
pub fn cmd_add<P: Persistence>(
    session: &mut Session<P>,
    date: NaiveDate,
    text: &str,
    priority: Priority,
    time: Option<String>,
    recurring: bool,
    silent: bool,
) -> Option<TaskId> {
    let text = text.trim();
    if text.is_empty() {
        if !silent { eprintln!("Task text must not be empty."); }
        return None;
    }
    let time = match time.as_deref().map(parse_time).transpose() {
        Ok(t) => t,
        Err(e) => {
            if !silent { eprintln!("{}", e); }
            return None;
        }
    };
    let new = NewTask::new(text).priority(priority).time(time).recurring(recurring);
    let id = session.add_task(DayKey::from_date(date), new);
    if !silent { println!("Task added on {} (id = {})", date, short_id(&id)); }
    Some(id)
}

/// Lists one day's tasks in display order.
pub fn cmd_day<P: Persistence>(session: &Session<P>, date: NaiveDate) {
    let tasks = session.day_tasks(DayKey::from_date(date));
    if tasks.is_empty() {
        println!("No tasks on {}.", date.format("%a %b %d %Y"));
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Task", "Priority", "Time", "Recurring", "Status"]));
    for t in tasks {
        table.add_row(task_cells(t));
    }
    println!("{}", date.format("%A, %B %d %Y"));
    println!("{table}");
}

/// Prints a month grid with per-day open/done counts.
pub fn cmd_month<P: Persistence>(session: &Session<P>, year: i32, month: u32, today: NaiveDate) {
    let Some(first) = NaiveDate::from_ymd_opt(year, month + 1, 1) else {
        eprintln!("Invalid month.");
        return;
    };
    let counts = session.store().month_counts(year, month);
    let offset = first.weekday().num_days_from_sunday() as usize;
    let total = days_in_month(year, month) as usize;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(header(&["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]));

    let mut row: Vec<Cell> = (0..offset).map(|_| Cell::new("")).collect();
    for day in 1..=total as u32 {
        let mut label = day.to_string();
        if let Some(c) = counts.get(&day) {
            if c.open > 0 { label.push_str(&format!("\n{} open", c.open)); }
            if c.done > 0 { label.push_str(&format!("\n{} done", c.done)); }
        }
        let mut cell = Cell::new(label);
        if DayKey::new(year, month, day) == DayKey::from_date(today) {
            cell = cell.fg(Color::Cyan).add_attribute(Attribute::Bold);
        } else if counts.get(&day).is_some_and(|c| c.open > 0) {
            cell = cell.fg(Color::Yellow);
        }
        row.push(cell);
        if row.len() == 7 {
            table.add_row(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        while row.len() < 7 { row.push(Cell::new("")); }
        table.add_row(row);
    }

    println!("{} {}", month_name(month), year);
    println!("{table}");
}

/// Lists open tasks due within `days` days from today.
pub fn cmd_upcoming<P: Persistence>(session: &mut Session<P>, today: NaiveDate, days: u32) {
    let upcoming = session.upcoming(today, days);
    if upcoming.is_empty() {
        println!("No upcoming tasks in the next {} days.", days);
        return;
    }
    println!("{}", dated_table(upcoming));
}

/// Searches every task by text.
pub fn cmd_search<P: Persistence>(session: &mut Session<P>, query: &str) {
    let hits = session.search(query);
    if hits.is_empty() {
        println!("No tasks match '{}'.", query);
        return;
    }
    println!("{}", dated_table(&hits));
}

/// Marks a task completed or open again.
pub fn cmd_set_done<P: Persistence>(session: &mut Session<P>, date: NaiveDate, id: &str, completed: bool, silent: bool) -> bool {
    let key = DayKey::from_date(date);
    let id = match resolve_id(session, key, id) {
        Ok(id) => id,
        Err(e) => {
            if !silent { eprintln!("{}", e); }
            return false;
        }
    };
    let ok = session.toggle_task(key, &id, completed);
    if ok && !silent {
        let state = if completed { "complete" } else { "open" };
        println!("Task {} marked as {}.", short_id(&id), state);
    }
    ok
}

/// Edits an existing task's details.
#[allow(clippy::too_many_arguments)]
pub fn cmd_edit<P: Persistence>(
    session: &mut Session<P>,
    date: NaiveDate,
    id: &str,
    text: Option<String>,
    priority: Option<Priority>,
    time: Option<String>,
    clear_time: bool,
    recurring: Option<bool>,
    silent: bool,
) -> bool {
    let key = DayKey::from_date(date);
    let id = match resolve_id(session, key, id) {
        Ok(id) => id,
        Err(e) => {
            if !silent { eprintln!("{}", e); }
            return false;
        }
    };
    let mut patch = TaskPatch { priority, recurring, ..TaskPatch::default() };
    if let Some(text) = text {
        let text = text.trim();
        if text.is_empty() {
            if !silent { eprintln!("Task text must not be empty."); }
            return false;
        }
        patch.text = Some(text.to_string());
    }
    if clear_time {
        patch.time = Some(None);
    } else if let Some(t) = time {
        match parse_time(&t) {
            Ok(t) => patch.time = Some(Some(t)),
            Err(e) => {
                if !silent { eprintln!("{}", e); }
                return false;
            }
        }
    }
    if patch.is_empty() {
        if !silent { eprintln!("Nothing to change."); }
        return false;
    }
    let ok = session.update_task(key, &id, patch);
    if ok && !silent { println!("Task {} updated.", short_id(&id)); }
    ok
}

/// Removes a task from a day.
pub fn cmd_remove<P: Persistence>(session: &mut Session<P>, date: NaiveDate, id: &str, silent: bool) -> bool {
    let key = DayKey::from_date(date);
    let id = match resolve_id(session, key, id) {
        Ok(id) => id,
        Err(e) => {
            if !silent { eprintln!("{}", e); }
            return false;
        }
    };
    let ok = session.delete_task(key, &id);
    if ok && !silent { println!("Task {} removed.", short_id(&id)); }
    ok
}

/// Reschedules a task onto another day.
pub fn cmd_move<P: Persistence>(session: &mut Session<P>, date: NaiveDate, id: &str, to: NaiveDate, silent: bool) -> bool {
    let key = DayKey::from_date(date);
    let id = match resolve_id(session, key, id) {
        Ok(id) => id,
        Err(e) => {
            if !silent { eprintln!("{}", e); }
            return false;
        }
    };
    let ok = session.move_task(key, &id, DayKey::from_date(to));
    if ok && !silent { println!("Task {} moved to {}.", short_id(&id), to); }
    ok
}

/// Writes `<username>_calendar.json` into `dir`.
pub fn cmd_export<P: Persistence>(session: &Session<P>, dir: &Path, silent: bool) -> Option<PathBuf> {
    match session.export_to(dir) {
        Ok(path) => {
            if !silent { println!("Backup written to {}", path.display()); }
            Some(path)
        }
        Err(e) => {
            if !silent { eprintln!("Failed to write backup: {}", e); }
            None
        }
    }
}

/// Replaces all tasks with the contents of a backup file.
pub fn cmd_import<P: Persistence>(session: &mut Session<P>, path: &Path, silent: bool) -> bool {
    match session.import_file(path) {
        Ok(count) => {
            if !silent { println!("Backup restored ({} tasks).", count); }
            true
        }
        Err(e) => {
            if !silent { eprintln!("Failed to import backup: {}", e); }
            false
        }
    }
}
